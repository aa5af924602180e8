//! Argus - multi-chain smart contract security analysis
//!
//! Argus runs a platform's static analysis tool and an ensemble of AI
//! models over contract sources, then merges their findings into one
//! deduplicated [`models::AnalysisResult`]. Tool and model failures degrade
//! the result instead of aborting it; see [`fallback`].

pub mod ai;
pub mod analyzers;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fallback;
pub mod invoker;
pub mod models;
pub mod platforms;
pub mod registry;

pub use engine::AuditEngine;
pub use errors::{ErrorCode, PlatformError};
