//! Core data models for Argus

pub mod contract;
pub mod health;
pub mod platform;
pub mod results;
pub mod vulnerability;

pub use contract::*;
pub use health::*;
pub use platform::*;
pub use results::*;
pub use vulnerability::*;
