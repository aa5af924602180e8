//! Registry of known platforms

use log::debug;

use crate::models::{PlatformFamily, PlatformInfo};

/// Table of platform descriptors, looked up by id
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    platforms: Vec<PlatformInfo>,
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::with_default_platforms()
    }
}

impl PlatformRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            platforms: Vec::new(),
        }
    }

    /// Create a registry with every platform Argus knows about
    pub fn with_default_platforms() -> Self {
        let mut registry = Self::new();

        for (id, name) in [
            ("ethereum", "Ethereum"),
            ("polygon", "Polygon"),
            ("bsc", "BNB Smart Chain"),
            ("arbitrum", "Arbitrum"),
        ] {
            registry.register(PlatformInfo::new(
                id,
                name,
                PlatformFamily::Evm,
                "solidity",
                &["sol"],
                Some("slither"),
            ));
        }

        registry.register(PlatformInfo::new(
            "cardano",
            "Cardano",
            PlatformFamily::Cardano,
            "aiken",
            &["ak"],
            Some("aiken"),
        ));
        registry.register(PlatformInfo::new(
            "sui",
            "Sui",
            PlatformFamily::Sui,
            "move",
            &["move"],
            Some("sui"),
        ));
        registry.register(PlatformInfo::new(
            "aptos",
            "Aptos",
            PlatformFamily::Aptos,
            "move",
            &["move"],
            Some("aptos"),
        ));
        registry.register(PlatformInfo::new(
            "solana",
            "Solana",
            PlatformFamily::Solana,
            "rust",
            &["rs"],
            None,
        ));
        registry.register(
            PlatformInfo::new(
                "tezos",
                "Tezos",
                PlatformFamily::Tezos,
                "michelson",
                &["tz", "mligo"],
                None,
            )
            .inactive(),
        );

        debug!("Registered {} platforms", registry.platforms.len());
        registry
    }

    /// Register a platform, replacing any existing entry with the same id
    pub fn register(&mut self, platform: PlatformInfo) {
        self.platforms.retain(|p| p.id != platform.id);
        self.platforms.push(platform);
    }

    /// Look up a platform by id (case-insensitive)
    pub fn get(&self, id: &str) -> Option<&PlatformInfo> {
        self.platforms
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id.trim()))
    }

    /// All platforms, in registration order
    pub fn all(&self) -> &[PlatformInfo] {
        &self.platforms
    }

    /// Active platforms
    pub fn active(&self) -> impl Iterator<Item = &PlatformInfo> {
        self.platforms.iter().filter(|p| p.is_active)
    }

    /// Active platforms that have an analyzer implementation
    pub fn implemented(&self) -> impl Iterator<Item = &PlatformInfo> {
        self.active().filter(|p| p.family.is_implemented())
    }
}
