use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Blockchain ecosystems, grouped by the analyzer implementation they share
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    /// EVM-compatible chains (Solidity)
    Evm,

    /// Cardano UTXO/validator scripts (Aiken)
    Cardano,

    /// Sui Move
    Sui,

    /// Aptos Move
    Aptos,

    /// Solana programs
    Solana,

    /// Tezos contracts
    Tezos,
}

impl PlatformFamily {
    /// Whether an analyzer implementation exists for this family
    pub fn is_implemented(&self) -> bool {
        matches!(
            self,
            PlatformFamily::Evm
                | PlatformFamily::Cardano
                | PlatformFamily::Sui
                | PlatformFamily::Aptos
        )
    }

    /// Vulnerability classes the AI prompt asks models to look at first
    pub fn focus_areas(&self) -> &'static [&'static str] {
        match self {
            PlatformFamily::Evm => &[
                "reentrancy",
                "access control",
                "unchecked external calls",
                "integer overflow in unchecked blocks",
            ],
            PlatformFamily::Cardano => &[
                "datum and redeemer validation",
                "always-true validator branches",
                "missing signatory checks",
                "double satisfaction",
            ],
            PlatformFamily::Sui | PlatformFamily::Aptos => &[
                "resource safety",
                "capability leaks",
                "unchecked abilities on structs",
                "missing signer checks",
            ],
            PlatformFamily::Solana | PlatformFamily::Tezos => &[],
        }
    }
}

/// Descriptor of a supported platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Platform id (e.g. `ethereum`)
    pub id: String,

    /// Display name
    pub name: String,

    pub family: PlatformFamily,

    /// Inactive platforms are known but refused
    pub is_active: bool,

    /// Contract file extensions, without the dot
    pub file_extensions: Vec<String>,

    /// Contract language
    pub language: String,

    /// Static analysis binary, when the platform has one
    pub static_tool: Option<String>,
}

impl PlatformInfo {
    pub fn new(
        id: &str,
        name: &str,
        family: PlatformFamily,
        language: &str,
        extensions: &[&str],
        static_tool: Option<&str>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            family,
            is_active: true,
            file_extensions: extensions.iter().map(|e| e.to_string()).collect(),
            language: language.to_string(),
            static_tool: static_tool.map(str::to_string),
        }
    }

    /// Mark the platform inactive
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether a file name carries one of this platform's extensions
    pub fn accepts_extension(&self, extension: Option<&str>) -> bool {
        match extension {
            Some(ext) => self
                .file_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}
