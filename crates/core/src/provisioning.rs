// Provisioning metadata served by the Remote Provisioning Server

use serde::{Deserialize, Serialize};

/// AMT activation mode of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationMode {
    #[serde(rename = "acmactivate")]
    AdminControl,
    #[serde(rename = "ccmactivate")]
    ClientControl,
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdminControl => f.write_str("Admin Control Mode"),
            Self::ClientControl => f.write_str("Client Control Mode"),
            Self::Other(mode) => f.write_str(mode),
        }
    }
}

/// AMT provisioning profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_name: String,
    pub activation: ActivationMode,
    #[serde(default)]
    pub cira_config_name: Option<String>,
    #[serde(default)]
    pub dhcp_enabled: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Provisioning certificate domain used for Admin Control Mode activation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub profile_name: String,
    pub domain_suffix: String,
    #[serde(default)]
    pub expiration_date: Option<String>,
}
