//! Provider selection at construction time.
//!
//! The application builds exactly one provider from configuration; the
//! rest of the system only ever sees `Arc<dyn ExecutionProvider>`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::provider::ExecutionProvider;
use crate::remote::RemoteProvider;
use crate::simulated::SimulatedProvider;

/// Which provider implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Remote,
    Simulated,
}

impl ProviderKind {
    /// Parse the configuration value.
    pub fn from_str_value(s: &str) -> Result<Self, String> {
        match s {
            "remote" => Ok(Self::Remote),
            "simulated" => Ok(Self::Simulated),
            _ => Err(format!(
                "Invalid provider kind '{s}'. Must be one of: remote, simulated"
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Simulated => "simulated",
        }
    }
}

/// Settings consumed by [`build_provider`].
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL of the remote sessions API.
    pub api_base: String,
    /// Credential for the remote API; absent means remote calls fail
    /// with an unconfigured error.
    pub api_key: Option<String>,
    /// Scratch directory for simulated workspaces.
    pub workspace_root: PathBuf,
}

/// Construct the configured provider.
pub fn build_provider(kind: ProviderKind, settings: &ProviderSettings) -> Arc<dyn ExecutionProvider> {
    match kind {
        ProviderKind::Remote => Arc::new(RemoteProvider::new(
            settings.api_base.clone(),
            settings.api_key.clone(),
        )),
        ProviderKind::Simulated => {
            Arc::new(SimulatedProvider::new(settings.workspace_root.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_known_values() {
        assert_eq!(ProviderKind::from_str_value("remote").unwrap(), ProviderKind::Remote);
        assert_eq!(
            ProviderKind::from_str_value("simulated").unwrap(),
            ProviderKind::Simulated
        );
        assert!(ProviderKind::from_str_value("local").is_err());
    }
}
