//! Configuration traits and utilities.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{BridgeError, Result};
use crate::{LoggingConfig, TransportConfig};

/// A service configuration loaded from a JSON5 file.
///
/// Services expose their transport and logging blocks through this trait and
/// add their own checks in [`validate`](Self::validate). When a config file is
/// only one layer among several (file, then environment, then flags), use
/// [`load_unvalidated`](Self::load_unvalidated) and validate once every layer
/// has been applied.
pub trait BridgeConfig: Sized + DeserializeOwned {
    fn transport(&self) -> &TransportConfig;

    fn logging(&self) -> &LoggingConfig;

    /// Reject configurations the service cannot run with. Accepts everything by default.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Load and validate.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without validating.
    fn load_unvalidated(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BridgeError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Ok(json5::from_str(&content)?)
    }
}
