//! Mode name validation.

use crate::error::{ConfigError, Result};

/// Reject mode names that cannot be used.
///
/// `local` collides with the `.local` postfix of env files
/// (`.env.local`, `.env.[mode].local`), and an empty name selects nothing.
pub fn validate_mode(mode: &str) -> Result<()> {
    if mode.trim().is_empty() {
        return Err(ConfigError::InvalidMode {
            mode: mode.to_string(),
            reason: "mode name cannot be empty".to_string(),
        });
    }

    if mode == "local" {
        return Err(ConfigError::InvalidMode {
            mode: mode.to_string(),
            reason: "\"local\" cannot be used as a mode name because it conflicts with \
                     the .local postfix for .env files"
                .to_string(),
        });
    }

    Ok(())
}
