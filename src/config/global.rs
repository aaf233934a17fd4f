//! Process-wide default configuration.
//!
//! Callers that cannot thread an [`RssConfig`] through their code configure
//! it once at start-up and build connectors with
//! [`Connector::from_global`](crate::core::connector::Connector::from_global).

use super::RssConfig;
use crate::utils::error::{Result, RssError};
use crate::utils::validation::Validate;
use std::sync::{PoisonError, RwLock};

static CONFIGURATION: RwLock<Option<RssConfig>> = RwLock::new(None);

/// Mutate the process-wide configuration, starting from defaults the first time.
pub fn configure<F>(f: F)
where
    F: FnOnce(&mut RssConfig),
{
    let mut guard = CONFIGURATION
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    f(guard.get_or_insert_with(RssConfig::default));
}

/// Snapshot of the current configuration (defaults if never configured).
pub fn configuration() -> RssConfig {
    CONFIGURATION
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .unwrap_or_default()
}

pub fn reset() {
    *CONFIGURATION
        .write()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

/// Validated snapshot; an empty base address is reported as missing.
pub fn load() -> Result<RssConfig> {
    let config = configuration();
    if config.base_uri.trim().is_empty() {
        tracing::error!("Missing RSS base_uri config");
        return Err(RssError::MissingConfigError {
            field: "base_uri".to_string(),
        });
    }
    config.validate()?;
    Ok(config)
}
