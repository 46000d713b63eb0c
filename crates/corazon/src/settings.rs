//! Runtime settings
//!
//! Settings are process-wide: the class hierarchy they affect is itself
//! shared by every thread. Install them once, before the first class is
//! described or the first [`Property`](crate::Property) is installed;
//! until then [`current`] hands out the defaults.

use crate::error::{ClassError, ClassResult};
use once_cell::sync::{Lazy, OnceCell};

/// Environment variable overriding [`Settings::anonymous_name`]
pub const ENV_ANONYMOUS_NAME: &str = "CORAZON_ANONYMOUS_NAME";

/// Environment variable overriding [`Settings::backing_prefix`]
pub const ENV_BACKING_PREFIX: &str = "CORAZON_BACKING_PREFIX";

static INSTALLED: OnceCell<Settings> = OnceCell::new();
static DEFAULTS: Lazy<Settings> = Lazy::new(Settings::default);

/// Kernel settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Name shown in diagnostics for classes without a `__name__`
    pub anonymous_name: String,
    /// Prefix of the backing field generated accessors read and write
    pub backing_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anonymous_name: "Anonymous".to_string(),
            backing_prefix: "_".to_string(),
        }
    }
}

impl Settings {
    /// Defaults overridden by `CORAZON_*` environment variables
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(name) = std::env::var(ENV_ANONYMOUS_NAME) {
            settings.anonymous_name = name;
        }
        if let Ok(prefix) = std::env::var(ENV_BACKING_PREFIX) {
            settings.backing_prefix = prefix;
        }
        settings
    }

    /// Set the anonymous marker
    pub fn with_anonymous_name(mut self, name: impl Into<String>) -> Self {
        self.anonymous_name = name.into();
        self
    }

    /// Set the backing-field prefix
    pub fn with_backing_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.backing_prefix = prefix.into();
        self
    }

    fn validate(&self) -> ClassResult<()> {
        if self.anonymous_name.is_empty() {
            return Err(ClassError::Settings(
                "anonymous_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Install process-wide settings. Fails if settings were already installed.
pub fn install(settings: Settings) -> ClassResult<()> {
    settings.validate()?;
    INSTALLED
        .set(settings)
        .map_err(|_| ClassError::Settings("settings already installed".to_string()))?;
    tracing::debug!("corazon settings installed");
    Ok(())
}

/// The installed settings, or the defaults when none were installed
pub fn current() -> &'static Settings {
    INSTALLED.get().unwrap_or(&DEFAULTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.anonymous_name, "Anonymous");
        assert_eq!(settings.backing_prefix, "_");
    }

    #[test]
    fn test_builder() {
        let settings = Settings::default()
            .with_anonymous_name("?")
            .with_backing_prefix("__");
        assert_eq!(settings.anonymous_name, "?");
        assert_eq!(settings.backing_prefix, "__");
    }

    #[test]
    fn test_rejects_empty_anonymous_name() {
        let settings = Settings::default().with_anonymous_name("");
        assert!(matches!(install(settings), Err(ClassError::Settings(_))));
    }
}
