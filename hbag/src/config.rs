use config::ConfigError;
use serde::Deserialize;
use tracing::error;

/// Construction parameters of a [`Bag`](crate::Bag).
///
/// Missing fields fall back to their defaults, so `{}` is a valid config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BagConfig {
    /// Distinct keys to reserve room for. A pure performance hint, 0 reserves nothing.
    pub capacity: usize,
}

impl BagConfig {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Reads the section `key` of a layered configuration.
    ///
    /// A missing section yields the default. An invalid one is logged and
    /// yields the default as well, so a typo never prevents a bag from being built.
    pub fn from_config(config: &config::Config, key: &str) -> Self {
        match config.get::<Self>(key) {
            Ok(x) => x,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(ConfigError::Type {
                origin,
                unexpected,
                expected,
                key,
            }) => {
                error!("{key:?} cannot be parsed into {expected}, got {unexpected}, configuration src: {origin:?}. Using default instead");
                Self::default()
            }
            Err(e) => {
                error!("Bag config '{key}' is invalid: {e}. Using default instead");
                Self::default()
            }
        }
    }
}
