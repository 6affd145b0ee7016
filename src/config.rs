use page::page::MINIMUM_PAGE_SIZE;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Tunables of a [`crate::Store`].
///
/// Loadable from a TOML file; every field has a default, so a partial
/// file works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Size of a data page in bytes.
    pub page_size: usize,
    /// Size of a log page in bytes. Logs favor larger pages.
    pub log_page_size: usize,
    /// Data buffer capacity in page slots.
    pub buffer_capacity: NonZeroUsize,
    /// Log buffer capacity in page slots.
    pub log_buffer_capacity: NonZeroUsize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: page::page::DEFAULT_PAGE_SIZE,
            log_page_size: page::page::DEFAULT_LOG_PAGE_SIZE,
            buffer_capacity: NonZeroUsize::new(64).expect("64 is non-zero"),
            log_buffer_capacity: NonZeroUsize::new(16).expect("16 is non-zero"),
        }
    }
}

impl StoreConfig {
    /// Convenience constructor for the common case of tuning only the
    /// data page size.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: StoreConfig =
            toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
                path: path.clone(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, size) in [
            ("page_size", self.page_size),
            ("log_page_size", self.log_page_size),
        ] {
            if size < MINIMUM_PAGE_SIZE {
                return Err(ConfigError::Invalid {
                    message: format!("{name} of {size} is below the minimum of {MINIMUM_PAGE_SIZE}"),
                });
            }
        }
        for (name, capacity) in [
            ("buffer_capacity", self.buffer_capacity),
            ("log_buffer_capacity", self.log_buffer_capacity),
        ] {
            if capacity.get() < 2 {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must be at least 2 page slots"),
                });
            }
        }
        Ok(())
    }
}
