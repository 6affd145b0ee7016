//! Connection strings.
//!
//! A store is addressed as `<scheme>://<host>/<path>?<args>`. The host
//! part is unused by the built-in backends and may be empty. The data
//! file lives at `<path>`; the write-ahead log and the free space list
//! snapshot live beside it with the `_log` and `_fsl` suffixes.

use crate::errors::Error;
use file::factory::StorageTarget;
use std::collections::HashMap;
use std::path::PathBuf;

/// Supported storage schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    File,
    Memory,
}

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub scheme: Scheme,
    pub path: PathBuf,
    pub args: HashMap<String, String>,
}

impl ConnectionString {
    pub fn parse(connection: &str) -> Result<Self, Error> {
        let (scheme_part, rest) = connection
            .split_once("://")
            .ok_or_else(|| Error::InvalidConnectionString(connection.to_string()))?;
        let scheme = match scheme_part {
            "file" => Scheme::File,
            "memory" => Scheme::Memory,
            _ => return Err(Error::InvalidConnectionString(connection.to_string())),
        };

        let (path_part, args_part) = match rest.split_once('?') {
            Some((path, args)) => (path, Some(args)),
            None => (rest, None),
        };
        if scheme == Scheme::File && path_part.is_empty() {
            return Err(Error::InvalidConnectionString(connection.to_string()));
        }

        let mut args = HashMap::new();
        if let Some(args_part) = args_part {
            for pair in args_part.split('&').filter(|pair| !pair.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| Error::InvalidConnectionString(connection.to_string()))?;
                args.insert(key.to_string(), value.to_string());
            }
        }

        Ok(Self {
            scheme,
            path: PathBuf::from(path_part),
            args,
        })
    }

    /// Storage target of the data file.
    pub fn data_target(&self) -> StorageTarget {
        match self.scheme {
            Scheme::File => StorageTarget::File(self.path.clone()),
            Scheme::Memory => StorageTarget::Memory,
        }
    }

    /// Storage target of the write-ahead log file.
    pub fn log_target(&self) -> StorageTarget {
        match self.scheme {
            Scheme::File => {
                let mut path = self.path.clone().into_os_string();
                path.push("_log");
                StorageTarget::File(PathBuf::from(path))
            }
            Scheme::Memory => StorageTarget::Memory,
        }
    }
}
