//! TOML secrets file
//!
//! Accepts either flat top-level keys or an `[auth]` table:
//!
//! ```toml
//! CLIENT_ID = "..."
//! TENANT_ID = "..."
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calmate_core::SecretSource;
use calmate_domain::{CalmateError, Result};

use crate::errors::InfraError;

/// Secrets read once from a TOML file
#[derive(Debug, Clone, Default)]
pub struct TomlSecretsFile {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl TomlSecretsFile {
    /// Read `path`. A missing file yields an empty source.
    ///
    /// # Errors
    /// `Config` when the file is not valid TOML, `Storage` when it cannot be
    /// read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "secrets file not present");
                return Ok(Self { path, values: HashMap::new() });
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };
        let values = parse_secrets(&contents, &path)?;
        tracing::debug!(path = %path.display(), keys = values.len(), "loaded secrets file");
        Ok(Self { path, values })
    }

    /// File the secrets were read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_secrets(contents: &str, path: &Path) -> Result<HashMap<String, String>> {
    let table: toml::Table = toml::from_str(contents).map_err(|e| {
        CalmateError::Config(format!("Invalid secrets file {}: {e}", path.display()))
    })?;

    let mut values = HashMap::new();
    collect_strings(&table, &mut values);
    // [auth] wins over top-level keys
    if let Some(toml::Value::Table(auth)) = table.get("auth") {
        collect_strings(auth, &mut values);
    }
    Ok(values)
}

fn collect_strings(table: &toml::Table, into: &mut HashMap<String, String>) {
    for (key, value) in table {
        if let toml::Value::String(text) = value {
            into.insert(key.clone(), text.clone());
        }
    }
}

impl SecretSource for TomlSecretsFile {
    fn name(&self) -> &str {
        "secrets-file"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
