//! Column declarations: validation, loading from a columns file, and reload.
//!
//! # Responsibilities
//!
//! - Turn a [`ColumnDeclaration`] into a validated [`RegisteredColumn`],
//!   resolving its key and compiling its patterns.
//! - Load every declaration from a YAML (or JSON) columns file and atomically
//!   replace the registry contents.
//! - Optionally re-read the columns file on an interval.
//!
//! # Module invariants
//!
//! - A declaration that fails validation never reaches the registry.
//! - Key material is never logged; only record type and field names are.

pub mod cache;

pub use cache::{ColumnRegistry, RegisteredColumn};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use common::protocol::{ColumnDeclaration, ColumnsFile, EncryptDeclaration};
use tokio::time;
use tracing::{info, warn};

use crate::crypto::{ConfigError, EncryptionOptions, RawEncryptionOptions};
use crate::traversal::FieldMatchConfig;

/// Validate `declaration` and build the column it describes.
///
/// # Errors
///
/// - [`ConfigError::MissingKey`] if no key is given or `key_env` is unset.
/// - [`ConfigError::InvalidKey`] if both `key` and `key_env` are given, or
///   the key fails validation.
/// - [`ConfigError::UnsupportedAlgorithm`], [`ConfigError::InvalidIvLength`]
///   and [`ConfigError::InvalidPattern`] as raised by validation.
pub fn resolve(declaration: &ColumnDeclaration) -> Result<RegisteredColumn, ConfigError> {
    let raw = RawEncryptionOptions {
        key: resolve_key(&declaration.encrypt)?,
        algorithm: declaration.encrypt.algorithm.clone(),
        iv_length: declaration.encrypt.iv_length,
        loose_matching: declaration.encrypt.loose_matching,
    };
    let options = EncryptionOptions::from_raw(&raw)?;
    let config = FieldMatchConfig::compile(declaration.matching.as_slice(), options)?;

    Ok(RegisteredColumn {
        entity: declaration.entity.clone(),
        field: declaration.field.clone(),
        config: Arc::new(config),
    })
}

fn resolve_key(encrypt: &EncryptDeclaration) -> Result<String, ConfigError> {
    match (&encrypt.key, &encrypt.key_env) {
        (Some(key), None) => Ok(key.clone()),
        (None, Some(var)) => std::env::var(var)
            .map_err(|_| ConfigError::MissingKey(format!("environment variable {var} is not set"))),
        (Some(_), Some(_)) => Err(ConfigError::InvalidKey(
            "set either key or key_env, not both".into(),
        )),
        (None, None) => Err(ConfigError::MissingKey(
            "one of key or key_env is required".into(),
        )),
    }
}

/// Parse the text of a columns file, trying YAML first and then JSON.
///
/// # Errors
///
/// Returns an error if the text is neither valid YAML nor valid JSON of the
/// expected shape.
pub fn parse_columns(text: &str) -> Result<ColumnsFile> {
    if let Ok(parsed) = serde_yaml::from_str(text) {
        Ok(parsed)
    } else if let Ok(parsed) = serde_json::from_str(text) {
        Ok(parsed)
    } else {
        anyhow::bail!("failed to parse columns file: not valid YAML or JSON")
    }
}

/// Validate every declaration in `file` and atomically replace `registry`.
///
/// All-or-nothing: if any declaration fails, the registry is left as it was.
///
/// # Errors
///
/// Returns an error naming the first declaration that fails validation.
pub fn install(file: &ColumnsFile, registry: &ColumnRegistry) -> Result<()> {
    let columns = file
        .columns
        .iter()
        .map(|decl| {
            resolve(decl).with_context(|| {
                format!("invalid column declaration {}.{}", decl.entity, decl.field)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let count = columns.len();
    registry.replace_all(columns);
    info!(count, "column registry loaded");
    Ok(())
}

/// Read the columns file at `path` and install it into `registry`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if any
/// declaration is invalid.
pub async fn load_from_path(path: &Path, registry: &ColumnRegistry) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read columns file {}", path.display()))?;
    let file = parse_columns(&text)
        .with_context(|| format!("failed to load columns file {}", path.display()))?;
    if file.columns.is_empty() {
        warn!(path = %path.display(), "columns file declares no columns");
    }
    install(&file, registry)
}

/// Spawn a background task that periodically re-reads the columns file.
///
/// On failure the previous columns are retained and a warning is emitted.
pub fn refresh_task(
    path: PathBuf,
    interval: Duration,
    registry: ColumnRegistry,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // First tick fires immediately; startup has already loaded the file.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = load_from_path(&path, &registry).await {
                warn!(error = %e, "column reload failed; retaining previous columns");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_256: &str = "d85117047fd06d3afa79b6e44ee3a52eb426fc24c3a2e3667732e8da0342b4da";

    fn yaml_file(key: &str) -> String {
        format!(
            r#"
columns:
  - entity: Test
    field: secret
    matching: ["secret"]
    encrypt:
      key: "{key}"
      algorithm: aes-256-cbc
      iv_length: 16
  - entity: Audit
    field: payload
    matching: ["^ssn$", "token"]
    encrypt:
      key: "{key}"
      algorithm: aes-256-cbc
      ivLength: 16
      looseMatching: true
"#
        )
    }

    #[test]
    fn parses_yaml() {
        let file = parse_columns(&yaml_file(KEY_256)).unwrap();
        assert_eq!(file.columns.len(), 2);
        assert!(file.columns[1].encrypt.loose_matching);
    }

    #[test]
    fn parses_json() {
        let text = format!(
            r#"{{"columns":[{{"entity":"Test","field":"secret","matching":["secret"],
               "encrypt":{{"key":"{KEY_256}","algorithm":"aes-256-cbc","iv_length":16}}}}]}}"#
        );
        let file = parse_columns(&text).unwrap();
        assert_eq!(file.columns[0].field, "secret");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_columns("columns: [ {").is_err());
    }

    #[test]
    fn install_replaces_registry() {
        let registry = ColumnRegistry::new();
        install(&parse_columns(&yaml_file(KEY_256)).unwrap(), &registry).unwrap();
        assert_eq!(registry.len(), 2);
        // The loose Audit column also applies to Test.
        let configs = registry.configs_for("Test");
        assert!(configs.contains_key("secret"));
        assert!(configs.contains_key("payload"));
    }

    #[test]
    fn install_is_all_or_nothing() {
        let registry = ColumnRegistry::new();
        install(&parse_columns(&yaml_file(KEY_256)).unwrap(), &registry).unwrap();

        let err = install(&parse_columns(&yaml_file("foo")).unwrap(), &registry).unwrap_err();
        assert!(format!("{err:#}").contains("Test.secret"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn key_can_come_from_environment() {
        let var = "JSONCRYPT_TEST_KEY_FROM_ENV";
        std::env::set_var(var, KEY_256);
        let mut decl = parse_columns(&yaml_file(KEY_256)).unwrap().columns.remove(0);
        decl.encrypt.key = None;
        decl.encrypt.key_env = Some(var.into());
        assert!(resolve(&decl).is_ok());

        decl.encrypt.key_env = Some("JSONCRYPT_TEST_KEY_UNSET".into());
        assert!(matches!(resolve(&decl), Err(ConfigError::MissingKey(_))));
    }

    #[test]
    fn key_sources_are_exclusive() {
        let mut decl = parse_columns(&yaml_file(KEY_256)).unwrap().columns.remove(0);
        decl.encrypt.key_env = Some("ANY".into());
        assert!(matches!(resolve(&decl), Err(ConfigError::InvalidKey(_))));

        decl.encrypt.key = None;
        decl.encrypt.key_env = None;
        assert!(matches!(resolve(&decl), Err(ConfigError::MissingKey(_))));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let mut decl = parse_columns(&yaml_file(KEY_256)).unwrap().columns.remove(0);
        decl.matching = vec!["(".into()];
        assert!(matches!(
            resolve(&decl),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let registry = ColumnRegistry::new();
        let path = PathBuf::from("/nonexistent/jsoncrypt/columns.yaml");
        assert!(load_from_path(&path, &registry).await.is_err());
        assert!(registry.is_empty());
    }
}
