//! In-memory registry of encrypted JSON columns, keyed by record type.
//!
//! The registry uses `arc-swap` so lookups on the hot path never block and a
//! reload can atomically swap in a completely new set of columns.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::crypto::{CodecError, ConfigError};
use crate::record::{apply_record, Direction, FieldConfigs, Record};
use crate::traversal::FieldMatchConfig;

use common::protocol::ColumnDeclaration;

/// A validated column: where it was declared and how to encrypt it.
#[derive(Debug, Clone)]
pub struct RegisteredColumn {
    /// Record type the column was declared on.
    pub entity: String,
    /// Field name within the record.
    pub field: String,
    /// Patterns and cipher options, shared with every record using them.
    pub config: Arc<FieldMatchConfig>,
}

impl RegisteredColumn {
    /// Returns `true` if this column applies to records of type `entity`.
    pub fn applies_to(&self, entity: &str) -> bool {
        self.entity == entity || self.config.encrypt().loose_matching()
    }
}

/// Shared, lock-free registry of encrypted columns.
///
/// An explicit value rather than process-wide state: callers construct one,
/// declare columns into it, and pass it (or clones of it) to whatever encrypts
/// records. Clones share the same underlying column set.
#[derive(Clone, Debug)]
pub struct ColumnRegistry {
    inner: Arc<ArcSwap<Vec<RegisteredColumn>>>,
}

impl ColumnRegistry {
    /// Create a new, empty [`ColumnRegistry`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// Return the number of registered columns.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Return `true` if no columns are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Validate `declaration` and register it.
    ///
    /// Nothing is registered if validation fails. A column already declared for
    /// the same record type and field is replaced.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] raised while resolving the key, validating
    /// the cipher options, or compiling the patterns.
    pub fn declare(&self, declaration: &ColumnDeclaration) -> Result<(), ConfigError> {
        let column = super::resolve(declaration)?;
        self.register(column);
        Ok(())
    }

    /// Register an already-validated column.
    pub fn register(&self, column: RegisteredColumn) {
        self.inner.rcu(|current| {
            let mut next: Vec<RegisteredColumn> = current
                .iter()
                .filter(|c| !(c.entity == column.entity && c.field == column.field))
                .cloned()
                .collect();
            next.push(column.clone());
            next
        });
    }

    /// Atomically replace every registered column.
    pub fn replace_all(&self, columns: Vec<RegisteredColumn>) {
        self.inner.store(Arc::new(columns));
    }

    /// Field configurations that apply to records of type `entity`.
    ///
    /// Includes the columns declared on `entity` and loosely matched columns
    /// declared on any other type. When both define the same field name, the
    /// column declared on `entity` wins; among loose columns, the first
    /// registered wins.
    pub fn configs_for(&self, entity: &str) -> FieldConfigs {
        let columns = self.inner.load();
        let mut configs = FieldConfigs::new();
        for column in columns.iter().filter(|c| c.entity != entity && c.applies_to(entity)) {
            configs
                .entry(column.field.clone())
                .or_insert_with(|| Arc::clone(&column.config));
        }
        for column in columns.iter().filter(|c| c.entity == entity) {
            configs.insert(column.field.clone(), Arc::clone(&column.config));
        }
        configs
    }

    /// Encrypt a record of type `entity` with every column that applies to it.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] as described in [`crate::record::encrypt_record`].
    pub fn encrypt_entity(&self, entity: &str, fields: &Record) -> Result<Record, CodecError> {
        apply_record(fields, &self.configs_for(entity), Direction::Encrypt)
    }

    /// Decrypt a record of type `entity` with every column that applies to it.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] as described in [`crate::record::decrypt_record`].
    pub fn decrypt_entity(&self, entity: &str, fields: &Record) -> Result<Record, CodecError> {
        apply_record(fields, &self.configs_for(entity), Direction::Decrypt)
    }
}

impl Default for ColumnRegistry {
    fn default() -> Self {
        Self::new()
    }
}
