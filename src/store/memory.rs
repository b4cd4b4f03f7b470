//! In-memory record store
//!
//! Tables are keyed by model name; rows by identity. Identities are
//! assigned from a per-model counter starting at 1.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::convert::FieldValue;
use crate::schema::FieldDescriptor;

use super::{Criterion, DynamicRecord, Record, RecordStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Table {
    next_identity: i64,
    rows: BTreeMap<i64, DynamicRecord>,
}

/// Thread-safe store holding [`DynamicRecord`]s
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists a new record and returns its identity.
    ///
    /// A record that already carries an identity keeps it.
    pub fn insert(&self, mut record: DynamicRecord) -> StoreResult<i64> {
        if record.primary_key().is_none() {
            return Err(StoreError::NoPrimaryKey(record.model().to_string()));
        }

        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let table = tables.entry(record.model().to_string()).or_default();

        let identity = match record.identity() {
            Some(identity) => identity,
            None => {
                table.next_identity += 1;
                while table.rows.contains_key(&table.next_identity) {
                    table.next_identity += 1;
                }
                table.next_identity
            }
        };

        record.set_identity(identity);
        table.rows.insert(identity, record);
        Ok(identity)
    }

    /// Replaces a persisted record.
    pub fn update(&self, record: &DynamicRecord) -> StoreResult<()> {
        let identity = record
            .identity()
            .ok_or_else(|| StoreError::NoPrimaryKey(record.model().to_string()))?;

        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let row = tables
            .get_mut(record.model())
            .and_then(|table| table.rows.get_mut(&identity))
            .ok_or_else(|| StoreError::NotFound {
                model: record.model().to_string(),
                identity,
            })?;

        *row = record.clone();
        Ok(())
    }

    pub fn get(&self, model: &str, identity: i64) -> StoreResult<Option<DynamicRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .get(model)
            .and_then(|table| table.rows.get(&identity))
            .cloned())
    }

    /// Records of `model` satisfying every criterion, in identity order
    pub fn select(&self, model: &str, criteria: &[Criterion]) -> StoreResult<Vec<DynamicRecord>> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        let rows = match tables.get(model) {
            Some(table) => table
                .rows
                .values()
                .filter(|row| criteria.iter().all(|c| c.matches(*row)))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(rows)
    }

    /// Number of records of `model`
    pub fn len(&self, model: &str) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.get(model).map_or(0, |table| table.rows.len()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn exists_matching(
        &self,
        model: &str,
        field: &FieldDescriptor,
        value: &FieldValue,
        exclude_identity: Option<i64>,
    ) -> StoreResult<bool> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        let table = match tables.get(model) {
            Some(table) => table,
            None => return Ok(false),
        };

        Ok(table.rows.iter().any(|(identity, row)| {
            Some(*identity) != exclude_identity && row.read(&field.attribute) == *value
        }))
    }

    fn fetch_by_identity(
        &self,
        model: &str,
        identity: i64,
    ) -> StoreResult<Option<Box<dyn Record>>> {
        Ok(self
            .get(model, identity)?
            .map(|record| Box::new(record) as Box<dyn Record>))
    }
}
