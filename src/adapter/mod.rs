//! Store adapter contract.
//!
//! An [`AdapterFactory`] describes a backend: which store handle serves which
//! entity, and which of its failures are expected domain conditions. The
//! executor opens one [`Adapter`] per query run and drives it action by
//! action. Every capability defaults to `NotImplemented`, so a backend only
//! implements what it supports.

pub mod memory;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::plan::Options;

/// Attribute map of one record.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Opaque reference to the store backing an entity (a table, a model).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreHandle(String);

impl StoreHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single raw record as handed back by an adapter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Attributes);

impl Record {
    pub fn new(attributes: Attributes) -> Self {
        Self(attributes)
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: serde_json::Value) {
        self.0.insert(field.into(), value);
    }

    pub fn to_hash(&self) -> Attributes {
        self.0.clone()
    }

    pub fn into_hash(self) -> Attributes {
        self.0
    }
}

impl From<Attributes> for Record {
    fn from(attributes: Attributes) -> Self {
        Self(attributes)
    }
}

/// An already-resolved set of records. Cloning shares the underlying rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet(Arc<Vec<Record>>);

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self(Arc::new(records))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.0.get(index)
    }

    pub fn first(&self) -> Option<&Record> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Record> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.0.iter()
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

/// What an adapter action returns.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Record(Record),
    Records(RecordSet),
}

/// Failure categories an adapter can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterErrorKind {
    /// No row matched.
    NotFound,
    /// A named relation does not exist on the current record.
    InvalidRelation,
    /// The adapter does not provide this capability.
    NotImplemented,
    /// Any other backend failure.
    Backend,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::NotFound, message)
    }

    pub fn invalid_relation(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::InvalidRelation, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(AdapterErrorKind::Backend, message)
    }

    pub fn not_implemented(capability: &str) -> Self {
        Self::new(
            AdapterErrorKind::NotImplemented,
            format!("You must implement `{capability}` in your adapter."),
        )
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Backend-level half of the contract, shared by every query run.
pub trait AdapterFactory: fmt::Debug + Send + Sync {
    /// Failure kinds that are domain conditions rather than bugs.
    fn expected_errors(&self) -> AdapterResult<&[AdapterErrorKind]> {
        Err(AdapterError::not_implemented("expected_errors"))
    }

    /// Canonical entity key (`user`) to store handle.
    fn entity_context_map(&self) -> AdapterResult<BTreeMap<String, StoreHandle>> {
        Err(AdapterError::not_implemented("entity_context_map"))
    }

    fn context_for_entity(&self, entity: &str) -> AdapterResult<Option<StoreHandle>> {
        Ok(self.entity_context_map()?.get(entity).cloned())
    }

    /// Open an adapter positioned on `store`.
    fn open(&self, store: &StoreHandle) -> Box<dyn Adapter>;
}

/// Per-run half of the contract. Actions chain: each one operates on the
/// context left behind by the previous one.
pub trait Adapter {
    fn get(&mut self, _options: &Options) -> AdapterResult<RawResult> {
        Err(AdapterError::not_implemented("get"))
    }

    fn find_first(&mut self, _options: &Options) -> AdapterResult<RawResult> {
        Err(AdapterError::not_implemented("find_first"))
    }

    fn find_all(&mut self, _options: &Options) -> AdapterResult<RawResult> {
        Err(AdapterError::not_implemented("find_all"))
    }

    fn ancestors(&mut self, _options: &Options) -> AdapterResult<RawResult> {
        Err(AdapterError::not_implemented("ancestors"))
    }

    fn join(&mut self, _options: &Options) -> AdapterResult<RawResult> {
        Err(AdapterError::not_implemented("join"))
    }

    fn eager_load(&mut self, _options: &Options) -> AdapterResult<RawResult> {
        Err(AdapterError::not_implemented("eager_load"))
    }

    /// Attributes of the current single record.
    fn to_hash(&self) -> AdapterResult<Attributes> {
        Err(AdapterError::not_implemented("to_hash"))
    }
}
