//! In-memory adapter over JSON fixtures.
//!
//! Tables are lists of JSON objects; relations are declared per table:
//!
//! ```json
//! {
//!   "tables": {
//!     "users": [{"id": 1, "email": "a@example.com"}],
//!     "posts": [{"id": 10, "user_id": 1, "title": "Hello"}]
//!   },
//!   "relations": {
//!     "users": {"posts": {"table": "posts", "foreign_key": "user_id"}},
//!     "posts": {"user": {"table": "users", "foreign_key": "user_id", "kind": "belongs_to"}}
//!   }
//! }
//! ```
//!
//! Rows keep insertion order unless an `order` option is given.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::{
    Adapter, AdapterError, AdapterErrorKind, AdapterFactory, AdapterResult, Attributes, RawResult,
    Record, StoreHandle,
};
use crate::error::{GetError, GetResult};
use crate::inflect;
use crate::plan::Options;

/// Name the memory adapter is registered under.
pub const NAME: &str = "memory";

const EXPECTED: &[AdapterErrorKind] = &[AdapterErrorKind::NotFound, AdapterErrorKind::Backend];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Rows of `table` whose `foreign_key` equals this row's `id`.
    #[default]
    HasMany,
    /// The row of `table` whose `id` equals this row's `foreign_key`.
    BelongsTo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub table: String,
    pub foreign_key: String,
    #[serde(default)]
    pub kind: RelationKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    tables: BTreeMap<String, Vec<Record>>,
    #[serde(default)]
    relations: BTreeMap<String, BTreeMap<String, Relation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> GetResult<Self> {
        serde_json::from_str(json).map_err(|e| GetError::Config(format!("invalid fixture: {e}")))
    }

    pub fn load(path: &Path) -> GetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Add a table. Rows that are not JSON objects are skipped.
    pub fn table(mut self, name: impl Into<String>, rows: impl IntoIterator<Item = Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(attributes) => Some(Record::new(attributes)),
                _ => None,
            })
            .collect();
        self.tables.insert(name.into(), rows);
        self
    }

    pub fn insert(&mut self, table: &str, row: Attributes) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(Record::new(row));
    }

    pub fn has_many(self, from: &str, name: &str, table: &str, foreign_key: &str) -> Self {
        self.relation(from, name, table, foreign_key, RelationKind::HasMany)
    }

    pub fn belongs_to(self, from: &str, name: &str, table: &str, foreign_key: &str) -> Self {
        self.relation(from, name, table, foreign_key, RelationKind::BelongsTo)
    }

    fn relation(
        mut self,
        from: &str,
        name: &str,
        table: &str,
        foreign_key: &str,
        kind: RelationKind,
    ) -> Self {
        self.relations.entry(from.to_string()).or_default().insert(
            name.to_string(),
            Relation {
                table: table.to_string(),
                foreign_key: foreign_key.to_string(),
                kind,
            },
        );
        self
    }

    pub fn rows(&self, table: &str) -> &[Record] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    fn find_relation(&self, table: &str, name: &str) -> Option<&Relation> {
        self.relations.get(table).and_then(|relations| relations.get(name))
    }

    /// Rows of the related table reachable from `record`.
    fn related(&self, relation: &Relation, record: &Record) -> Vec<Record> {
        let (ours, theirs) = match relation.kind {
            RelationKind::HasMany => ("id", relation.foreign_key.as_str()),
            RelationKind::BelongsTo => (relation.foreign_key.as_str(), "id"),
        };
        let Some(key) = record.get(ours).filter(|key| !key.is_null()) else {
            return Vec::new();
        };
        self.rows(&relation.table)
            .iter()
            .filter(|row| row.get(theirs).is_some_and(|value| loose_eq(value, key)))
            .cloned()
            .collect()
    }
}

/// Serves every table of one [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapterFactory {
    store: Arc<MemoryStore>,
}

impl MemoryAdapterFactory {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl AdapterFactory for MemoryAdapterFactory {
    fn expected_errors(&self) -> AdapterResult<&[AdapterErrorKind]> {
        Ok(EXPECTED)
    }

    fn entity_context_map(&self) -> AdapterResult<BTreeMap<String, StoreHandle>> {
        Ok(self
            .store
            .tables
            .keys()
            .map(|table| (inflect::singularize(table), StoreHandle::new(table.as_str())))
            .collect())
    }

    fn context_for_entity(&self, entity: &str) -> AdapterResult<Option<StoreHandle>> {
        if let Some(handle) = self.entity_context_map()?.remove(entity) {
            return Ok(Some(handle));
        }
        Ok(self
            .store
            .tables
            .contains_key(entity)
            .then(|| StoreHandle::new(entity)))
    }

    fn open(&self, store: &StoreHandle) -> Box<dyn Adapter> {
        Box::new(MemoryAdapter::new(self.store.clone(), store))
    }
}

/// What the previous action left behind.
#[derive(Debug, Clone)]
enum Context {
    Table(String),
    Record(String, Record),
    Records(String, Vec<Record>),
}

impl Context {
    fn table(&self) -> &str {
        match self {
            Context::Table(table) | Context::Record(table, _) | Context::Records(table, _) => table,
        }
    }
}

pub struct MemoryAdapter {
    store: Arc<MemoryStore>,
    context: Context,
}

impl MemoryAdapter {
    pub fn new(store: Arc<MemoryStore>, handle: &StoreHandle) -> Self {
        Self {
            store,
            context: Context::Table(handle.as_str().to_string()),
        }
    }

    fn current_rows(&self) -> Vec<Record> {
        match &self.context {
            Context::Table(table) => self.store.rows(table).to_vec(),
            Context::Record(_, record) => vec![record.clone()],
            Context::Records(_, records) => records.clone(),
        }
    }

    fn result(&self) -> RawResult {
        match &self.context {
            Context::Table(table) => RawResult::Records(self.store.rows(table).to_vec().into()),
            Context::Record(_, record) => RawResult::Record(record.clone()),
            Context::Records(_, records) => RawResult::Records(records.clone().into()),
        }
    }

    /// Follow relation `name` from the current context.
    fn walk(&self, name: &str) -> AdapterResult<Context> {
        let table = self.context.table();
        let relation = self.store.find_relation(table, name).ok_or_else(|| {
            AdapterError::invalid_relation(format!(
                "Invalid relation '{name}' on {table}. \
                 Ensure that the plurality of your associations is correct."
            ))
        })?;

        let sources = match &self.context {
            Context::Table(_) => {
                return Err(AdapterError::backend(format!(
                    "cannot walk '{name}' without an anchor record"
                )));
            }
            Context::Record(_, record) => std::slice::from_ref(record),
            Context::Records(_, records) => records.as_slice(),
        };

        let mut reached: Vec<Record> = Vec::new();
        for source in sources {
            for row in self.store.related(relation, source) {
                if !reached.contains(&row) {
                    reached.push(row);
                }
            }
        }

        match (&self.context, relation.kind) {
            (Context::Record(..), RelationKind::BelongsTo) => match reached.into_iter().next() {
                Some(record) => Ok(Context::Record(relation.table.clone(), record)),
                None => Err(AdapterError::not_found(format!(
                    "Couldn't find {} for '{name}'",
                    inflect::singularize(&relation.table)
                ))),
            },
            _ => Ok(Context::Records(relation.table.clone(), reached)),
        }
    }
}

impl Adapter for MemoryAdapter {
    fn get(&mut self, options: &Options) -> AdapterResult<RawResult> {
        let id = options
            .get("id")
            .ok_or_else(|| AdapterError::backend("get requires an `id`"))?;
        let table = self.context.table().to_string();
        let record = self
            .current_rows()
            .into_iter()
            .find(|row| row.get("id").is_some_and(|value| loose_eq(value, id)))
            .ok_or_else(|| {
                AdapterError::not_found(format!(
                    "Couldn't find {} with 'id'={id}",
                    inflect::singularize(&table)
                ))
            })?;
        self.context = Context::Record(table, record);
        Ok(self.result())
    }

    fn find_first(&mut self, options: &Options) -> AdapterResult<RawResult> {
        self.find_all(options)?;
        let table = self.context.table().to_string();
        let record = self.current_rows().into_iter().next().ok_or_else(|| {
            AdapterError::not_found(format!("Couldn't find {}", inflect::singularize(&table)))
        })?;
        self.context = Context::Record(table, record);
        Ok(self.result())
    }

    fn find_all(&mut self, options: &Options) -> AdapterResult<RawResult> {
        let rows = filter(self.current_rows(), options.get("conditions"))?;
        let rows = window(rows, options)?;
        self.context = Context::Records(self.context.table().to_string(), rows);
        Ok(self.result())
    }

    fn ancestors(&mut self, options: &Options) -> AdapterResult<RawResult> {
        self.get(options)?;

        let via = match options.get("via") {
            Some(Value::Array(names)) => names
                .iter()
                .map(|name| {
                    name.as_str()
                        .ok_or_else(|| AdapterError::backend("`via` must list relation names"))
                })
                .collect::<AdapterResult<Vec<_>>>()?,
            None => Vec::new(),
            Some(_) => return Err(AdapterError::backend("`via` must list relation names")),
        };
        for name in via {
            self.context = self.walk(name)?;
        }

        match &self.context {
            Context::Records(..) => {
                self.find_all(options)?;
            }
            Context::Record(table, record) => {
                let kept = filter(vec![record.clone()], options.get("conditions"))?;
                if kept.is_empty() {
                    return Err(AdapterError::not_found(format!(
                        "Couldn't find {}",
                        inflect::singularize(table)
                    )));
                }
            }
            Context::Table(_) => {}
        }
        Ok(self.result())
    }

    fn join(&mut self, options: &Options) -> AdapterResult<RawResult> {
        let table = self.context.table().to_string();
        let with = options
            .get("with")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::backend("join requires `with`"))?;
        let relation = self.store.find_relation(&table, with).ok_or_else(|| {
            AdapterError::backend(format!(
                "Can't join '{table}' to association named '{with}'; perhaps you misspelled it?"
            ))
        })?;

        let mut joined = Vec::new();
        for row in filter(self.current_rows(), options.get("conditions"))? {
            let related = filter(
                self.store.related(relation, &row),
                options.get("with_conditions"),
            )?;
            if !related.is_empty() {
                joined.push(row);
            }
        }

        self.context = Context::Records(table, window(joined, options)?);
        Ok(self.result())
    }

    fn eager_load(&mut self, options: &Options) -> AdapterResult<RawResult> {
        let relations: Vec<&str> = match options.get("relations") {
            Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(name)) => vec![name.as_str()],
            _ => Vec::new(),
        };

        let table = self.context.table().to_string();
        let mut resolved = Vec::with_capacity(relations.len());
        for name in relations {
            let relation = self.store.find_relation(&table, name).ok_or_else(|| {
                AdapterError::backend(format!(
                    "Association named '{name}' was not found on {table}; perhaps you misspelled it?"
                ))
            })?;
            resolved.push((name, relation));
        }

        let embed = |record: &mut Record| {
            for (name, relation) in &resolved {
                let related = self.store.related(relation, record);
                let value = match relation.kind {
                    RelationKind::HasMany => Value::Array(
                        related
                            .into_iter()
                            .map(|r| Value::Object(r.into_hash()))
                            .collect(),
                    ),
                    RelationKind::BelongsTo => related
                        .into_iter()
                        .next()
                        .map(|r| Value::Object(r.into_hash()))
                        .unwrap_or(Value::Null),
                };
                record.insert(*name, value);
            }
        };

        let context = match self.context.clone() {
            Context::Table(table) => {
                let mut rows = self.store.rows(&table).to_vec();
                rows.iter_mut().for_each(embed);
                Context::Records(table, rows)
            }
            Context::Record(table, mut record) => {
                embed(&mut record);
                Context::Record(table, record)
            }
            Context::Records(table, mut rows) => {
                rows.iter_mut().for_each(embed);
                Context::Records(table, rows)
            }
        };
        self.context = context;
        Ok(self.result())
    }

    fn to_hash(&self) -> AdapterResult<Attributes> {
        match &self.context {
            Context::Record(_, record) => Ok(record.to_hash()),
            _ => Err(AdapterError::backend("to_hash needs a single record")),
        }
    }
}

/// Keep rows matching every condition. List values match any member.
fn filter(rows: Vec<Record>, conditions: Option<&Value>) -> AdapterResult<Vec<Record>> {
    let conditions = match conditions {
        None | Some(Value::Null) => return Ok(rows),
        Some(Value::Object(conditions)) => conditions,
        Some(_) => return Err(AdapterError::backend("`conditions` must be a map")),
    };
    Ok(rows
        .into_iter()
        .filter(|row| {
            conditions
                .iter()
                .all(|(field, expected)| satisfies(row.get(field), expected))
        })
        .collect())
}

fn satisfies(actual: Option<&Value>, expected: &Value) -> bool {
    match expected {
        Value::Array(options) => options.iter().any(|option| satisfies(actual, option)),
        Value::Null => actual.is_none_or(Value::is_null),
        expected => actual.is_some_and(|actual| loose_eq(actual, expected)),
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            n.to_string() == *s
        }
        _ => false,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn unsigned(options: &Options, key: &str) -> AdapterResult<Option<usize>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| AdapterError::backend(format!("`{key}` must be a non-negative integer"))),
    }
}

/// Apply `order` ("field" or "field desc"), `offset` and `limit`.
fn window(mut rows: Vec<Record>, options: &Options) -> AdapterResult<Vec<Record>> {
    match options.get("order") {
        None | Some(Value::Null) => {}
        Some(Value::String(order)) => {
            let mut parts = order.split_whitespace();
            let field = parts.next().unwrap_or_default();
            let descending = parts
                .next()
                .is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));
            rows.sort_by(|a, b| {
                let ord = compare(a.get(field), b.get(field));
                if descending { ord.reverse() } else { ord }
            });
        }
        Some(_) => return Err(AdapterError::backend("`order` must be a string")),
    }

    let offset = unsigned(options, "offset")?.unwrap_or(0);
    let limit = unsigned(options, "limit")?.unwrap_or(usize::MAX);
    Ok(rows.into_iter().skip(offset).take(limit).collect())
}
