//! Compiled query plans and the actions they expand to.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::adapter::StoreHandle;
use crate::builders;
use crate::error::GetResult;
use crate::inflect;
use crate::parser::Verb;

/// Option map passed to adapter actions.
pub type Options = serde_json::Map<String, Value>;

/// Prefix of conventionally named entity types.
pub const ENTITY_TYPE_PREFIX: &str = "Get";

/// Adapter capability selected by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    Get,
    FindFirst,
    FindAll,
    Ancestors,
    Join,
    EagerLoad,
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionName::Get => "get",
            ActionName::FindFirst => "find_first",
            ActionName::FindAll => "find_all",
            ActionName::Ancestors => "ancestors",
            ActionName::Join => "join",
            ActionName::EagerLoad => "eager_load",
        };
        f.write_str(name)
    }
}

/// One step of an execution: an adapter call and its options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub name: ActionName,
    pub options: Options,
}

impl Action {
    pub fn new(name: ActionName, options: Options) -> Self {
        Self { name, options }
    }
}

/// Runtime arguments of one query call: positional values plus a trailing
/// options map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub args: Vec<Value>,
    pub options: Options,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options.extend(options);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.options.is_empty()
    }
}

/// Builder-specific part of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "builder", rename_all = "snake_case")]
pub enum PlanKind {
    /// `By` and `All` identifiers.
    FieldLookup {
        field: Option<String>,
        /// `All` plans accept no runtime arguments.
        parameterless: bool,
    },
    /// `From` identifiers: start at an instance of `anchor` and walk to `result_key`.
    AncestorWalk { anchor: String, result_key: String },
    /// `JoinedWith` identifiers.
    Join { base_table: String, join_table: String },
}

/// A compiled identifier. Built once per identifier and shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub identifier: String,
    pub verb: Verb,
    pub kind: PlanKind,
    pub is_collection: bool,
    /// Underscored entity the plan fetches (`user`, `posts`).
    pub target_entity: String,
    pub store: StoreHandle,
}

impl QueryPlan {
    /// Expand the plan into its action list for one call.
    pub fn actions(&self, invocation: &Invocation) -> GetResult<Vec<Action>> {
        match &self.kind {
            PlanKind::FieldLookup {
                field,
                parameterless,
            } => builders::field_lookup::actions(
                field.as_deref(),
                *parameterless,
                self.is_collection,
                invocation,
            ),
            PlanKind::AncestorWalk { result_key, .. } => {
                builders::ancestry::actions(result_key, invocation)
            }
            PlanKind::Join { join_table, .. } => builders::join::actions(join_table, invocation),
        }
    }

    /// Key under which an explicit entity type can be registered (`user_by_email`).
    pub fn entity_key(&self) -> String {
        inflect::underscore(&self.identifier)
    }

    /// Name of the conventional entity type for this plan's results.
    pub fn dynamic_type_name(&self) -> String {
        let key = match &self.kind {
            PlanKind::AncestorWalk { result_key, .. } => result_key.clone(),
            _ if self.is_collection => inflect::pluralize(&self.target_entity),
            _ => self.target_entity.clone(),
        };
        format!("{ENTITY_TYPE_PREFIX}{}", inflect::camelize(&key))
    }
}
