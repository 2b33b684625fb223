//! Query-plan builders.
//!
//! Each verb maps to one builder. A builder turns a [`ParsedIdentifier`] into a
//! [`QueryPlan`] once, at compile time, and expands that plan into an action
//! list on every call.
//!
//! | Verb         | Builder                    | Action       |
//! |--------------|----------------------------|--------------|
//! | `By`, `All`  | [`field_lookup`]           | `find_first` / `find_all` |
//! | `From`       | [`ancestry`]               | `ancestors`  |
//! | `JoinedWith` | [`join`]                   | `join`       |

pub mod ancestry;
pub mod field_lookup;
pub mod join;

use serde_json::Value;

use crate::adapter::{AdapterFactory, StoreHandle};
use crate::error::{GetError, GetResult};
use crate::executor;
use crate::parser::{ParsedIdentifier, Verb};
use crate::plan::{Action, ActionName, Options, QueryPlan};

/// Option that requests related records to be embedded in the result.
pub const EAGER_LOAD: &str = "eager_load";

/// Compile a parsed identifier into a plan.
pub fn build(parsed: &ParsedIdentifier, adapter: &dyn AdapterFactory) -> GetResult<QueryPlan> {
    match parsed.verb {
        Verb::By | Verb::All => field_lookup::plan(parsed, adapter),
        Verb::From => ancestry::plan(parsed, adapter),
        Verb::JoinedWith => join::plan(parsed, adapter),
    }
}

/// Resolve the store handle serving `entity`.
fn resolve_store(adapter: &dyn AdapterFactory, entity: &str) -> GetResult<StoreHandle> {
    adapter
        .context_for_entity(entity)
        .map_err(|err| executor::normalize(err, &[]))?
        .ok_or_else(|| GetError::base(format!("No store registered for entity '{entity}'")))
}

/// Null, empty strings, empty lists and empty maps.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Drop blank options. A blank filter means "no filter", never "match nothing".
pub(crate) fn compact(options: &Options) -> Options {
    options
        .iter()
        .filter(|(_, value)| !is_blank(value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Read a relation option: one name or a list of names.
pub(crate) fn relation_list(value: Option<&Value>, option: &str) -> GetResult<Vec<String>> {
    let invalid = || {
        GetError::arguments(format!(
            "`{option}` must be a relation name or a list of relation names"
        ))
    };
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(name)) if name.is_empty() => Ok(Vec::new()),
        Some(Value::String(name)) => Ok(vec![name.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}

/// Filter options must be maps when present.
pub(crate) fn ensure_map(options: &Options, option: &str) -> GetResult<()> {
    match options.get(option) {
        None | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(GetError::arguments(format!("`{option}` must be a map"))),
    }
}

/// Compact caller options and pull out the eager-load request, if any.
pub(crate) fn split_eager_load(options: &Options) -> GetResult<(Options, Option<Action>)> {
    let mut options = compact(options);
    let relations = relation_list(options.remove(EAGER_LOAD).as_ref(), EAGER_LOAD)?;
    if relations.is_empty() {
        return Ok((options, None));
    }

    let mut eager = Options::new();
    eager.insert(
        "relations".to_string(),
        Value::Array(relations.into_iter().map(Value::String).collect()),
    );
    Ok((options, Some(Action::new(ActionName::EagerLoad, eager))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options(value: Value) -> Options {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_compact_drops_blank_filters() {
        let raw = options(json!({
            "conditions": {},
            "order": "",
            "via": [],
            "missing": null,
            "limit": 0,
            "active": false,
            "offset": 2,
        }));
        assert_eq!(
            compact(&raw),
            options(json!({"limit": 0, "active": false, "offset": 2}))
        );
    }

    #[test]
    fn test_ensure_map() {
        let raw = options(json!({"conditions": {"id": 2}, "with_conditions": "id = 2"}));
        assert!(ensure_map(&raw, "conditions").is_ok());
        assert!(ensure_map(&raw, "missing").is_ok());
        let err = ensure_map(&raw, "with_conditions").unwrap_err();
        assert_eq!(err.to_string(), "Invalid arguments: `with_conditions` must be a map");
    }

    #[test]
    fn test_relation_list() {
        assert_eq!(relation_list(None, "via").unwrap(), Vec::<String>::new());
        assert_eq!(relation_list(Some(&json!("posts")), "via").unwrap(), vec!["posts"]);
        assert_eq!(
            relation_list(Some(&json!(["posts", "comments"])), "via").unwrap(),
            vec!["posts", "comments"]
        );
        assert!(relation_list(Some(&json!(3)), "via").is_err());
        assert!(relation_list(Some(&json!(["posts", 3])), "via").is_err());
    }

    #[test]
    fn test_split_eager_load() {
        let (rest, eager) =
            split_eager_load(&options(json!({"eager_load": "posts", "limit": 3}))).unwrap();
        assert_eq!(rest, options(json!({"limit": 3})));
        let eager = eager.unwrap();
        assert_eq!(eager.name, ActionName::EagerLoad);
        assert_eq!(eager.options, options(json!({"relations": ["posts"]})));

        let (_, eager) = split_eager_load(&options(json!({"eager_load": []}))).unwrap();
        assert_eq!(eager, None);
    }
}
