//! Ancestor-walk builder: `PostsFromUser`, `CommentsFromUser` via posts.
//!
//! The walk starts at one instance of the key entity and follows a relation
//! chain outward to the result entity. The store handle therefore belongs to
//! the key entity, not to the result.

use serde_json::Value;

use super::{compact, ensure_map, relation_list, resolve_store};
use crate::adapter::AdapterFactory;
use crate::error::{GetError, GetResult};
use crate::inflect;
use crate::parser::ParsedIdentifier;
use crate::plan::{Action, ActionName, Invocation, PlanKind, QueryPlan};

pub(crate) fn plan(parsed: &ParsedIdentifier, adapter: &dyn AdapterFactory) -> GetResult<QueryPlan> {
    let key = parsed.key.as_deref().ok_or_else(|| {
        GetError::invalid_class_name(
            &parsed.identifier,
            "ancestor queries need an anchor entity, ie. PostsFromUser",
        )
    })?;
    let anchor = inflect::singularize(key);
    let store = resolve_store(adapter, &anchor)?;
    let result_key = inflect::underscore(&parsed.result_entity);

    Ok(QueryPlan {
        identifier: parsed.identifier.clone(),
        verb: parsed.verb,
        kind: PlanKind::AncestorWalk {
            anchor,
            result_key: result_key.clone(),
        },
        is_collection: inflect::is_plural(&parsed.result_entity),
        target_entity: result_key,
        store,
    })
}

pub(crate) fn actions(result_key: &str, invocation: &Invocation) -> GetResult<Vec<Action>> {
    let anchor = match invocation.args.as_slice() {
        [anchor] => anchor,
        args => {
            return Err(GetError::arguments(format!(
                "wrong number of arguments (given {}, expected 1 anchor)",
                args.len()
            )));
        }
    };

    let mut via = relation_list(invocation.options.get("via"), "via")?;
    if via.last().map(String::as_str) != Some(result_key) {
        via.push(result_key.to_string());
    }

    let mut options = compact(&invocation.options);
    ensure_map(&options, "conditions")?;
    options.remove("via");
    options.insert("id".to_string(), anchor_id(anchor)?);
    options.insert(
        "via".to_string(),
        Value::Array(via.into_iter().map(Value::String).collect()),
    );
    options.insert(
        "result_key".to_string(),
        Value::String(result_key.to_string()),
    );

    Ok(vec![Action::new(ActionName::Ancestors, options)])
}

/// The anchor is either a raw id or an object exposing one.
fn anchor_id(anchor: &Value) -> GetResult<Value> {
    match anchor {
        Value::Object(fields) => fields
            .get("id")
            .filter(|id| !id.is_null())
            .cloned()
            .ok_or_else(|| GetError::arguments("anchor does not expose an `id`")),
        Value::Null => Err(GetError::arguments("anchor is missing")),
        id => Ok(id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::plan::Options;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options(value: Value) -> Options {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_walk_from_raw_id() {
        let inv = Invocation::new().arg(7).option("via", "posts");
        let actions = actions("comments", &inv).unwrap();
        assert_eq!(
            actions,
            vec![Action::new(
                ActionName::Ancestors,
                options(json!({
                    "id": 7,
                    "via": ["posts", "comments"],
                    "result_key": "comments",
                }))
            )]
        );
    }

    #[test]
    fn test_walk_from_object_anchor() {
        let inv = Invocation::new().arg(json!({"id": 3, "name": "Ann"}));
        let actions = actions("posts", &inv).unwrap();
        assert_eq!(actions[0].options.get("id"), Some(&json!(3)));
        assert_eq!(actions[0].options.get("via"), Some(&json!(["posts"])));
    }

    #[test]
    fn test_final_hop_not_duplicated() {
        let inv = Invocation::new().arg(1).option("via", json!(["posts"]));
        let actions = actions("posts", &inv).unwrap();
        assert_eq!(actions[0].options.get("via"), Some(&json!(["posts"])));
    }

    #[test]
    fn test_filters_forwarded_and_blanks_dropped() {
        let inv = Invocation::new()
            .arg(1)
            .option("conditions", json!({"published": true}))
            .option("limit", 2)
            .option("order", "")
            .option("offset", Value::Null);
        let actions = actions("posts", &inv).unwrap();
        assert_eq!(
            actions[0].options,
            options(json!({
                "id": 1,
                "via": ["posts"],
                "result_key": "posts",
                "conditions": {"published": true},
                "limit": 2,
            }))
        );

        let inv = Invocation::new().arg(1).option("conditions", json!({}));
        let empty = super::actions("posts", &inv).unwrap();
        let absent = super::actions("posts", &Invocation::new().arg(1)).unwrap();
        assert_eq!(empty, absent);
    }

    #[test]
    fn test_anchor_without_id() {
        let inv = Invocation::new().arg(json!({"name": "Ann"}));
        let err = actions("posts", &inv).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arguments);

        let err = actions("posts", &Invocation::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Arguments);
    }
}
