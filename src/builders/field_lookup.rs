//! Field-lookup builder: `UserByEmail`, `UsersByStatus`, `UserBy`, `AllUsers`.

use serde_json::Value;

use super::{ensure_map, resolve_store, split_eager_load};
use crate::adapter::AdapterFactory;
use crate::error::{GetError, GetResult};
use crate::inflect;
use crate::parser::{ParsedIdentifier, Verb};
use crate::plan::{Action, ActionName, Invocation, Options, PlanKind, QueryPlan};

const PRIMARY_KEY: &str = "id";

pub(crate) fn plan(parsed: &ParsedIdentifier, adapter: &dyn AdapterFactory) -> GetResult<QueryPlan> {
    let entity = inflect::underscore(&inflect::singularize(&parsed.result_entity));
    let store = resolve_store(adapter, &entity)?;

    Ok(QueryPlan {
        identifier: parsed.identifier.clone(),
        verb: parsed.verb,
        kind: PlanKind::FieldLookup {
            field: parsed.key.clone(),
            parameterless: parsed.verb == Verb::All,
        },
        is_collection: inflect::is_plural(&parsed.result_entity),
        target_entity: entity,
        store,
    })
}

pub(crate) fn actions(
    field: Option<&str>,
    parameterless: bool,
    is_collection: bool,
    invocation: &Invocation,
) -> GetResult<Vec<Action>> {
    if parameterless {
        if !invocation.is_empty() {
            return Err(GetError::options_not_permitted());
        }
        return Ok(vec![Action::new(ActionName::FindAll, Options::new())]);
    }

    let params = match invocation.args.as_slice() {
        [params] => params,
        args => {
            return Err(GetError::arguments(format!(
                "wrong number of arguments (given {}, expected 1)",
                args.len()
            )));
        }
    };

    let mut conditions = match field {
        Some(field) => {
            let mut conditions = Options::new();
            conditions.insert(field.to_string(), params.clone());
            conditions
        }
        None => params.as_object().cloned().ok_or_else(|| {
            GetError::arguments("open-ended lookups take a map of conditions")
        })?,
    };

    let (mut options, eager_load) = split_eager_load(&invocation.options)?;
    ensure_map(&options, "conditions")?;

    // `UserById` with no other filters is a primary-key lookup
    if field == Some(PRIMARY_KEY) && !is_collection && options.is_empty() {
        let mut options = Options::new();
        options.insert(PRIMARY_KEY.to_string(), params.clone());
        let mut actions = vec![Action::new(ActionName::Get, options)];
        actions.extend(eager_load);
        return Ok(actions);
    }

    if let Some(Value::Object(extra)) = options.remove("conditions") {
        for (key, value) in extra {
            conditions.entry(key).or_insert(value);
        }
    }
    options.insert("conditions".to_string(), Value::Object(conditions));

    let name = if is_collection {
        ActionName::FindAll
    } else {
        ActionName::FindFirst
    };

    let mut actions = vec![Action::new(name, options)];
    actions.extend(eager_load);
    Ok(actions)
}
