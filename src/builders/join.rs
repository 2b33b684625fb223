//! Join builder: `UsersJoinedWithComments`.

use serde_json::Value;

use super::{ensure_map, resolve_store, split_eager_load};
use crate::adapter::AdapterFactory;
use crate::error::{GetError, GetResult};
use crate::inflect;
use crate::parser::ParsedIdentifier;
use crate::plan::{Action, ActionName, Invocation, PlanKind, QueryPlan};

pub(crate) fn plan(parsed: &ParsedIdentifier, adapter: &dyn AdapterFactory) -> GetResult<QueryPlan> {
    let join_table = parsed.key.clone().ok_or_else(|| {
        GetError::invalid_class_name(
            &parsed.identifier,
            "join queries need an association, ie. UsersJoinedWithComments",
        )
    })?;
    let store = resolve_store(
        adapter,
        &inflect::underscore(&inflect::singularize(&parsed.result_entity)),
    )?;
    let base_table = inflect::underscore(&parsed.result_entity);

    Ok(QueryPlan {
        identifier: parsed.identifier.clone(),
        verb: parsed.verb,
        kind: PlanKind::Join {
            base_table: base_table.clone(),
            join_table,
        },
        // a join always yields a record set, whatever the entity's number
        is_collection: true,
        target_entity: base_table,
        store,
    })
}

/// Join options come from the options map, or from a single positional map.
pub(crate) fn actions(join_table: &str, invocation: &Invocation) -> GetResult<Vec<Action>> {
    let mut options = invocation.options.clone();
    match invocation.args.as_slice() {
        [] => {}
        [Value::Object(positional)] => {
            for (key, value) in positional {
                options.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        _ => {
            return Err(GetError::arguments(
                "join queries take a single map of options",
            ));
        }
    }

    let (mut options, eager_load) = split_eager_load(&options)?;
    ensure_map(&options, "conditions")?;
    ensure_map(&options, "with_conditions")?;
    options.insert("with".to_string(), Value::String(join_table.to_string()));

    let mut actions = vec![Action::new(ActionName::Join, options)];
    actions.extend(eager_load);
    Ok(actions)
}
