//! Turns raw adapter results into entities.

use dashmap::DashMap;
use tracing::debug;

use super::{EntityCollection, EntityType, Output};
use crate::adapter::{AdapterError, RawResult};
use crate::config::Config;
use crate::error::{GetError, GetResult};
use crate::plan::QueryPlan;

/// Resolves entity types and wraps raw results.
///
/// Conventionally named types are synthesized on first use and cached until
/// [`EntityFactory::clear`].
#[derive(Debug, Default)]
pub struct EntityFactory {
    synthesized: DashMap<String, EntityType>,
}

impl EntityFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity type for a plan's results. An explicit registration for the
    /// plan's entity key always wins over the conventional `Get<Name>` type.
    pub fn resolve(&self, plan: &QueryPlan, config: &Config) -> EntityType {
        if let Some(registered) = config.entity_for(&plan.entity_key()) {
            return registered.clone();
        }

        let name = plan.dynamic_type_name();
        self.synthesized
            .entry(name.clone())
            .or_insert_with(|| {
                debug!(entity_type = %name, "synthesized entity type");
                EntityType::new(name)
            })
            .value()
            .clone()
    }

    pub fn build(
        &self,
        raw: RawResult,
        plan: &QueryPlan,
        entity_type: EntityType,
    ) -> GetResult<Output> {
        match (plan.is_collection, raw) {
            (true, RawResult::Records(records)) => Ok(Output::Collection(EntityCollection::new(
                entity_type,
                records,
            ))),
            (false, RawResult::Record(record)) => {
                Ok(Output::Single(entity_type.construct(record.into_hash())))
            }
            (true, RawResult::Record(_)) => Err(shape_mismatch(plan, "a record set", "one record")),
            (false, RawResult::Records(_)) => {
                Err(shape_mismatch(plan, "one record", "a record set"))
            }
        }
    }

    /// Number of synthesized types currently cached.
    pub fn synthesized(&self) -> usize {
        self.synthesized.len()
    }

    pub fn clear(&self) {
        self.synthesized.clear();
    }
}

fn shape_mismatch(plan: &QueryPlan, expected: &str, got: &str) -> GetError {
    GetError::Adapter(AdapterError::backend(format!(
        "{} expects {expected} but the adapter returned {got}",
        plan.identifier
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Record, StoreHandle};
    use crate::entity::Entity;
    use crate::error::ErrorKind;
    use crate::parser::Verb;
    use crate::plan::PlanKind;
    use serde_json::json;

    fn plan(identifier: &str, is_collection: bool) -> QueryPlan {
        QueryPlan {
            identifier: identifier.to_string(),
            verb: Verb::By,
            kind: PlanKind::FieldLookup {
                field: Some("email".to_string()),
                parameterless: false,
            },
            is_collection,
            target_entity: "user".to_string(),
            store: StoreHandle::new("users"),
        }
    }

    fn record() -> Record {
        Record::new(json!({"id": 1, "email": "a@example.com"}).as_object().unwrap().clone())
    }

    #[test]
    fn test_conventional_types_are_cached() {
        let factory = EntityFactory::new();
        let config = Config::default();

        let single = factory.resolve(&plan("UserByEmail", false), &config);
        assert_eq!(single.name(), "GetUser");
        let many = factory.resolve(&plan("UsersByEmail", true), &config);
        assert_eq!(many.name(), "GetUsers");
        factory.resolve(&plan("UserByName", false), &config);
        assert_eq!(factory.synthesized(), 2);

        factory.clear();
        assert_eq!(factory.synthesized(), 0);
    }

    #[test]
    fn test_registration_wins() {
        let factory = EntityFactory::new();
        let mut config = Config::default();
        config.register_entity("user_by_email", EntityType::new("Account"));

        let resolved = factory.resolve(&plan("UserByEmail", false), &config);
        assert_eq!(resolved.name(), "Account");
        assert_eq!(factory.synthesized(), 0);
    }

    #[test]
    fn test_build_single_and_collection() {
        let factory = EntityFactory::new();
        let single = factory
            .build(
                RawResult::Record(record()),
                &plan("UserByEmail", false),
                EntityType::new("GetUser"),
            )
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(single["email"], json!("a@example.com"));

        let many = factory
            .build(
                RawResult::Records(vec![record(), record()].into()),
                &plan("UsersByEmail", true),
                EntityType::new("GetUsers"),
            )
            .unwrap()
            .into_collection()
            .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many.get(0).unwrap().entity_type().name(), "GetUser");
    }

    #[test]
    fn test_registered_constructor_output_is_returned() {
        let factory = EntityFactory::new();
        let mut config = Config::default();
        config.register_entity(
            "user_by_email",
            EntityType::with_constructor("Account", |ty, mut attributes| {
                attributes.remove("email");
                attributes.insert("masked".to_string(), json!(true));
                Entity::new(ty.clone(), attributes)
            }),
        );

        let plan = plan("UserByEmail", false);
        let entity_type = factory.resolve(&plan, &config);
        let account = factory
            .build(RawResult::Record(record()), &plan, entity_type)
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(account.entity_type().name(), "Account");
        assert_eq!(account["masked"], json!(true));
        assert!(!account.contains("email"));
    }

    #[test]
    fn test_shape_mismatch() {
        let factory = EntityFactory::new();
        let err = factory
            .build(
                RawResult::Record(record()),
                &plan("UsersByEmail", true),
                EntityType::new("GetUsers"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Adapter);
    }
}
