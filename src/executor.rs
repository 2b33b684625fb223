//! Query executor.
//!
//! Runs a plan's action list, in order, against one adapter opened on the
//! plan's store handle. The last action's result is the query's raw result.

use tracing::trace;

use crate::adapter::{
    Adapter, AdapterError, AdapterErrorKind, AdapterFactory, Attributes, RawResult, Record,
};
use crate::error::{GetError, GetResult};
use crate::plan::{Action, ActionName, Invocation, QueryPlan};

/// Executor for one call of a compiled plan.
pub struct Executor<'p> {
    plan: &'p QueryPlan,
    actions: Vec<Action>,
    adapter: Box<dyn Adapter>,
    expected: Vec<AdapterErrorKind>,
}

impl<'p> Executor<'p> {
    pub fn new(
        plan: &'p QueryPlan,
        factory: &dyn AdapterFactory,
        invocation: &Invocation,
    ) -> GetResult<Self> {
        let actions = plan.actions(invocation)?;
        let expected = factory
            .expected_errors()
            .map_err(|err| normalize(err, &[]))?
            .to_vec();

        Ok(Self {
            plan,
            actions,
            adapter: factory.open(&plan.store),
            expected,
        })
    }

    pub fn plan(&self) -> &QueryPlan {
        self.plan
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn run(self) -> GetResult<RawResult> {
        let Self {
            plan,
            actions,
            mut adapter,
            expected,
        } = self;

        let mut result = None;
        for action in &actions {
            trace!(identifier = %plan.identifier, action = %action.name, "running action");
            let raw = dispatch(adapter.as_mut(), action).map_err(|err| normalize(err, &expected))?;
            result = Some(raw);
        }

        match result {
            // scalar results are read back through the adapter
            Some(RawResult::Record(_)) if !plan.is_collection => {
                let attributes = adapter.to_hash().map_err(|err| normalize(err, &expected))?;
                Ok(RawResult::Record(Record::new(attributes)))
            }
            Some(raw) => Ok(raw),
            None => Err(GetError::base(format!("{} has no actions", plan.identifier))),
        }
    }
}

fn dispatch(adapter: &mut dyn Adapter, action: &Action) -> Result<RawResult, AdapterError> {
    let options = &action.options;
    match action.name {
        ActionName::Get => adapter.get(options),
        ActionName::FindFirst => adapter.find_first(options),
        ActionName::FindAll => adapter.find_all(options),
        ActionName::Ancestors => adapter.ancestors(options),
        ActionName::Join => adapter.join(options),
        ActionName::EagerLoad => adapter.eager_load(options),
    }
}

/// Map an adapter failure onto the error taxonomy.
///
/// Invalid relations and missing capabilities are always normalized. Other
/// kinds are normalized only when the adapter declares them expected;
/// anything else propagates unchanged.
pub(crate) fn normalize(err: AdapterError, expected: &[AdapterErrorKind]) -> GetError {
    match err.kind {
        AdapterErrorKind::InvalidRelation => GetError::InvalidAncestry(err.message),
        AdapterErrorKind::NotImplemented => GetError::MethodNotImplemented(err.message),
        kind if !expected.contains(&kind) => GetError::Adapter(err),
        AdapterErrorKind::NotFound => GetError::RecordNotFound(err.message),
        AdapterErrorKind::Backend => GetError::Base(err.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StoreHandle;
    use crate::error::ErrorKind;
    use crate::parser::Verb;
    use crate::plan::{Options, PlanKind};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Records every call and fails on demand.
    struct Recording {
        calls: Arc<Mutex<Vec<String>>>,
        fail_with: Option<AdapterErrorKind>,
    }

    impl Adapter for Recording {
        fn find_all(&mut self, options: &Options) -> Result<RawResult, AdapterError> {
            self.calls.lock().unwrap().push(format!("find_all {}", json!(options)));
            if let Some(kind) = self.fail_with {
                return Err(AdapterError::new(kind, "adapter said no"));
            }
            Ok(RawResult::Records(vec![Record::default()].into()))
        }

        fn eager_load(&mut self, _options: &Options) -> Result<RawResult, AdapterError> {
            self.calls.lock().unwrap().push("eager_load".to_string());
            Ok(RawResult::Records(Vec::new().into()))
        }

        fn get(&mut self, options: &Options) -> Result<RawResult, AdapterError> {
            self.calls.lock().unwrap().push(format!("get {}", json!(options)));
            Ok(RawResult::Record(Record::default()))
        }

        fn to_hash(&self) -> Result<Attributes, AdapterError> {
            self.calls.lock().unwrap().push("to_hash".to_string());
            Ok(json!({"id": 7}).as_object().unwrap().clone())
        }
    }

    #[derive(Debug)]
    struct RecordingFactory {
        calls: Arc<Mutex<Vec<String>>>,
        fail_with: Option<AdapterErrorKind>,
        expected: Vec<AdapterErrorKind>,
    }

    impl AdapterFactory for RecordingFactory {
        fn expected_errors(&self) -> Result<&[AdapterErrorKind], AdapterError> {
            Ok(self.expected.as_slice())
        }

        fn open(&self, _store: &StoreHandle) -> Box<dyn Adapter> {
            Box::new(Recording {
                calls: self.calls.clone(),
                fail_with: self.fail_with,
            })
        }
    }

    fn factory(fail_with: Option<AdapterErrorKind>) -> RecordingFactory {
        RecordingFactory {
            calls: Arc::default(),
            fail_with,
            expected: vec![AdapterErrorKind::NotFound, AdapterErrorKind::Backend],
        }
    }

    fn users_by_status() -> QueryPlan {
        QueryPlan {
            identifier: "UsersByStatus".to_string(),
            verb: Verb::By,
            kind: PlanKind::FieldLookup {
                field: Some("status".to_string()),
                parameterless: false,
            },
            is_collection: true,
            target_entity: "user".to_string(),
            store: StoreHandle::new("users"),
        }
    }

    #[test]
    fn test_actions_run_in_order() {
        let factory = factory(None);
        let plan = users_by_status();
        let inv = Invocation::new().arg("active").option("eager_load", "posts");
        let executor = Executor::new(&plan, &factory, &inv).unwrap();
        assert_eq!(executor.actions().len(), 2);

        let raw = executor.run().unwrap();
        assert_eq!(raw, RawResult::Records(Vec::new().into()));
        assert_eq!(
            *factory.calls.lock().unwrap(),
            vec![
                r#"find_all {"conditions":{"status":"active"}}"#.to_string(),
                "eager_load".to_string(),
            ]
        );
    }

    #[test]
    fn test_expected_errors_become_base() {
        let factory = factory(Some(AdapterErrorKind::Backend));
        let plan = users_by_status();
        let inv = Invocation::new().arg("active");
        let err = Executor::new(&plan, &factory, &inv).unwrap().run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Base);
        assert_eq!(err.to_string(), "adapter said no");
    }

    #[test]
    fn test_invalid_relation_becomes_invalid_ancestry() {
        let factory = factory(Some(AdapterErrorKind::InvalidRelation));
        let plan = users_by_status();
        let inv = Invocation::new().arg("active");
        let err = Executor::new(&plan, &factory, &inv).unwrap().run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAncestry);
    }

    #[test]
    fn test_unexpected_errors_propagate_unchanged() {
        let mut factory = factory(Some(AdapterErrorKind::Backend));
        factory.expected.clear();
        let plan = users_by_status();
        let inv = Invocation::new().arg("active");
        let err = Executor::new(&plan, &factory, &inv).unwrap().run().unwrap_err();
        match err {
            GetError::Adapter(inner) => {
                assert_eq!(inner, AdapterError::backend("adapter said no"));
            }
            other => panic!("expected adapter error, got {other:?}"),
        }
    }

    #[test]
    fn test_single_result_read_through_to_hash() {
        let factory = factory(None);
        let plan = QueryPlan {
            identifier: "UserById".to_string(),
            kind: PlanKind::FieldLookup {
                field: Some("id".to_string()),
                parameterless: false,
            },
            is_collection: false,
            ..users_by_status()
        };
        let inv = Invocation::new().arg(7);
        let raw = Executor::new(&plan, &factory, &inv).unwrap().run().unwrap();

        assert_eq!(
            raw,
            RawResult::Record(Record::new(json!({"id": 7}).as_object().unwrap().clone()))
        );
        assert_eq!(
            *factory.calls.lock().unwrap(),
            vec![r#"get {"id":7}"#.to_string(), "to_hash".to_string()]
        );
    }

    #[test]
    fn test_missing_capability() {
        let factory = factory(None);
        let mut plan = users_by_status();
        plan.is_collection = false;
        let inv = Invocation::new().arg("active");
        let err = Executor::new(&plan, &factory, &inv).unwrap().run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotImplemented);
        assert!(factory.calls.lock().unwrap().is_empty());
    }
}
