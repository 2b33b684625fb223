//! Query engine for get.
//!
//! The [`Engine`] owns the configuration, the compiled-plan registry and the
//! entity factory. Identifiers are compiled at most once; every later
//! reference observes the same [`QueryPlan`].

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::builders;
use crate::config::Config;
use crate::entity::{EntityFactory, Output};
use crate::error::{GetError, GetResult};
use crate::executor::Executor;
use crate::parser;
use crate::plan::{Action, Invocation, Options, QueryPlan};

/// Compiles identifiers and runs them against the configured adapter.
#[derive(Debug, Default)]
pub struct Engine {
    config: RwLock<Config>,
    plans: DashMap<String, Arc<QueryPlan>>,
    factory: EntityFactory,
    compilations: AtomicU64,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            ..Self::default()
        }
    }

    /// Mutate the configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use get::prelude::*;
    /// use std::sync::Arc;
    ///
    /// let engine = Engine::new();
    /// engine.configure(|config| {
    ///     config.register_adapter("memory", Arc::new(MemoryAdapterFactory::new(MemoryStore::new())));
    ///     config.use_adapter("memory");
    /// });
    /// ```
    pub fn configure<F: FnOnce(&mut Config)>(&self, f: F) {
        let mut config = self.config.write();
        f(&mut config);
        info!(adapter = ?config.adapter_name(), "configuration updated");
    }

    /// Drop configuration, compiled plans and synthesized entity types.
    pub fn reset(&self) {
        *self.config.write() = Config::default();
        self.plans.clear();
        self.factory.clear();
        info!("engine reset");
    }

    /// Compile an identifier, or return the plan compiled for it earlier.
    ///
    /// `Ok(None)` means the identifier is not a query identifier.
    pub fn compile(&self, identifier: &str) -> GetResult<Option<Arc<QueryPlan>>> {
        let identifier = identifier.trim();
        if let Some(plan) = self.plans.get(identifier) {
            return Ok(Some(plan.value().clone()));
        }

        let Some(parsed) = parser::parse(identifier)? else {
            return Ok(None);
        };

        let plan = self
            .plans
            .entry(identifier.to_string())
            .or_try_insert_with(|| {
                let adapter = self.config.read().adapter()?;
                let plan = builders::build(&parsed, adapter.as_ref())?;
                self.compilations.fetch_add(1, Ordering::Relaxed);
                debug!(
                    identifier = %plan.identifier,
                    verb = %plan.verb,
                    collection = plan.is_collection,
                    store = %plan.store,
                    "compiled query"
                );
                Ok::<_, GetError>(Arc::new(plan))
            })?
            .value()
            .clone();
        Ok(Some(plan))
    }

    /// Start a query for an identifier.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let user = engine
    ///     .query("UserByEmail")?
    ///     .expect("query identifier")
    ///     .arg("a@example.com")
    ///     .run_strict()?;
    /// ```
    pub fn query(&self, identifier: &str) -> GetResult<Option<Query<'_>>> {
        Ok(self
            .compile(identifier)?
            .map(|plan| Query::new(self, plan)))
    }

    /// Run a compiled plan, raising every error.
    pub fn execute(&self, plan: &QueryPlan, invocation: &Invocation) -> GetResult<Output> {
        let (adapter, entity_type) = {
            let config = self.config.read();
            (config.adapter()?, self.factory.resolve(plan, &config))
        };

        let raw = Executor::new(plan, adapter.as_ref(), invocation)?.run()?;
        self.factory.build(raw, plan, entity_type)
    }

    /// How many identifiers have been compiled since creation.
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Number of plans currently registered.
    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn entity_factory(&self) -> &EntityFactory {
        &self.factory
    }
}

/// A compiled query with its runtime arguments.
pub struct Query<'e> {
    engine: &'e Engine,
    plan: Arc<QueryPlan>,
    invocation: Invocation,
}

impl<'e> Query<'e> {
    fn new(engine: &'e Engine, plan: Arc<QueryPlan>) -> Self {
        Self {
            engine,
            plan,
            invocation: Invocation::new(),
        }
    }

    pub fn plan(&self) -> &Arc<QueryPlan> {
        &self.plan
    }

    /// Bind the next positional argument.
    pub fn arg<T: Into<Value>>(mut self, value: T) -> Self {
        self.invocation = self.invocation.arg(value);
        self
    }

    /// Set one trailing option (`via`, `limit`, `conditions`, ...).
    pub fn option<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
        self.invocation = self.invocation.option(key, value);
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.invocation = self.invocation.options(options);
        self
    }

    /// Actions this call would run, without touching the store.
    pub fn actions(&self) -> GetResult<Vec<Action>> {
        self.plan.actions(&self.invocation)
    }

    /// Run, returning `None` when the query fails with `Base` or `RecordNotFound`.
    pub fn run(&self) -> GetResult<Option<Output>> {
        match self.run_strict() {
            Ok(output) => Ok(Some(output)),
            Err(err) if err.is_swallowed() => {
                warn!(identifier = %self.plan.identifier, error = %err, "query returned nothing");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Run, raising every error.
    pub fn run_strict(&self) -> GetResult<Output> {
        self.engine.execute(&self.plan, &self.invocation)
    }
}
