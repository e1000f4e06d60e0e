//! Per-unit schema pipeline
//!
//! A unit is one chart: its values text, its name and optionally the schema
//! its authors already publish. Each run holds the unit's exclusive lock
//! from inference to emission, so two runs for the same unit never
//! interleave while different units proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chartschema_core::{Chain, fix, infer, validate, validate_and_fix_with};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::coordinator::KeyedLocks;
use crate::error::{PipelineError, Result, Stage};

/// Input for one configuration unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInput {
    pub name: String,
    /// Raw `values.yaml` text
    pub values: String,
    /// Schema published alongside the values, merged over the inferred one
    pub upstream_schema: Option<Vec<u8>>,
}

impl UnitInput {
    pub fn new(name: impl Into<String>, values: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
            upstream_schema: None,
        }
    }

    pub fn with_upstream(mut self, schema: impl Into<Vec<u8>>) -> Self {
        self.upstream_schema = Some(schema.into());
        self
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutput {
    pub name: String,
    /// Validated draft-07 document
    pub schema_json: String,
    /// Generated target-language source
    pub source: String,
}

pub struct Pipeline {
    config: PipelineConfig,
    rules: Chain,
    locks: Arc<KeyedLocks>,
    outputs: Mutex<HashMap<String, UnitOutput>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_locks(config, Arc::new(KeyedLocks::new()))
    }

    /// Create a pipeline sharing a lock table with other holders
    pub fn with_locks(config: PipelineConfig, locks: Arc<KeyedLocks>) -> Self {
        let rules = config.rules();
        Self {
            config,
            rules,
            locks,
            outputs: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn locks(&self) -> &Arc<KeyedLocks> {
        &self.locks
    }

    /// Run every stage for one unit under its exclusive lock
    pub async fn run(&self, unit: UnitInput) -> Result<UnitOutput> {
        let _guard = self.locks.lock(&unit.name).await;
        let name = unit.name.as_str();
        debug!(unit = name, "acquired unit lock");

        let mut schema = infer(&unit.values, &self.config.infer_options())
            .map_err(|e| PipelineError::stage(name, Stage::Infer, e))?;

        fix(&mut schema, &self.rules).map_err(|e| PipelineError::stage(name, Stage::Fix, e))?;

        if let Some(upstream) = &unit.upstream_schema {
            let upstream = validate_and_fix_with(upstream, &self.rules)
                .map_err(|e| PipelineError::stage(name, Stage::Upstream, e))?;
            schema.merge_from(upstream, self.config.set_defaults);
            debug!(unit = name, "merged upstream schema");
        }

        let schema_json = schema
            .to_json_pretty()
            .map_err(|e| PipelineError::stage(name, Stage::Validate, e))?;
        validate(&schema_json).map_err(|e| PipelineError::stage(name, Stage::Validate, e))?;

        let source = {
            let text = schema_json.clone();
            let target = unit.name.clone();
            tokio::task::spawn_blocking(move || chartschema_gen::emit(&text, &target))
                .await
                .map_err(|e| PipelineError::Task {
                    unit: unit.name.clone(),
                    message: e.to_string(),
                })?
                .map_err(|e| PipelineError::stage(name, Stage::Emit, e))?
        };

        let output = UnitOutput {
            name: unit.name.clone(),
            schema_json,
            source,
        };
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(output.name.clone(), output.clone());

        info!(unit = name, "schema generated");
        Ok(output)
    }

    /// Run all units concurrently, one result per unit in input order
    ///
    /// Each unit runs as its own task, so independent units use every
    /// worker thread of the runtime.
    pub async fn run_all(self: &Arc<Self>, units: Vec<UnitInput>) -> Vec<Result<UnitOutput>> {
        let names: Vec<String> = units.iter().map(|unit| unit.name.clone()).collect();

        let mut tasks = JoinSet::new();
        for (index, unit) in units.into_iter().enumerate() {
            let pipeline = Arc::clone(self);
            tasks.spawn(async move { (index, pipeline.run(unit).await) });
        }

        let mut results: Vec<Option<Result<UnitOutput>>> =
            std::iter::repeat_with(|| None).take(names.len()).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => warn!(error = %e, "pipeline task failed"),
            }
        }

        results
            .into_iter()
            .zip(names)
            .map(|(result, unit)| {
                result.unwrap_or_else(|| {
                    Err(PipelineError::Task {
                        unit,
                        message: "task panicked or was cancelled".to_string(),
                    })
                })
            })
            .collect()
    }

    /// Last successful output for `name`, read under the shared lock
    pub async fn inspect(&self, name: &str) -> Option<UnitOutput> {
        let _guard = self.locks.read(name).await;
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
