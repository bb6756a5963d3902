//! Application state for the web layer.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::repair::RepairConfig;
use crate::scenario::{EvaluatorConfig, ScenarioEvaluator};
use crate::timetable::DwellPolicy;
use crate::topology::TopologyGraph;

/// Shared application state.
///
/// The topology is loaded once at startup and shared read-only by every
/// request.
#[derive(Clone)]
pub struct AppState {
    /// The validated network graph
    pub topology: Arc<TopologyGraph>,

    /// Repair bounds used when a request does not override them
    pub repair: Arc<RepairConfig>,

    /// Worker pool settings for scenario evaluation
    pub evaluator: Arc<EvaluatorConfig>,

    /// Handling of event records without a dwell
    pub dwell: DwellPolicy,
}

impl AppState {
    /// Create a new app state.
    pub fn new(topology: TopologyGraph, config: &EngineConfig) -> Self {
        Self {
            topology: Arc::new(topology),
            repair: Arc::new(config.repair.clone()),
            evaluator: Arc::new(config.evaluator.clone()),
            dwell: config.dwell,
        }
    }

    /// An evaluator over this state's topology.
    pub fn scenario_evaluator(&self) -> ScenarioEvaluator {
        ScenarioEvaluator::new(
            Arc::clone(&self.topology),
            (*self.repair).clone(),
            self.dwell,
            (*self.evaluator).clone(),
        )
    }
}
