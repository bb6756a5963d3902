//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::constraints::{ConstraintError, ConstraintRegistry};
use crate::detect::{Conflict, detect_conflicts};
use crate::repair::{RepairError, Repairer};
use crate::scenario::compare_to_baseline;
use crate::timetable::{Timetable, TimetableError};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/topology", get(topology))
        .route("/conflicts/detect", post(detect))
        .route("/schedule/repair", post(repair))
        .route("/scenarios/evaluate", post(evaluate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Summary of the loaded network.
async fn topology(State(state): State<AppState>) -> Json<TopologyResponse> {
    Json(TopologyResponse::from_graph(&state.topology))
}

/// Validate a request into a timetable and constraint registry.
fn prepare(
    state: &AppState,
    req: TimetableRequest,
) -> Result<(Timetable, ConstraintRegistry), AppError> {
    let policy = req.dwell_policy.unwrap_or(state.dwell);
    let timetable = Timetable::build(&state.topology, req.trains, req.events, &policy)?;
    let registry = ConstraintRegistry::new(&state.topology, req.constraints)?;
    Ok((timetable, registry))
}

/// Detect conflicts in a timetable.
async fn detect(
    State(state): State<AppState>,
    Json(req): Json<TimetableRequest>,
) -> Result<Json<DetectResponse>, AppError> {
    let response = blocking(move || {
        let (timetable, registry) = prepare(&state, req)?;
        let topology = &state.topology;

        let conflicts = detect_conflicts(topology, &registry, &timetable);
        let warnings = timetable
            .occupancy_intervals(topology)
            .rejected
            .iter()
            .map(ToString::to_string)
            .collect();

        Ok(DetectResponse {
            conflicts,
            warnings,
        })
    })
    .await?;

    Ok(Json(response))
}

/// Repair a timetable; 422 with the residual conflicts when impossible.
async fn repair(
    State(state): State<AppState>,
    Json(req): Json<RepairRequest>,
) -> Result<Json<RepairResponse>, AppError> {
    let response = blocking(move || {
        let mut config = (*state.repair).clone();
        if let Some(max_iterations) = req.max_iterations {
            config.max_iterations = max_iterations;
        }
        let (timetable, registry) = prepare(&state, req.timetable)?;
        let topology = &state.topology;

        let outcome = Repairer::new(topology, &registry, config).repair(&timetable)?;
        Ok(RepairResponse::from_outcome(&outcome, topology))
    })
    .await?;

    Ok(Json(response))
}

/// Evaluate a baseline scenario and its variants.
async fn evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Json<EvaluateResponse> {
    let results = state
        .scenario_evaluator()
        .evaluate_all(req.baseline, req.variants)
        .await;
    let deltas = compare_to_baseline(&results);

    Json(EvaluateResponse { results, deltas })
}

/// Run CPU-bound work off the async executor.
async fn blocking<F, T>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal {
            message: format!("worker failed: {e}"),
        })?
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest {
        message: String,
    },
    Unprocessable {
        message: String,
        iterations: usize,
        residual: Vec<Conflict>,
    },
    Internal {
        message: String,
    },
}

impl From<TimetableError> for AppError {
    fn from(e: TimetableError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<ConstraintError> for AppError {
    fn from(e: ConstraintError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<RepairError> for AppError {
    fn from(e: RepairError) -> Self {
        let message = e.to_string();
        match e {
            RepairError::OptimizationInfeasible {
                residual,
                iterations,
            } => AppError::Unprocessable {
                message,
                iterations,
                residual,
            },
            RepairError::Cancelled => AppError::Internal { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest { message } => {
                warn!(status = %StatusCode::BAD_REQUEST, %message, "Rejected request");
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
            }
            AppError::Unprocessable {
                message,
                iterations,
                residual,
            } => {
                warn!(residual = residual.len(), %message, "Repair infeasible");
                let body = InfeasibleResponse {
                    error: message,
                    iterations,
                    residual,
                };
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            AppError::Internal { message } => {
                error!(%message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { error: message }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::fixtures::{self, arrival, train};
    use crate::scenario::{Scenario, ScenarioOutcome};

    fn state() -> AppState {
        AppState::new(fixtures::topology(), &EngineConfig::default())
    }

    fn seed_request() -> TimetableRequest {
        TimetableRequest {
            trains: fixtures::seed_trains(),
            events: fixtures::seed_records(),
            constraints: fixtures::seed_constraints(),
            dwell_policy: None,
        }
    }

    fn overlap_request() -> TimetableRequest {
        TimetableRequest {
            trains: vec![train("A", 1, 200.0), train("B", 2, 200.0)],
            events: vec![
                arrival("A", "E1", "S2", "S2P1", "08:20", 300, 60, 300),
                arrival("B", "E1", "S2", "S2P1", "08:22", 300, 60, 300),
            ],
            constraints: Vec::new(),
            dwell_policy: None,
        }
    }

    #[tokio::test]
    async fn health_is_ok() {
        assert_eq!(health().await, "ok");
    }

    #[tokio::test]
    async fn topology_lists_network() {
        let Json(summary) = topology(State(state())).await;
        assert_eq!(summary.stations.len(), 3);
        assert_eq!(summary.segments.len(), 2);
    }

    #[tokio::test]
    async fn detect_reports_seed_conflicts() {
        let Json(response) = detect(State(state()), Json(seed_request()))
            .await
            .unwrap();
        assert_eq!(response.conflicts.len(), 3);
        assert_eq!(response.warnings.len(), 2);
    }

    #[tokio::test]
    async fn detect_rejects_unknown_platform() {
        let mut req = overlap_request();
        req.events[0].platform_id = crate::domain::PlatformId::parse("S2P9").unwrap();

        let err = detect(State(state()), Json(req)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn repair_returns_moves() {
        let req = RepairRequest {
            timetable: overlap_request(),
            max_iterations: None,
        };
        let Json(response) = repair(State(state()), Json(req)).await.unwrap();
        assert_eq!(response.moves.len(), 1);
        assert_eq!(response.version, 1);
        assert_eq!(response.events.len(), 2);
    }

    #[tokio::test]
    async fn infeasible_repair_is_unprocessable() {
        let req = RepairRequest {
            timetable: seed_request(),
            max_iterations: None,
        };
        let err = repair(State(state()), Json(req)).await.unwrap_err();
        match &err {
            AppError::Unprocessable { residual, .. } => assert!(!residual.is_empty()),
            other => panic!("expected Unprocessable, got {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn evaluate_returns_results_and_deltas() {
        let TimetableRequest {
            trains,
            events,
            constraints,
            ..
        } = overlap_request();
        let baseline = Scenario::new("baseline", trains, events, constraints);
        let req = EvaluateRequest {
            variants: vec![baseline.variant("copy")],
            baseline,
        };

        let Json(response) = evaluate(State(state()), Json(req)).await;
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].outcome, ScenarioOutcome::Repaired);
        assert_eq!(response.deltas.len(), 1);
        assert_eq!(response.deltas[0].name, "copy");
    }

    #[test]
    fn cancelled_repair_is_internal() {
        let err = AppError::from(RepairError::Cancelled);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
