use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use timetable_engine::config::EngineConfig;
use timetable_engine::topology::TopologyGraph;
use timetable_engine::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };

    let topology = match TopologyGraph::load(&config.network_path) {
        Ok(topology) => topology,
        Err(e) => {
            error!(path = %config.network_path.display(), error = %e, "Failed to load network");
            std::process::exit(1);
        }
    };
    info!(
        stations = topology.station_count(),
        segments = topology.segment_count(),
        "Loaded network"
    );

    let addr = config.addr;
    let app = create_router(AppState::new(topology, &config));

    info!("Timetable engine listening on http://{addr}");
    info!("  GET  /health              - Health check");
    info!("  GET  /topology            - Network summary");
    info!("  POST /conflicts/detect    - Detect conflicts");
    info!("  POST /schedule/repair     - Repair a timetable");
    info!("  POST /scenarios/evaluate  - Compare scenarios");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
