//! Web layer for the timetable engine.
//!
//! A thin JSON adapter over conflict detection, schedule repair and
//! scenario evaluation.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
