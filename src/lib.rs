//! Factory, warehouse and retail supply chain simulation.
//!
//! A fixed-interval tick engine moves raw stock from a supplier truck into a
//! warehouse, shuttles it to the factory, turns it into finished goods and
//! sells those to the market. The session layer owns the state between ticks
//! and persists it as a versioned snapshot; metrics project it for display.

pub mod io;
pub mod model;
pub mod simulation;

pub use crate::model::state::SimulationState;
pub use crate::simulation::config::{Scenario, SimulationConfig, SimulationParams, SpeedUnit};
pub use crate::simulation::engine::tick;
pub use crate::simulation::metrics::DisplayMetrics;
pub use crate::simulation::session::{Session, Ticker};
