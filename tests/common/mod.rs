#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use supply_chain_sim::{Scenario, SimulationParams, SimulationState, SpeedUnit};

pub const EPS: f64 = 1e-6;

/// Fixed corner cases plus a handful of seeded random parameter sets.
pub fn param_grid() -> Vec<SimulationParams> {
    let mut grid = vec![
        SimulationParams::default(),
        SimulationParams {
            scenario: Scenario::Biased,
            ..SimulationParams::default()
        },
        SimulationParams {
            market_demand: 0.0,
            ..SimulationParams::default()
        },
        SimulationParams {
            lead_time: 0.0,
            moq: 0.0,
            factory_batch: 0.0,
            ..SimulationParams::default()
        },
        SimulationParams {
            market_demand: 360.0,
            safety_stock: 60.0,
            fg_safety_stock: 400.0,
            scenario: Scenario::Biased,
            ..SimulationParams::default()
        },
    ];

    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..6 {
        grid.push(SimulationParams {
            lead_time: rng.gen_range(1.0..=14.0),
            moq: rng.gen_range(40.0..=400.0),
            production_rate: rng.gen_range(20.0..=360.0),
            market_demand: rng.gen_range(20.0..=360.0),
            safety_stock: rng.gen_range(60.0..=360.0),
            fg_safety_stock: rng.gen_range(40.0..=400.0),
            initial_fg_stock: rng.gen_range(40.0..=500.0),
            factory_batch: rng.gen_range(20.0..=120.0),
            scenario: if rng.gen_bool(0.5) {
                Scenario::Biased
            } else {
                Scenario::Accurate
            },
            speed_unit: SpeedUnit::Minute,
        });
    }

    grid
}

/// Simulated days per tick at each speed with the default 120 ms interval.
pub fn dt_for(speed: SpeedUnit) -> f64 {
    0.12 / 60.0 * speed.factor()
}

pub fn assert_in_range(state: &SimulationState) {
    for (name, value) in [
        ("factory_stock", state.factory_stock),
        ("warehouse_stock", state.warehouse_stock),
        ("finished_goods_stock", state.finished_goods_stock),
        ("backlog", state.backlog),
        ("worker.load", state.worker.load),
        ("truck.delivery", state.truck.delivery()),
        ("truck.time_remaining", state.truck.time_remaining()),
        ("retail_van.dwell", state.retail_van.dwell),
    ] {
        assert!(
            value.is_finite() && value >= 0.0,
            "{name} out of range at tick {}: {value}",
            state.tick
        );
    }
    for (name, value) in [
        ("worker.progress", state.worker.progress),
        ("truck.progress", state.truck.progress()),
        ("retail_van.progress", state.retail_van.progress),
    ] {
        assert!(
            (0.0..=1.0).contains(&value),
            "{name} outside [0,1] at tick {}: {value}",
            state.tick
        );
    }
}
