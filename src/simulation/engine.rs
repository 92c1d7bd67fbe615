// src/simulation/engine.rs

use crate::model::state::{PlanningTargets, SimulationState};
use crate::model::vehicles::{ShuttleEvent, SupplyTruck};
use crate::simulation::config::{SimulationParams, SIM_TIME_UNITS_PER_DAY};
use tracing::debug;

/// Production consumption rate (raw units per time unit), forecast bias included.
pub fn production_requirement(state: &SimulationState, params: &SimulationParams) -> f64 {
    state.planning.production_target_per_time_unit.max(0.0) * params.scenario.production_bias()
}

/// Market demand per time unit, forecast bias included.
pub fn market_demand_rate(params: &SimulationParams) -> f64 {
    params.market_demand.max(0.0) / SIM_TIME_UNITS_PER_DAY.max(1.0) * params.scenario.demand_bias()
}

/// Safety stock plus what production eats during one lead time.
pub fn reorder_point(state: &SimulationState, params: &SimulationParams) -> f64 {
    let lead_time_units = params.lead_time.max(0.0) * SIM_TIME_UNITS_PER_DAY;
    (params.safety_stock + production_requirement(state, params) * lead_time_units).max(0.0)
}

/// Advances the simulation by one time slice of `dt` days.
///
/// The phases run in a fixed order; each one sees the stock left behind by the
/// previous one. Nothing here fails: bad numbers are clamped, zero rates give
/// zero movement.
pub fn tick(mut state: SimulationState, params: &SimulationParams, dt: f64) -> SimulationState {
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

    // =================================================================
    // PHASE 0: Sync derived values
    // =================================================================
    sync_planning(&mut state, params);

    // =================================================================
    // PHASE 1: Flows (production, market, shuttle)
    // =================================================================
    apply_production(&mut state, params, dt);
    apply_market_demand(&mut state, params, dt);
    move_worker(&mut state, params, dt);

    // =================================================================
    // PHASE 2: Replenishment & transport
    // =================================================================
    handle_replenishment(&mut state, params, dt);
    move_truck(&mut state, dt);
    state.retail_van.advance(dt);

    // =================================================================
    // PHASE 3: Scenario & score
    // =================================================================
    apply_scenario_effects(&mut state, params);
    update_score(&mut state, params);

    state.tick += 1;
    state.elapsed_days += dt;
    state
}

/// Cleans the state and refreshes the planning targets.
pub fn sync_planning(state: &mut SimulationState, params: &SimulationParams) {
    state.sanitize();
    state.planning = PlanningTargets::compute(params, state.finished_goods_stock, state.backlog);
}

fn apply_production(state: &mut SimulationState, params: &SimulationParams, dt: f64) {
    if state.production_shutdown {
        return;
    }
    let per_step = production_requirement(state, params) * dt;
    if per_step <= 0.0 {
        return;
    }
    let actual = per_step.min(state.factory_stock.max(0.0));
    if actual <= 0.0 {
        return;
    }

    state.factory_stock = (state.factory_stock - actual).max(0.0);
    state.finished_goods_stock += actual;
    state.ledger.produced += actual;

    if state.backlog > 0.0 && state.finished_goods_stock > 0.0 {
        let fulfill = state.finished_goods_stock.min(state.backlog);
        state.finished_goods_stock -= fulfill;
        state.backlog -= fulfill;
        state.ledger.backlog_filled += fulfill;
    }
}

fn apply_market_demand(state: &mut SimulationState, params: &SimulationParams, dt: f64) {
    let per_step = market_demand_rate(params) * dt;
    if per_step <= 0.0 {
        return;
    }
    state.ledger.demanded += per_step;

    if state.finished_goods_stock >= per_step {
        state.finished_goods_stock -= per_step;
    } else {
        let shortfall = per_step - state.finished_goods_stock;
        state.finished_goods_stock = 0.0;
        state.backlog += shortfall;
    }
}

fn move_worker(state: &mut SimulationState, params: &SimulationParams, dt: f64) {
    let capacity = params.worker_capacity();
    let speed = state
        .worker
        .speed(production_requirement(state, params), capacity, dt);
    let event = state.worker.advance(
        speed,
        capacity,
        &mut state.warehouse_stock,
        &mut state.factory_stock,
    );
    match event {
        Some(ShuttleEvent::PickedUp(qty)) => {
            debug!(tick = state.tick, qty, "shuttle.picked_up");
        }
        Some(ShuttleEvent::Deposited(qty)) => {
            debug!(tick = state.tick, qty, "shuttle.deposited");
        }
        None => {}
    }
}

fn handle_replenishment(state: &mut SimulationState, params: &SimulationParams, dt: f64) {
    if !state.truck.is_idle() {
        return;
    }
    let raw_on_hand = state.raw_on_hand();
    let target_raw = state.planning.supply_plan.max(0.0);
    let reorder = reorder_point(state, params);
    if raw_on_hand > target_raw.max(reorder) {
        return;
    }

    let needed = (target_raw - raw_on_hand).max(0.0);
    let mut request = params.moq.max(needed);
    if request <= 0.0 {
        request = params.moq.max(target_raw);
    }

    state.truck = SupplyTruck::dispatch(request, params.lead_time, dt);
    state.ledger.trucks_dispatched += 1;
    debug!(
        tick = state.tick,
        raw_on_hand,
        reorder_point = reorder,
        quantity = request,
        "truck.dispatched"
    );
}

fn move_truck(state: &mut SimulationState, dt: f64) {
    if let Some(delivered) = state.truck.advance(dt) {
        state.warehouse_stock += delivered;
        state.ledger.delivered += delivered;
        state.ledger.trucks_arrived += 1;
        debug!(tick = state.tick, delivered, "truck.arrived");
    }
}

fn apply_scenario_effects(state: &mut SimulationState, params: &SimulationParams) {
    if !params.scenario.is_biased() {
        state.production_shutdown = false;
        return;
    }

    let was_shut = state.production_shutdown;
    if state.factory_stock < (params.safety_stock * 0.5).max(40.0) {
        state.production_shutdown = true;
    }
    if state.production_shutdown && state.factory_stock > params.safety_stock + 60.0 {
        state.production_shutdown = false;
    }
    if was_shut != state.production_shutdown {
        debug!(
            tick = state.tick,
            shutdown = state.production_shutdown,
            factory_stock = state.factory_stock,
            "production.shutdown_changed"
        );
    }
}

/// Per-tick score delta for the current stock picture.
pub fn score_delta(state: &SimulationState, params: &SimulationParams) -> i64 {
    let safety = params.safety_stock;
    let mut step = 0;
    if !state.production_shutdown {
        step += 1;
    }
    for stock in [state.factory_stock, state.warehouse_stock] {
        if stock <= safety {
            step -= 1;
        }
        if stock <= 0.0 {
            step -= 1;
        }
    }
    if state.warehouse_stock >= reorder_point(state, params) {
        step += 1;
    }
    step
}

fn update_score(state: &mut SimulationState, params: &SimulationParams) {
    state.score += score_delta(state, params);
}
