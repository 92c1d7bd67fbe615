// src/model/state.rs

use crate::model::vehicles::{RetailVan, SupplyTruck, WorkerShuttle};
use crate::simulation::config::{SimulationParams, SIM_TIME_UNITS_PER_DAY};
use serde::{Deserialize, Serialize};

pub const INITIAL_FACTORY_STOCK: f64 = 240.0;
pub const INITIAL_WAREHOUSE_STOCK: f64 = 520.0;

/// Derived daily targets, recomputed from stock and demand every tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanningTargets {
    /// Finished goods to produce per day: demand plus any FG deficit and backlog.
    pub production_plan: f64,
    /// Raw material to hold: the production plan on top of raw safety stock.
    pub supply_plan: f64,
    pub production_target_per_time_unit: f64,
}

impl PlanningTargets {
    pub fn compute(params: &SimulationParams, finished_goods: f64, backlog: f64) -> Self {
        let demand = params.market_demand.max(0.0);
        let deficit = (params.fg_safety_stock.max(0.0) - finished_goods.max(0.0)).max(0.0);
        let production_plan = (demand + deficit + backlog.max(0.0)).max(0.0);
        let supply_plan = production_plan + params.safety_stock.max(0.0);
        Self {
            production_plan,
            supply_plan,
            production_target_per_time_unit: production_plan / SIM_TIME_UNITS_PER_DAY.max(1.0),
        }
    }
}

/// Cumulative unit flows since the session started.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowLedger {
    /// Raw units unloaded into the warehouse by the truck.
    pub delivered: f64,
    /// Raw units converted into finished goods.
    pub produced: f64,
    /// Market demand that arrived, met or not.
    pub demanded: f64,
    /// Backlog cleared out of fresh production.
    pub backlog_filled: f64,
    pub trucks_dispatched: u64,
    pub trucks_arrived: u64,
}

/// Everything a tick reads and writes. Owned by the session between ticks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationState {
    pub factory_stock: f64,
    pub warehouse_stock: f64,
    pub finished_goods_stock: f64,
    pub backlog: f64,

    pub worker: WorkerShuttle,
    pub truck: SupplyTruck,
    pub retail_van: RetailVan,

    pub production_shutdown: bool,
    pub score: i64,
    pub planning: PlanningTargets,

    pub tick: u64,
    pub elapsed_days: f64,
    pub ledger: FlowLedger,
}

impl SimulationState {
    /// A fresh session state for the given parameters.
    pub fn initial(params: &SimulationParams) -> Self {
        let finished_goods_stock = params.initial_fg_stock.max(0.0);
        Self {
            factory_stock: INITIAL_FACTORY_STOCK,
            warehouse_stock: INITIAL_WAREHOUSE_STOCK,
            finished_goods_stock,
            planning: PlanningTargets::compute(params, finished_goods_stock, 0.0),
            ..Self::default()
        }
    }

    /// Raw material sitting in the factory and warehouse.
    pub fn raw_on_hand(&self) -> f64 {
        self.factory_stock + self.warehouse_stock
    }

    /// Raw material anywhere downstream of the supplier, shuttle included.
    pub fn raw_in_system(&self) -> f64 {
        self.raw_on_hand() + self.worker.load
    }

    /// Replaces non-finite numbers with zero and clamps every quantity back
    /// into range.
    pub fn sanitize(&mut self) {
        for value in [
            &mut self.factory_stock,
            &mut self.warehouse_stock,
            &mut self.finished_goods_stock,
            &mut self.backlog,
            &mut self.elapsed_days,
        ] {
            *value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        }
        self.worker.sanitize();
        self.truck.sanitize();
        self.retail_van.sanitize();
    }
}
