// src/simulation/metrics.rs

//! Read-only projection of the simulation state for display surfaces.

use crate::model::state::SimulationState;
use crate::simulation::config::SimulationParams;
use crate::simulation::engine::reorder_point;
use serde::Serialize;
use std::fmt;

pub const SUPPLIER_UNIT_COST: f64 = 1.0;
pub const WAREHOUSE_UNIT_COST: f64 = 1.1;
pub const FG_UNIT_PRICE: f64 = 1.6;
pub const MARKET_UNIT_PRICE: f64 = 1.9;

/// Warehouse level the display treats as overstock.
pub const WAREHOUSE_HIGH_STOCK: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Good,
    Warning,
    Alert,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Good => "good",
            Level::Warning => "warning",
            Level::Alert => "alert",
        };
        f.write_str(label)
    }
}

pub fn score_level(score: i64) -> Level {
    if score >= 0 {
        Level::Good
    } else if score >= -500 {
        Level::Warning
    } else {
        Level::Alert
    }
}

pub fn inventory_level(stock: f64, safety: Option<f64>, high: Option<f64>) -> Level {
    if stock <= 0.0 {
        return Level::Alert;
    }
    if let Some(safety) = safety {
        if stock <= (safety * 0.25).max(5.0) {
            return Level::Alert;
        }
        if stock <= safety {
            return Level::Warning;
        }
    }
    if matches!(high, Some(high) if stock >= high) {
        return Level::Warning;
    }
    Level::Good
}

/// Any backlog is at least a warning; three days of demand is an alert.
pub fn backlog_level(backlog: f64, market_demand: f64) -> Level {
    if backlog <= 0.0 {
        return Level::Good;
    }
    let alert_threshold = (market_demand.max(0.0) * 3.0).max(80.0);
    if backlog >= alert_threshold {
        Level::Alert
    } else {
        Level::Warning
    }
}

pub fn cash_flow_level(net: f64) -> Level {
    if net >= 0.0 {
        Level::Good
    } else if net >= -200.0 {
        Level::Warning
    } else {
        Level::Alert
    }
}

pub fn payable_level(payable: f64, receivable: f64) -> Level {
    if payable <= receivable * 0.75 {
        Level::Good
    } else if payable <= receivable {
        Level::Warning
    } else {
        Level::Alert
    }
}

pub fn receivable_level(receivable: f64) -> Level {
    if receivable <= 0.0 {
        Level::Warning
    } else {
        Level::Good
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSnapshot {
    pub accounts_payable: f64,
    pub accounts_receivable: f64,
    pub net_cash_flow: f64,
}

impl FinancialSnapshot {
    pub fn compute(state: &SimulationState, params: &SimulationParams) -> Self {
        let supplier_value = state.truck.delivery().max(0.0) * SUPPLIER_UNIT_COST;
        let warehouse_value = state.warehouse_stock.max(0.0) * WAREHOUSE_UNIT_COST;
        let finished_goods_value = state.finished_goods_stock.max(0.0) * FG_UNIT_PRICE;
        let demand_value = params.market_demand.max(0.0) * MARKET_UNIT_PRICE;

        let accounts_payable = supplier_value + warehouse_value;
        let accounts_receivable = finished_goods_value + demand_value;
        Self {
            accounts_payable,
            accounts_receivable,
            net_cash_flow: accounts_receivable - accounts_payable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alert {
    FactoryBelowSafety,
    WarehouseLow,
    WarehouseHigh,
    ProductionShutdown,
    BiasedForecastDrop,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Alert::FactoryBelowSafety => "Factory below safety!",
            Alert::WarehouseLow => "Warehouse critically low!",
            Alert::WarehouseHigh => "Warehouse too high!",
            Alert::ProductionShutdown => "Production shutdown!",
            Alert::BiasedForecastDrop => "Biased forecast — factory dropping!",
        };
        f.write_str(text)
    }
}

pub fn generate_alerts(state: &SimulationState, params: &SimulationParams) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if state.factory_stock < params.safety_stock {
        alerts.push(Alert::FactoryBelowSafety);
    }
    if state.warehouse_stock < params.safety_stock {
        alerts.push(Alert::WarehouseLow);
    }
    if state.warehouse_stock > WAREHOUSE_HIGH_STOCK {
        alerts.push(Alert::WarehouseHigh);
    }
    if state.production_shutdown {
        alerts.push(Alert::ProductionShutdown);
    }
    if params.scenario.is_biased()
        && !state.production_shutdown
        && state.factory_stock < params.safety_stock
    {
        alerts.push(Alert::BiasedForecastDrop);
    }
    alerts
}

/// A value together with how worried the display should be about it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gauge<T> {
    pub value: T,
    pub level: Level,
}

/// Everything a renderer shows for one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMetrics {
    pub tick: u64,
    pub elapsed_days: f64,
    pub score: Gauge<i64>,
    pub factory_stock: Gauge<f64>,
    pub warehouse_stock: Gauge<f64>,
    pub finished_goods_stock: Gauge<f64>,
    pub backlog: Gauge<f64>,
    pub reorder_point: f64,
    pub production_plan: f64,
    pub supply_plan: f64,
    pub worker_progress: f64,
    pub truck_phase: &'static str,
    pub truck_progress: f64,
    pub truck_eta: f64,
    pub accounts_payable: Gauge<f64>,
    pub accounts_receivable: Gauge<f64>,
    pub net_cash_flow: Gauge<f64>,
    pub production_shutdown: bool,
    pub alerts: Vec<Alert>,
}

impl DisplayMetrics {
    pub fn project(state: &SimulationState, params: &SimulationParams) -> Self {
        let safety = params.safety_stock;
        let financials = FinancialSnapshot::compute(state, params);
        let reorder = reorder_point(state, params);

        Self {
            tick: state.tick,
            elapsed_days: state.elapsed_days,
            score: Gauge {
                value: state.score,
                level: score_level(state.score),
            },
            factory_stock: Gauge {
                value: state.factory_stock,
                level: inventory_level(state.factory_stock, Some(safety), None),
            },
            warehouse_stock: Gauge {
                value: state.warehouse_stock,
                level: inventory_level(
                    state.warehouse_stock,
                    Some(safety),
                    Some(WAREHOUSE_HIGH_STOCK),
                ),
            },
            finished_goods_stock: Gauge {
                value: state.finished_goods_stock,
                level: inventory_level(
                    state.finished_goods_stock,
                    Some(params.fg_safety_stock),
                    Some(params.fg_high_stock_threshold()),
                ),
            },
            backlog: Gauge {
                value: state.backlog,
                level: backlog_level(state.backlog, params.market_demand),
            },
            reorder_point: reorder,
            production_plan: state.planning.production_plan,
            supply_plan: state.planning.supply_plan,
            worker_progress: state.worker.progress,
            truck_phase: state.truck.phase_name(),
            truck_progress: state.truck.progress(),
            truck_eta: state.truck.time_remaining(),
            accounts_payable: Gauge {
                value: financials.accounts_payable,
                level: payable_level(financials.accounts_payable, financials.accounts_receivable),
            },
            accounts_receivable: Gauge {
                value: financials.accounts_receivable,
                level: receivable_level(financials.accounts_receivable),
            },
            net_cash_flow: Gauge {
                value: financials.net_cash_flow,
                level: cash_flow_level(financials.net_cash_flow),
            },
            production_shutdown: state.production_shutdown,
            alerts: generate_alerts(state, params),
        }
    }

    /// Alert lines joined the way the status badge shows them.
    pub fn alert_text(&self) -> String {
        self.alerts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
