// src/model/vehicles.rs

use serde::{Deserialize, Serialize};

/// Distance from an end of the route that counts as "arrived".
const ARRIVAL_EPSILON: f64 = 1e-3;

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

// =========================================================================
// Worker shuttle (factory <-> warehouse)
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuttleDirection {
    #[default]
    TowardWarehouse,
    ReturningToFactory,
}

/// What happened when the shuttle reached an end of its route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShuttleEvent {
    PickedUp(f64),
    Deposited(f64),
}

/// The single carrier moving raw stock from the warehouse into the factory.
/// Progress 0.0 is the factory dock, 1.0 the warehouse dock.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkerShuttle {
    pub progress: f64,
    pub direction: ShuttleDirection,
    pub load: f64,
}

impl WorkerShuttle {
    /// Fraction of a one-way trip covered per tick.
    ///
    /// The shuttle paces itself so that one round trip moves `capacity` units
    /// in the time production needs to consume them. With no production it
    /// still finishes the leg it is on.
    pub fn speed(&self, production_rate: f64, capacity: f64, dt: f64) -> f64 {
        if capacity <= 0.0 || dt <= 0.0 {
            return 0.0;
        }

        let half_trip = if production_rate > 0.0 {
            let cycle = capacity / production_rate;
            Some((cycle / 2.0).max(dt))
        } else {
            let mid_leg = match self.direction {
                ShuttleDirection::TowardWarehouse => self.progress < 1.0,
                ShuttleDirection::ReturningToFactory => self.progress > 0.0,
            };
            mid_leg.then_some(0.5)
        };

        match half_trip {
            Some(units) if units.is_finite() && units > 0.0 => (dt / units).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Moves the shuttle by `speed` and handles pickup/drop-off at either end.
    pub fn advance(
        &mut self,
        speed: f64,
        capacity: f64,
        warehouse_stock: &mut f64,
        factory_stock: &mut f64,
    ) -> Option<ShuttleEvent> {
        match self.direction {
            ShuttleDirection::TowardWarehouse => {
                if self.progress < 1.0 {
                    self.progress = (self.progress + speed).min(1.0);
                }
                if (self.progress - 1.0).abs() >= ARRIVAL_EPSILON {
                    return None;
                }
                self.progress = 1.0;
                self.direction = ShuttleDirection::ReturningToFactory;
                let take = capacity.max(0.0).min(warehouse_stock.max(0.0));
                *warehouse_stock = (*warehouse_stock - take).max(0.0);
                self.load += take;
                Some(ShuttleEvent::PickedUp(take))
            }
            ShuttleDirection::ReturningToFactory => {
                if self.progress > 0.0 {
                    self.progress = (self.progress - speed).max(0.0);
                }
                if self.progress.abs() >= ARRIVAL_EPSILON {
                    return None;
                }
                self.progress = 0.0;
                self.direction = ShuttleDirection::TowardWarehouse;
                let dropped = self.load;
                *factory_stock += dropped;
                self.load = 0.0;
                Some(ShuttleEvent::Deposited(dropped))
            }
        }
    }

    pub fn sanitize(&mut self) {
        self.progress = finite_or_zero(self.progress).clamp(0.0, 1.0);
        self.load = finite_or_zero(self.load).max(0.0);
    }
}

// =========================================================================
// Supply truck (supplier -> warehouse)
// =========================================================================

/// Share of the lead time the truck spends loading at the supplier.
pub const TRUCK_LOADING_PORTION: f64 = 0.25;

/// The replenishment truck. Only one exists, so an order in flight is simply
/// a non-idle truck.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SupplyTruck {
    #[default]
    Idle,
    Loading {
        delivery: f64,
        wait_remaining: f64,
        travel_total: f64,
    },
    Traveling {
        delivery: f64,
        progress: f64,
        travel_total: f64,
        travel_remaining: f64,
    },
}

impl SupplyTruck {
    /// Builds a truck for an order of `delivery` units with the given lead time.
    pub fn dispatch(delivery: f64, lead_time: f64, dt: f64) -> Self {
        let lead = lead_time.max(0.1);
        let loading = lead * TRUCK_LOADING_PORTION;
        let travel = (lead - loading).max(dt);
        if loading > 0.0 {
            SupplyTruck::Loading {
                delivery,
                wait_remaining: loading,
                travel_total: travel,
            }
        } else {
            SupplyTruck::Traveling {
                delivery,
                progress: 0.0,
                travel_total: travel,
                travel_remaining: travel,
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SupplyTruck::Idle)
    }

    pub fn phase_name(&self) -> &'static str {
        match self {
            SupplyTruck::Idle => "idle",
            SupplyTruck::Loading { .. } => "loading",
            SupplyTruck::Traveling { .. } => "traveling",
        }
    }

    /// Quantity on order, zero when idle.
    pub fn delivery(&self) -> f64 {
        match *self {
            SupplyTruck::Idle => 0.0,
            SupplyTruck::Loading { delivery, .. } | SupplyTruck::Traveling { delivery, .. } => {
                delivery
            }
        }
    }

    /// Position along the supplier-warehouse road. A loading truck sits at 0.
    pub fn progress(&self) -> f64 {
        match *self {
            SupplyTruck::Traveling { progress, .. } => progress,
            _ => 0.0,
        }
    }

    /// Time left before the delivery lands, loading included.
    pub fn time_remaining(&self) -> f64 {
        match *self {
            SupplyTruck::Idle => 0.0,
            SupplyTruck::Loading {
                wait_remaining,
                travel_total,
                ..
            } => wait_remaining + travel_total,
            SupplyTruck::Traveling {
                travel_remaining, ..
            } => travel_remaining,
        }
    }

    /// Advances the truck by `dt`. Returns the delivered quantity on arrival.
    pub fn advance(&mut self, dt: f64) -> Option<f64> {
        if let SupplyTruck::Loading {
            delivery,
            wait_remaining,
            travel_total,
        } = *self
        {
            let wait = (wait_remaining - dt).max(0.0);
            if wait > 0.0 {
                *self = SupplyTruck::Loading {
                    delivery,
                    wait_remaining: wait,
                    travel_total,
                };
                return None;
            }
            *self = SupplyTruck::Traveling {
                delivery,
                progress: 0.0,
                travel_total,
                travel_remaining: travel_total,
            };
        }

        let SupplyTruck::Traveling {
            delivery,
            progress,
            travel_total,
            travel_remaining,
        } = *self
        else {
            return None;
        };

        if travel_total <= 0.0 {
            *self = SupplyTruck::Idle;
            return Some(delivery.max(0.0));
        }

        let remaining = (travel_remaining - dt).max(0.0);
        let progress = (progress + dt / travel_total.max(1e-6)).min(1.0);
        if remaining <= 0.0 || (progress - 1.0).abs() < ARRIVAL_EPSILON {
            *self = SupplyTruck::Idle;
            return Some(delivery.max(0.0));
        }

        *self = SupplyTruck::Traveling {
            delivery,
            progress,
            travel_total,
            travel_remaining: remaining,
        };
        None
    }

    pub fn sanitize(&mut self) {
        match self {
            SupplyTruck::Idle => {}
            SupplyTruck::Loading {
                delivery,
                wait_remaining,
                travel_total,
            } => {
                *delivery = finite_or_zero(*delivery).max(0.0);
                *wait_remaining = finite_or_zero(*wait_remaining).max(0.0);
                *travel_total = finite_or_zero(*travel_total).max(0.0);
            }
            SupplyTruck::Traveling {
                delivery,
                progress,
                travel_total,
                travel_remaining,
            } => {
                *delivery = finite_or_zero(*delivery).max(0.0);
                *progress = finite_or_zero(*progress).clamp(0.0, 1.0);
                *travel_total = finite_or_zero(*travel_total).max(0.0);
                *travel_remaining = finite_or_zero(*travel_remaining).max(0.0);
            }
        }
    }
}

// =========================================================================
// Retail van (distribution centre <-> supermarket)
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VanDirection {
    #[default]
    Outbound,
    Inbound,
}

/// Downstream delivery van. It is scenery for the renderer: it never moves
/// stock, it only counts completed drops at the supermarket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetailVan {
    pub progress: f64,
    pub direction: VanDirection,
    pub dwell: f64,
    pub drops: u64,
}

impl RetailVan {
    const SUPERMARKET_DWELL: f64 = 0.4;
    const DEPOT_DWELL: f64 = 0.3;

    /// Returns true when the van has just arrived at the supermarket.
    pub fn advance(&mut self, dt: f64) -> bool {
        if self.dwell > 0.0 {
            self.dwell = (self.dwell - dt).max(0.0);
            return false;
        }

        let step = (dt / 6.0).clamp(0.01, 0.06);
        match self.direction {
            VanDirection::Outbound => {
                self.progress = (self.progress + step).clamp(0.0, 1.0);
                if self.progress >= 1.0 {
                    self.direction = VanDirection::Inbound;
                    self.dwell = Self::SUPERMARKET_DWELL;
                    self.drops += 1;
                    return true;
                }
            }
            VanDirection::Inbound => {
                self.progress = (self.progress - step).clamp(0.0, 1.0);
                if self.progress <= 0.0 {
                    self.direction = VanDirection::Outbound;
                    self.dwell = Self::DEPOT_DWELL;
                }
            }
        }
        false
    }

    pub fn sanitize(&mut self) {
        self.progress = finite_or_zero(self.progress).clamp(0.0, 1.0);
        self.dwell = finite_or_zero(self.dwell).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuttle_picks_up_at_warehouse_and_drops_at_factory() {
        let mut shuttle = WorkerShuttle {
            progress: 0.9,
            ..WorkerShuttle::default()
        };
        let mut warehouse = 25.0;
        let mut factory = 10.0;

        let event = shuttle.advance(0.2, 40.0, &mut warehouse, &mut factory);
        assert_eq!(event, Some(ShuttleEvent::PickedUp(25.0)));
        assert_eq!(warehouse, 0.0);
        assert_eq!(shuttle.load, 25.0);
        assert_eq!(shuttle.direction, ShuttleDirection::ReturningToFactory);

        let event = shuttle.advance(1.0, 40.0, &mut warehouse, &mut factory);
        assert_eq!(event, Some(ShuttleEvent::Deposited(25.0)));
        assert_eq!(factory, 35.0);
        assert_eq!(shuttle.load, 0.0);
        assert_eq!(shuttle.direction, ShuttleDirection::TowardWarehouse);
    }

    #[test]
    fn shuttle_speed_guards_zero_capacity() {
        let shuttle = WorkerShuttle::default();
        assert_eq!(shuttle.speed(200.0, 0.0, 0.002), 0.0);
    }

    #[test]
    fn idle_factory_lets_shuttle_finish_its_leg() {
        let mut shuttle = WorkerShuttle::default();
        assert_eq!(shuttle.speed(0.0, 40.0, 0.1), 0.2);

        shuttle.progress = 1.0;
        assert_eq!(shuttle.speed(0.0, 40.0, 0.1), 0.0);
    }

    #[test]
    fn shuttle_speed_matches_production_pace() {
        let shuttle = WorkerShuttle::default();
        // 40 units at 200/day is a 0.2 day cycle, 0.1 per leg.
        let speed = shuttle.speed(200.0, 40.0, 0.002);
        assert!((speed - 0.02).abs() < 1e-12);
        // Never slower than one leg per tick at very coarse steps.
        assert_eq!(shuttle.speed(200.0, 40.0, 5.0), 1.0);
    }

    #[test]
    fn truck_loads_then_travels_then_delivers() {
        let mut truck = SupplyTruck::dispatch(160.0, 4.0, 0.5);
        assert_eq!(truck.phase_name(), "loading");

        assert_eq!(truck.advance(0.5), None);
        assert_eq!(truck.phase_name(), "loading");

        // Loading finishes and travel starts in the same step.
        assert_eq!(truck.advance(0.5), None);
        assert_eq!(truck.phase_name(), "traveling");

        let mut delivered = None;
        for _ in 0..10 {
            if let Some(qty) = truck.advance(0.5) {
                delivered = Some(qty);
                break;
            }
        }
        assert_eq!(delivered, Some(160.0));
        assert!(truck.is_idle());
    }

    #[test]
    fn zero_travel_delivers_immediately() {
        let mut truck = SupplyTruck::Traveling {
            delivery: 80.0,
            progress: 0.0,
            travel_total: 0.0,
            travel_remaining: 0.0,
        };
        assert_eq!(truck.advance(0.1), Some(80.0));
        assert!(truck.is_idle());
    }

    #[test]
    fn dispatch_enforces_minimum_lead_time() {
        let truck = SupplyTruck::dispatch(50.0, 0.0, 0.002);
        match truck {
            SupplyTruck::Loading {
                wait_remaining,
                travel_total,
                ..
            } => {
                assert!((wait_remaining - 0.025).abs() < 1e-12);
                assert!((travel_total - 0.075).abs() < 1e-12);
            }
            other => panic!("unexpected truck state {other:?}"),
        }
    }

    #[test]
    fn van_dwells_after_each_leg() {
        let mut van = RetailVan::default();
        let mut arrivals = 0;
        for _ in 0..200 {
            if van.advance(0.12) {
                arrivals += 1;
            }
        }
        assert!(arrivals > 0);
        assert_eq!(van.drops, arrivals);
        assert!((0.0..=1.0).contains(&van.progress));
    }
}
