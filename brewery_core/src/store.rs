//! The brewery data store.
//!
//! [`Brewery`] owns every table the planner works with: beer types, tanks,
//! active and completed batches, orders and bottled inventory. All commands
//! validate before they mutate, so a failed command leaves the store exactly
//! as it was.

use crate::config::ProductionConfig;
use crate::{
    BeerType, Batch, Error, Inventory, Order, OrderStatus, Result, Stage, Tank, MAX_BATCH_LITRES,
    MAX_ORDER_BOTTLES,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All planner state for one brewery
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Brewery {
    #[serde(default)]
    beers: Vec<BeerType>,
    tanks: Vec<Tank>,
    #[serde(default)]
    batches: Vec<Batch>,
    #[serde(default)]
    completed: Vec<Batch>,
    #[serde(default)]
    orders: Vec<Order>,
    #[serde(default)]
    inventory: Inventory,
}

/// Result of advancing a batch one stage
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub batch: Uuid,
    pub beer: String,
    pub from: Stage,
    pub to: Stage,
    /// Tank the batch moved into
    pub assigned: Option<String>,
    /// Tank the batch left
    pub released: Option<String>,
    /// Bottles credited to inventory when the batch finished
    pub bottles: Option<u32>,
}

/// Result of delivering an order
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub order: Uuid,
    pub beer: String,
    pub bottles: u32,
    pub remaining: u32,
}

/// An active batch and how long it has been in its stage
#[derive(Clone, Debug)]
pub struct BatchView {
    pub batch: Batch,
    pub elapsed: chrono::Duration,
}

/// Read-only view handed to front ends
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub beers: Vec<BeerType>,
    pub batches: Vec<BatchView>,
    pub tanks: Vec<Tank>,
    pub pending_orders: Vec<Order>,
    pub inventory: Vec<(String, u32)>,
}

impl Brewery {
    /// An empty brewery with the given beers and tanks
    pub fn new(beers: Vec<BeerType>, tanks: Vec<Tank>) -> Self {
        Self {
            beers,
            tanks,
            batches: Vec::new(),
            completed: Vec::new(),
            orders: Vec::new(),
            inventory: Inventory::default(),
        }
    }

    /// An empty brewery seeded from the default catalog
    pub fn with_defaults() -> Self {
        let catalog = crate::get_default_catalog();
        Self::new(catalog.beers.clone(), catalog.tanks.clone())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn beers(&self) -> &[BeerType] {
        &self.beers
    }

    pub fn beer(&self, name: &str) -> Option<&BeerType> {
        self.beers.iter().find(|b| b.name == name)
    }

    pub fn tanks(&self) -> &[Tank] {
        &self.tanks
    }

    pub fn tank(&self, name: &str) -> Option<&Tank> {
        self.tanks.iter().find(|t| t.name == name)
    }

    /// Batches still in production
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Batches that have been bottled
    pub fn completed(&self) -> &[Batch] {
        &self.completed
    }

    pub fn batch(&self, id: Uuid) -> Option<&Batch> {
        self.batches.iter().find(|b| b.id == id)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, id: Uuid) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Whether a batch currently occupies the brewhouse
    pub fn brewhouse_busy(&self) -> bool {
        self.batches.iter().any(|b| b.stage == Stage::Brewing)
    }

    /// Oldest batch queued for the brewhouse
    pub fn next_waiting(&self) -> Option<&Batch> {
        self.batches
            .iter()
            .filter(|b| b.stage == Stage::Waiting)
            .min_by_key(|b| b.created_at)
    }

    /// Free tanks able to hold `volume` litres during `stage`
    pub fn available_tanks(&self, stage: Stage, volume: u32) -> Vec<&Tank> {
        self.tanks
            .iter()
            .filter(|t| t.can_accept(stage, volume))
            .collect()
    }

    /// Tanks a batch may move into for its next stage
    ///
    /// A batch already sitting in a tank that can host the next stage may
    /// stay where it is; that tank is listed first.
    pub fn candidate_tanks(&self, batch: &Batch) -> Vec<String> {
        let Some(next) = batch.stage.next().filter(|s| s.requires_tank()) else {
            return Vec::new();
        };

        let mut names = Vec::new();
        if let Some(current) = batch.tank.as_deref().and_then(|name| self.tank(name)) {
            if current.function.supports(next) && current.capacity >= batch.volume {
                names.push(current.name.clone());
            }
        }
        names.extend(
            self.available_tanks(next, batch.volume)
                .into_iter()
                .map(|t| t.name.clone()),
        );
        names
    }

    /// Resolve a full batch id or a unique prefix of one
    pub fn resolve_batch(&self, key: &str) -> Result<Uuid> {
        resolve_id(key, "Batch", self.batches.iter().map(|b| b.id))
    }

    /// Resolve a full order id or a unique prefix of one
    pub fn resolve_order(&self, key: &str) -> Result<Uuid> {
        resolve_id(key, "Order", self.orders.iter().map(|o| o.id))
    }

    /// Copy of the current state for display
    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        let mut batches: Vec<BatchView> = self
            .batches
            .iter()
            .map(|b| BatchView {
                batch: b.clone(),
                elapsed: b.elapsed(now),
            })
            .collect();
        batches.sort_by_key(|v| (v.batch.stage, v.batch.created_at));

        let mut pending_orders: Vec<Order> =
            self.orders.iter().filter(|o| o.is_pending()).cloned().collect();
        pending_orders.sort_by_key(|o| (o.due, o.created_at));

        Snapshot {
            taken_at: now,
            beers: self.beers.clone(),
            batches,
            tanks: self.tanks.clone(),
            pending_orders,
            inventory: self
                .inventory
                .iter()
                .map(|(beer, count)| (beer.to_string(), count))
                .collect(),
        }
    }

    /// Describe every broken cross-reference between tanks and batches
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for tank in &self.tanks {
            if let Some(id) = tank.occupant {
                match self.batch(id) {
                    Some(batch) if batch.tank.as_deref() == Some(tank.name.as_str()) => {}
                    Some(_) => problems.push(format!(
                        "tank {} claims batch {} which is elsewhere",
                        tank.name, id
                    )),
                    None => problems.push(format!(
                        "tank {} holds unknown batch {}",
                        tank.name, id
                    )),
                }
            }
        }

        for batch in &self.batches {
            match batch.tank.as_deref() {
                Some(name) => match self.tank(name) {
                    Some(tank) if tank.occupant == Some(batch.id) => {}
                    _ => problems.push(format!(
                        "batch {} claims tank {} which does not hold it",
                        batch.id, name
                    )),
                },
                None if batch.stage.requires_tank() => problems.push(format!(
                    "batch {} is {} without a tank",
                    batch.id, batch.stage
                )),
                None => {}
            }
            if batch.volume == 0 || batch.volume > MAX_BATCH_LITRES {
                problems.push(format!("batch {} has volume {}L", batch.id, batch.volume));
            }
        }

        problems
    }

    // ------------------------------------------------------------------
    // Beer types
    // ------------------------------------------------------------------

    /// Insert a beer type, replacing any existing one of the same name
    pub fn upsert_beer(&mut self, beer: BeerType) {
        match self.beers.iter_mut().find(|b| b.name == beer.name) {
            Some(existing) => *existing = beer,
            None => self.beers.push(beer),
        }
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    /// Start a new batch
    ///
    /// The batch starts brewing when the brewhouse is free and nothing is
    /// queued, otherwise it joins the waiting queue.
    pub fn add_batch(&mut self, beer: &str, volume: u32, now: DateTime<Utc>) -> Result<Uuid> {
        validate_volume(volume)?;
        if self.beer(beer).is_none() {
            return Err(Error::UnknownBeer(beer.to_string()));
        }

        let stage = if self.brewhouse_busy() || self.next_waiting().is_some() {
            Stage::Waiting
        } else {
            Stage::Brewing
        };

        let batch = Batch {
            id: Uuid::new_v4(),
            beer: beer.to_string(),
            volume,
            stage,
            stage_started_at: now,
            tank: None,
            created_at: now,
        };
        let id = batch.id;

        tracing::info!("Added {}L of {} as {}", volume, beer, stage);
        self.batches.push(batch);
        Ok(id)
    }

    /// Move a batch to its next stage
    ///
    /// Stages that need a tank require `tank` to name a free tank able to
    /// host the stage; a batch may also stay in its current tank. Finishing
    /// bottling credits inventory and archives the batch.
    pub fn advance_batch(
        &mut self,
        id: Uuid,
        tank: Option<&str>,
        now: DateTime<Utc>,
        production: &ProductionConfig,
    ) -> Result<Transition> {
        let index = self
            .batches
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| Error::NotFound {
                entity: "Batch",
                id: id.to_string(),
            })?;
        let batch = &self.batches[index];
        let from = batch.stage;
        let to = from.next().ok_or_else(|| Error::InvalidTransition {
            batch: batch.short_id(),
            from,
            reason: "batch is already bottled".into(),
        })?;

        if from == Stage::Waiting && self.brewhouse_busy() {
            return Err(Error::BrewhouseBusy);
        }

        let target = if to.requires_tank() {
            let name = match tank {
                Some(name) => name,
                None => {
                    let candidates = self.candidate_tanks(batch);
                    return Err(Error::TankRequired {
                        stage: to,
                        candidates: if candidates.is_empty() {
                            "none".into()
                        } else {
                            candidates.join(", ")
                        },
                    });
                }
            };
            let target = self.tank(name).ok_or_else(|| Error::NotFound {
                entity: "Tank",
                id: name.to_string(),
            })?;
            if !target.function.supports(to) {
                return Err(Error::TankIncapable {
                    tank: target.name.clone(),
                    stage: to,
                });
            }
            if target.capacity < batch.volume {
                return Err(Error::TankTooSmall {
                    tank: target.name.clone(),
                    capacity: target.capacity,
                    volume: batch.volume,
                });
            }
            let staying = batch.tank.as_deref() == Some(name);
            if !staying && !target.is_free() {
                return Err(Error::TankUnavailable(target.name.clone()));
            }
            Some(target.name.clone())
        } else {
            if let Some(name) = tank {
                return Err(Error::Validation(format!(
                    "{} does not use a tank, but {} was given",
                    to, name
                )));
            }
            None
        };

        // Validation done; mutate
        let previous = self.batches[index].tank.clone();
        let released = previous.clone().filter(|old| target.as_ref() != Some(old));
        if let Some(old) = &released {
            if let Some(t) = self.tanks.iter_mut().find(|t| &t.name == old) {
                t.occupant = None;
            }
        }
        let assigned = target.clone().filter(|new| previous.as_ref() != Some(new));
        if let Some(new) = &assigned {
            if let Some(t) = self.tanks.iter_mut().find(|t| &t.name == new) {
                t.occupant = Some(id);
            }
        }

        let batch = &mut self.batches[index];
        batch.stage = to;
        batch.stage_started_at = now;
        batch.tank = target;
        let beer = batch.beer.clone();

        let bottles = if to == Stage::Bottled {
            let finished = self.batches.remove(index);
            let bottles = production.bottles_for(finished.volume);
            self.inventory.add(&finished.beer, bottles);
            tracing::info!(
                "Bottled {}L of {}: {} bottles added",
                finished.volume,
                finished.beer,
                bottles
            );
            self.completed.push(finished);
            Some(bottles)
        } else {
            None
        };

        tracing::info!("Batch {} moved from {} to {}", id, from, to);
        Ok(Transition {
            batch: id,
            beer,
            from,
            to,
            assigned,
            released,
            bottles,
        })
    }

    // ------------------------------------------------------------------
    // Orders and inventory
    // ------------------------------------------------------------------

    /// Record a new order
    ///
    /// Bottle count must be within 1..=1000 and the due date must not be
    /// before `today`.
    pub fn add_order(
        &mut self,
        beer: &str,
        bottles: u32,
        due: NaiveDate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        if bottles == 0 || bottles > MAX_ORDER_BOTTLES {
            return Err(Error::Validation(format!(
                "order size must be within 1..={} bottles, got {}",
                MAX_ORDER_BOTTLES, bottles
            )));
        }
        if due < today {
            return Err(Error::Validation(format!(
                "due date {} is in the past",
                due
            )));
        }
        if self.beer(beer).is_none() {
            return Err(Error::UnknownBeer(beer.to_string()));
        }

        let order = Order {
            id: Uuid::new_v4(),
            beer: beer.to_string(),
            bottles,
            due,
            status: OrderStatus::Pending,
            created_at: now,
        };
        let id = order.id;
        tracing::info!("Added order for {} bottles of {} due {}", bottles, beer, due);
        self.orders.push(order);
        Ok(id)
    }

    /// Deliver a pending order out of inventory
    ///
    /// Fails with [`Error::InsufficientStock`] when there are not enough
    /// bottles; inventory and the order are then left unchanged.
    pub fn deliver_order(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<Delivery> {
        let index = self.order_index(id)?;
        let order = &self.orders[index];
        if !order.is_pending() {
            return Err(Error::OrderNotPending(order.short_id()));
        }

        let available = self.inventory.available(&order.beer);
        let remaining =
            self.inventory
                .take(&order.beer, order.bottles)
                .ok_or_else(|| Error::InsufficientStock {
                    beer: order.beer.clone(),
                    requested: order.bottles,
                    available,
                })?;

        let order = &mut self.orders[index];
        order.status = OrderStatus::Delivered { delivered_at: now };
        tracing::info!(
            "Delivered {} bottles of {}, {} left",
            order.bottles,
            order.beer,
            remaining
        );

        Ok(Delivery {
            order: id,
            beer: order.beer.clone(),
            bottles: order.bottles,
            remaining,
        })
    }

    /// Remove a pending order
    pub fn cancel_order(&mut self, id: Uuid) -> Result<Order> {
        let index = self.order_index(id)?;
        if !self.orders[index].is_pending() {
            return Err(Error::OrderNotPending(self.orders[index].short_id()));
        }
        Ok(self.orders.remove(index))
    }

    fn order_index(&self, id: Uuid) -> Result<usize> {
        self.orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| Error::NotFound {
                entity: "Order",
                id: id.to_string(),
            })
    }
}

fn validate_volume(volume: u32) -> Result<()> {
    if volume == 0 || volume > MAX_BATCH_LITRES {
        return Err(Error::Validation(format!(
            "batch volume must be within 1..={}L, got {}L",
            MAX_BATCH_LITRES, volume
        )));
    }
    Ok(())
}

fn resolve_id(key: &str, entity: &'static str, ids: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(id);
    }

    let prefix = key.trim().to_lowercase().replace('-', "");
    if prefix.is_empty() {
        return Err(Error::Validation(format!("empty {} id", entity.to_lowercase())));
    }

    let matches: Vec<Uuid> = ids
        .filter(|id| id.simple().to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(Error::NotFound {
            entity,
            id: key.to_string(),
        }),
        _ => Err(Error::Validation(format!(
            "{} id prefix {:?} is ambiguous",
            entity.to_lowercase(),
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TankFunction, MAX_ORDER_BOTTLES};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        now().date_naive()
    }

    fn production() -> ProductionConfig {
        ProductionConfig::default()
    }

    fn small_brewery() -> Brewery {
        Brewery::new(
            vec![BeerType::new("Organic Pilsner"), BeerType::new("Organic Dunkel")],
            vec![
                Tank::new("Albert", 1000, TankFunction::Both),
                Tank::new("Gertrude", 680, TankFunction::Conditioner),
                Tank::new("R2D2", 800, TankFunction::Fermenter),
            ],
        )
    }

    /// Walk a batch up to the bottling line
    fn brew_to_bottling(brewery: &mut Brewery, beer: &str, volume: u32) -> Uuid {
        let id = brewery.add_batch(beer, volume, now()).unwrap();
        let p = production();
        brewery.advance_batch(id, Some("R2D2"), now(), &p).unwrap();
        brewery.advance_batch(id, Some("Albert"), now(), &p).unwrap();
        brewery.advance_batch(id, None, now(), &p).unwrap();
        id
    }

    #[test]
    fn test_batch_volume_bounds() {
        let mut brewery = small_brewery();
        assert!(matches!(
            brewery.add_batch("Organic Pilsner", 1001, now()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            brewery.add_batch("Organic Pilsner", 0, now()),
            Err(Error::Validation(_))
        ));
        assert!(brewery.batches().is_empty());

        assert!(brewery.add_batch("Organic Pilsner", 1000, now()).is_ok());
    }

    #[test]
    fn test_unknown_beer_rejected() {
        let mut brewery = small_brewery();
        assert!(matches!(
            brewery.add_batch("Lager", 100, now()),
            Err(Error::UnknownBeer(_))
        ));
    }

    #[test]
    fn test_second_batch_waits_for_brewhouse() {
        let mut brewery = small_brewery();
        let first = brewery.add_batch("Organic Pilsner", 500, now()).unwrap();
        let second = brewery.add_batch("Organic Dunkel", 500, now()).unwrap();

        assert_eq!(brewery.batch(first).unwrap().stage, Stage::Brewing);
        assert_eq!(brewery.batch(second).unwrap().stage, Stage::Waiting);

        let p = production();
        assert!(matches!(
            brewery.advance_batch(second, None, now(), &p),
            Err(Error::BrewhouseBusy)
        ));

        brewery.advance_batch(first, Some("R2D2"), now(), &p).unwrap();
        let t = brewery.advance_batch(second, None, now(), &p).unwrap();
        assert_eq!(t.to, Stage::Brewing);
    }

    #[test]
    fn test_tank_stage_requires_tank() {
        let mut brewery = small_brewery();
        let id = brewery.add_batch("Organic Pilsner", 500, now()).unwrap();
        let p = production();

        let err = brewery.advance_batch(id, None, now(), &p).unwrap_err();
        match err {
            Error::TankRequired { stage, candidates } => {
                assert_eq!(stage, Stage::Fermenting);
                assert_eq!(candidates, "Albert, R2D2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(brewery.batch(id).unwrap().stage, Stage::Brewing);

        assert!(matches!(
            brewery.advance_batch(id, Some("Gertrude"), now(), &p),
            Err(Error::TankIncapable { .. })
        ));
        assert!(matches!(
            brewery.advance_batch(id, Some("Nobody"), now(), &p),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_tank_too_small() {
        let mut brewery = small_brewery();
        let id = brewery.add_batch("Organic Pilsner", 900, now()).unwrap();
        assert!(matches!(
            brewery.advance_batch(id, Some("R2D2"), now(), &production()),
            Err(Error::TankTooSmall { .. })
        ));
    }

    #[test]
    fn test_tank_assignment_is_exclusive() {
        let mut brewery = small_brewery();
        let p = production();
        let first = brewery.add_batch("Organic Pilsner", 500, now()).unwrap();
        brewery.advance_batch(first, Some("Albert"), now(), &p).unwrap();

        let second = brewery.add_batch("Organic Dunkel", 500, now()).unwrap();
        assert!(matches!(
            brewery.advance_batch(second, Some("Albert"), now(), &p),
            Err(Error::TankUnavailable(_))
        ));
        assert_eq!(brewery.tank("Albert").unwrap().occupant, Some(first));
        assert!(brewery.invariant_violations().is_empty());
    }

    #[test]
    fn test_batch_may_stay_in_tank_for_conditioning() {
        let mut brewery = small_brewery();
        let p = production();
        let id = brewery.add_batch("Organic Pilsner", 500, now()).unwrap();
        brewery.advance_batch(id, Some("Albert"), now(), &p).unwrap();

        let batch = brewery.batch(id).unwrap().clone();
        assert_eq!(brewery.candidate_tanks(&batch), vec!["Albert", "Gertrude"]);

        let t = brewery.advance_batch(id, Some("Albert"), now(), &p).unwrap();
        assert_eq!(t.to, Stage::Conditioning);
        assert_eq!(t.assigned, None);
        assert_eq!(t.released, None);
        assert_eq!(brewery.tank("Albert").unwrap().occupant, Some(id));
        assert!(brewery.invariant_violations().is_empty());
    }

    #[test]
    fn test_tanks_released_when_leaving() {
        let mut brewery = small_brewery();
        let p = production();
        let id = brewery.add_batch("Organic Pilsner", 500, now()).unwrap();
        brewery.advance_batch(id, Some("R2D2"), now(), &p).unwrap();

        let t = brewery.advance_batch(id, Some("Gertrude"), now(), &p).unwrap();
        assert_eq!(t.assigned.as_deref(), Some("Gertrude"));
        assert_eq!(t.released.as_deref(), Some("R2D2"));
        assert!(brewery.tank("R2D2").unwrap().is_free());

        let t = brewery.advance_batch(id, None, now(), &p).unwrap();
        assert_eq!(t.to, Stage::Bottling);
        assert_eq!(t.released.as_deref(), Some("Gertrude"));
        assert!(brewery.tanks().iter().all(Tank::is_free));
    }

    #[test]
    fn test_non_tank_stage_rejects_tank_argument() {
        let mut brewery = small_brewery();
        let p = production();
        let first = brewery.add_batch("Organic Pilsner", 500, now()).unwrap();
        let second = brewery.add_batch("Organic Pilsner", 500, now()).unwrap();
        brewery.advance_batch(first, Some("R2D2"), now(), &p).unwrap();

        assert!(matches!(
            brewery.advance_batch(second, Some("Albert"), now(), &p),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_bottling_credits_inventory_once() {
        let mut brewery = small_brewery();
        let id = brew_to_bottling(&mut brewery, "Organic Pilsner", 500);
        assert_eq!(brewery.batch(id).unwrap().stage, Stage::Bottling);

        let t = brewery
            .advance_batch(id, None, now() + Duration::days(60), &production())
            .unwrap();
        assert_eq!(t.to, Stage::Bottled);
        assert_eq!(t.bottles, Some(1000));
        assert_eq!(brewery.inventory().available("Organic Pilsner"), 1000);
        assert!(brewery.batch(id).is_none());
        assert_eq!(brewery.completed().len(), 1);

        // A second attempt finds nothing to advance
        assert!(matches!(
            brewery.advance_batch(id, None, now(), &production()),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(brewery.inventory().available("Organic Pilsner"), 1000);
    }

    #[test]
    fn test_order_size_bounds() {
        let mut brewery = small_brewery();
        assert!(matches!(
            brewery.add_order("Organic Pilsner", MAX_ORDER_BOTTLES + 1, today(), today(), now()),
            Err(Error::Validation(_))
        ));
        assert!(brewery.orders().is_empty());

        assert!(brewery
            .add_order("Organic Pilsner", MAX_ORDER_BOTTLES, today(), today(), now())
            .is_ok());
    }

    #[test]
    fn test_order_due_in_past_rejected() {
        let mut brewery = small_brewery();
        let yesterday = today() - Duration::days(1);
        assert!(matches!(
            brewery.add_order("Organic Pilsner", 10, yesterday, today(), now()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_delivery_with_insufficient_stock_changes_nothing() {
        let mut brewery = small_brewery();
        let order = brewery
            .add_order("Organic Pilsner", 10, today(), today(), now())
            .unwrap();
        let before = brewery.clone();

        let err = brewery.deliver_order(order, now()).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientStock {
                requested: 10,
                available: 0,
                ..
            }
        ));
        assert_eq!(brewery, before);
    }

    #[test]
    fn test_delivery_decrements_inventory() {
        let mut brewery = small_brewery();
        let id = brew_to_bottling(&mut brewery, "Organic Pilsner", 100);
        brewery.advance_batch(id, None, now(), &production()).unwrap();
        assert_eq!(brewery.inventory().available("Organic Pilsner"), 200);

        let order = brewery
            .add_order("Organic Pilsner", 150, today(), today(), now())
            .unwrap();
        let delivery = brewery.deliver_order(order, now()).unwrap();
        assert_eq!(delivery.remaining, 50);
        assert!(!brewery.order(order).unwrap().is_pending());

        assert!(matches!(
            brewery.deliver_order(order, now()),
            Err(Error::OrderNotPending(_))
        ));
        assert_eq!(brewery.inventory().available("Organic Pilsner"), 50);
    }

    #[test]
    fn test_cancel_order() {
        let mut brewery = small_brewery();
        let order = brewery
            .add_order("Organic Dunkel", 5, today(), today(), now())
            .unwrap();
        let cancelled = brewery.cancel_order(order).unwrap();
        assert_eq!(cancelled.bottles, 5);
        assert!(brewery.orders().is_empty());
    }

    #[test]
    fn test_resolve_prefixes() {
        let mut brewery = small_brewery();
        let id = brewery.add_batch("Organic Pilsner", 100, now()).unwrap();
        let short = brewery.batch(id).unwrap().short_id();

        assert_eq!(brewery.resolve_batch(&short).unwrap(), id);
        assert_eq!(brewery.resolve_batch(&id.to_string()).unwrap(), id);
        assert!(matches!(
            brewery.resolve_batch("zzzz"),
            Err(Error::NotFound { .. })
        ));
        assert!(brewery.resolve_order("").is_err());
    }

    #[test]
    fn test_snapshot_lists_pending_orders_by_due_date() {
        let mut brewery = small_brewery();
        let later = today() + Duration::days(10);
        brewery
            .add_order("Organic Pilsner", 5, later, today(), now())
            .unwrap();
        brewery
            .add_order("Organic Dunkel", 5, today(), today(), now())
            .unwrap();
        brewery.add_batch("Organic Pilsner", 100, now()).unwrap();

        let snapshot = brewery.snapshot(now() + Duration::hours(2));
        assert_eq!(snapshot.pending_orders[0].beer, "Organic Dunkel");
        assert_eq!(snapshot.batches[0].elapsed, Duration::hours(2));
    }

    #[test]
    fn test_upsert_beer() {
        let mut brewery = small_brewery();
        let mut beer = BeerType::new("Organic Pilsner");
        beer.base_sales = 12.0;
        brewery.upsert_beer(beer);
        brewery.upsert_beer(BeerType::new("Organic Red Helles"));

        assert_eq!(brewery.beers().len(), 3);
        assert_eq!(brewery.beer("Organic Pilsner").unwrap().base_sales, 12.0);
    }
}
