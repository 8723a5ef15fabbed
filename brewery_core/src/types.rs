//! Core domain types for the brewery planner.
//!
//! This module defines the fundamental types used throughout the system:
//! - Beer types and sales records
//! - Production stages and batches
//! - Tanks and their capabilities
//! - Orders and bottled inventory

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Largest batch the brewhouse can produce, in litres
pub const MAX_BATCH_LITRES: u32 = 1000;

/// Largest order accepted, in bottles
pub const MAX_ORDER_BOTTLES: u32 = 1000;

/// Largest tank the cellar holds, in litres
pub const MAX_TANK_LITRES: u32 = 1000;

// ============================================================================
// Beer Types
// ============================================================================

/// Reference data for a beer and its demand model
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BeerType {
    pub name: String,
    /// Anchor sales figure in bottles per day
    pub base_sales: f64,
    /// Daily growth rate applied to the anchor (0.01 = 1% per day)
    pub growth_rate: f64,
    /// Last day of known sales; day 1 of a forecast is the day after
    pub anchor_date: Option<NaiveDate>,
}

impl BeerType {
    /// A beer with no sales history yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_sales: 0.0,
            growth_rate: 0.0,
            anchor_date: None,
        }
    }
}

/// One row of historical sales
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub beer: String,
    pub quantity: u32,
}

// ============================================================================
// Production Stages
// ============================================================================

/// A discrete step in beer production
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Queued for the brewhouse
    Waiting,
    Brewing,
    Fermenting,
    Conditioning,
    Bottling,
    /// Finished and credited to inventory
    Bottled,
}

impl Stage {
    /// The stage a batch moves to when advanced, `None` once bottled
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Waiting => Some(Stage::Brewing),
            Stage::Brewing => Some(Stage::Fermenting),
            Stage::Fermenting => Some(Stage::Conditioning),
            Stage::Conditioning => Some(Stage::Bottling),
            Stage::Bottling => Some(Stage::Bottled),
            Stage::Bottled => None,
        }
    }

    /// Whether a batch in this stage must occupy a tank
    pub fn requires_tank(self) -> bool {
        matches!(self, Stage::Fermenting | Stage::Conditioning)
    }

    /// Whether a batch in this stage still counts towards future supply
    pub fn in_pipeline(self) -> bool {
        matches!(self, Stage::Waiting | Stage::Brewing | Stage::Fermenting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Waiting => "waiting",
            Stage::Brewing => "brewing",
            Stage::Fermenting => "fermenting",
            Stage::Conditioning => "conditioning",
            Stage::Bottling => "bottling",
            Stage::Bottled => "bottled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tanks and Batches
// ============================================================================

/// What a tank can be used for
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TankFunction {
    Fermenter,
    Conditioner,
    Both,
}

impl TankFunction {
    /// Whether a tank with this function can host the given stage
    pub fn supports(self, stage: Stage) -> bool {
        match stage {
            Stage::Fermenting => matches!(self, TankFunction::Fermenter | TankFunction::Both),
            Stage::Conditioning => matches!(self, TankFunction::Conditioner | TankFunction::Both),
            _ => false,
        }
    }
}

/// A cellar tank; holds at most one batch
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Tank {
    pub name: String,
    /// Capacity in litres
    pub capacity: u32,
    pub function: TankFunction,
    pub occupant: Option<Uuid>,
}

impl Tank {
    pub fn new(name: impl Into<String>, capacity: u32, function: TankFunction) -> Self {
        Self {
            name: name.into(),
            capacity,
            function,
            occupant: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }

    /// Free, capable of the stage and large enough for the volume
    pub fn can_accept(&self, stage: Stage, volume: u32) -> bool {
        self.is_free() && self.function.supports(stage) && volume <= self.capacity
    }
}

/// A batch of beer moving through production
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: Uuid,
    pub beer: String,
    /// Volume in litres
    pub volume: u32,
    pub stage: Stage,
    pub stage_started_at: DateTime<Utc>,
    pub tank: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Time spent in the current stage
    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.stage_started_at
    }

    /// First eight characters of the id, as shown to users
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

// ============================================================================
// Orders and Inventory
// ============================================================================

/// Fulfilment status of an order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Delivered { delivered_at: DateTime<Utc> },
}

/// A customer order for bottled beer
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub beer: String,
    pub bottles: u32,
    pub due: NaiveDate,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

/// Bottled-and-ready stock per beer
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Inventory {
    bottles: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn available(&self, beer: &str) -> u32 {
        self.bottles.get(beer).copied().unwrap_or(0)
    }

    pub fn add(&mut self, beer: &str, bottles: u32) {
        let entry = self.bottles.entry(beer.to_string()).or_insert(0);
        *entry = entry.saturating_add(bottles);
    }

    /// Remove bottles from stock; returns `None` and leaves stock untouched
    /// when there are not enough
    pub fn take(&mut self, beer: &str, bottles: u32) -> Option<u32> {
        let remaining = self.available(beer).checked_sub(bottles)?;
        self.bottles.insert(beer.to_string(), remaining);
        Some(remaining)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.bottles.iter().map(|(beer, count)| (beer.as_str(), *count))
    }
}

pub(crate) fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}
