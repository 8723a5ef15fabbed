#![forbid(unsafe_code)]

//! Core domain model and business logic for the Brewplan brewery planner.
//!
//! This crate provides:
//! - Domain types (beers, tanks, batches, orders, inventory)
//! - Sales history import and demand forecasting
//! - Production advice (what to brew, what to move)
//! - Persistence (state, master sales CSV, audit log)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod audit;
pub mod sales;
pub mod forecast;
pub mod store;
pub mod state;
pub mod advisor;
pub mod workspace;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, Catalog};
pub use config::Config;
pub use audit::{AuditEvent, AuditSink, FileAuditLog};
pub use sales::{DailySeries, SalesHistory};
pub use forecast::{DemandModel, Forecast, ForecastPoint, RangeSpan};
pub use store::{BatchView, Brewery, Delivery, Snapshot, Transition};
pub use advisor::{AdvanceAction, AdvanceSuggestion, StartSuggestion, Suggestions};
pub use workspace::{ImportReport, Refresh, Workspace};
