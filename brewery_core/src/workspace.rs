//! Command façade over the store, sales history and audit log.
//!
//! A [`Workspace`] is what front ends talk to. Each command runs against a
//! copy of the store; only when the command succeeds and the copy has been
//! saved does it replace the live store, and only then are its events
//! appended to the audit log.
//!
//! Files in the data directory:
//! - `state.json` - the store
//! - `sales.csv` - master sales history
//! - `audit.log` - human-readable event log

use crate::advisor::{self, Suggestions};
use crate::audit::{AuditEvent, AuditSink, FileAuditLog};
use crate::forecast::{DemandModel, Forecast};
use crate::sales::{self, SalesHistory};
use crate::store::{Delivery, Snapshot, Transition};
use crate::{BeerType, Brewery, Config, Error, Order, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const STATE_FILE: &str = "state.json";
const SALES_FILE: &str = "sales.csv";
const AUDIT_FILE: &str = "audit.log";

/// Current state plus what the advisor recommends
#[derive(Clone, Debug)]
pub struct Refresh {
    pub snapshot: Snapshot,
    pub suggestions: Suggestions,
}

/// Outcome of a sales import
#[derive(Clone, Debug, PartialEq)]
pub struct ImportReport {
    pub rows: usize,
    pub beers: Vec<String>,
}

pub struct Workspace {
    config: Config,
    data_dir: PathBuf,
    brewery: Brewery,
    sales: SalesHistory,
    audit: FileAuditLog,
}

impl Workspace {
    /// Open (or create) the workspace stored in `data_dir`
    pub fn open(data_dir: impl Into<PathBuf>, config: Config) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let brewery = Brewery::load_or_else(&data_dir.join(STATE_FILE), || {
            Brewery::new(
                crate::get_default_catalog().beers.clone(),
                config.initial_tanks(),
            )
        })?;
        let sales = SalesHistory::from_records(&sales::load_master(&data_dir.join(SALES_FILE)));
        let audit = FileAuditLog::new(data_dir.join(AUDIT_FILE));

        tracing::debug!("Opened workspace at {:?}", data_dir);
        Ok(Self {
            config,
            data_dir,
            brewery,
            sales,
            audit,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn brewery(&self) -> &Brewery {
        &self.brewery
    }

    pub fn sales(&self) -> &SalesHistory {
        &self.sales
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }

    pub fn sales_path(&self) -> PathBuf {
        self.data_dir.join(SALES_FILE)
    }

    pub fn audit_path(&self) -> &Path {
        self.audit.path()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        self.brewery.snapshot(now)
    }

    /// Snapshot and suggestions in one call
    pub fn refresh(&self, now: DateTime<Utc>) -> Refresh {
        Refresh {
            snapshot: self.brewery.snapshot(now),
            suggestions: advisor::evaluate(&self.brewery, &self.config, now),
        }
    }

    /// Forecast for one beer over the configured horizon
    pub fn forecast(&self, beer: &str, today: NaiveDate) -> Result<Forecast> {
        let beer = self
            .brewery
            .beer(beer)
            .ok_or_else(|| Error::UnknownBeer(beer.to_string()))?;
        Forecast::for_beer(beer, self.config.forecast.horizon_days, today)
    }

    pub fn audit_entries(&self) -> Result<Vec<String>> {
        crate::audit::read_entries(self.audit.path())
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn add_batch(&mut self, beer: &str, volume: u32, now: DateTime<Utc>) -> Result<Uuid> {
        self.transact(now, |brewery, _| {
            let id = brewery.add_batch(beer, volume, now)?;
            Ok((id, batch_added(brewery, id)))
        })
    }

    /// Advance a batch regardless of how long it has been in its stage
    pub fn advance_batch(
        &mut self,
        batch: &str,
        tank: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let id = self.brewery.resolve_batch(batch)?;
        self.transact(now, |brewery, config| {
            let transition = brewery.advance_batch(id, tank, now, &config.production)?;
            let events = transition_events(&transition);
            Ok((transition, events))
        })
    }

    /// Advance a batch only if the advisor currently suggests it
    pub fn execute_advance(
        &mut self,
        batch: &str,
        tank: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        let id = self.brewery.resolve_batch(batch)?;
        let suggestion = advisor::suggest_advances(&self.brewery, &self.config, now)
            .into_iter()
            .find(|s| s.batch == id)
            .ok_or_else(|| {
                Error::StaleSuggestion(format!("batch {} is not due to advance", batch))
            })?;

        self.transact(now, |brewery, config| {
            let transition = advisor::execute_advance(brewery, config, &suggestion, tank, now)?;
            let events = transition_events(&transition);
            Ok((transition, events))
        })
    }

    /// Start the batch the advisor currently suggests
    pub fn execute_start(&mut self, now: DateTime<Utc>) -> Result<Uuid> {
        let suggestion = advisor::suggest_start(&self.brewery, &self.config, now)
            .ok_or_else(|| Error::StaleSuggestion("no batch start is suggested".into()))?;

        self.transact(now, |brewery, config| {
            let id = advisor::execute_start(brewery, config, &suggestion, now)?;
            Ok((id, batch_added(brewery, id)))
        })
    }

    pub fn add_order(
        &mut self,
        beer: &str,
        bottles: u32,
        due: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        self.transact(now, |brewery, _| {
            let id = brewery.add_order(beer, bottles, due, now.date_naive(), now)?;
            let event = AuditEvent::OrderAdded {
                id,
                beer: beer.to_string(),
                bottles,
                due,
            };
            Ok((id, vec![event]))
        })
    }

    pub fn deliver_order(&mut self, order: &str, now: DateTime<Utc>) -> Result<Delivery> {
        let id = self.brewery.resolve_order(order)?;
        self.transact(now, |brewery, _| {
            let delivery = brewery.deliver_order(id, now)?;
            let event = AuditEvent::OrderDelivered {
                id,
                beer: delivery.beer.clone(),
                bottles: delivery.bottles,
                remaining: delivery.remaining,
            };
            Ok((delivery, vec![event]))
        })
    }

    pub fn cancel_order(&mut self, order: &str, now: DateTime<Utc>) -> Result<Order> {
        let id = self.brewery.resolve_order(order)?;
        self.transact(now, |brewery, _| {
            let order = brewery.cancel_order(id)?;
            let event = AuditEvent::OrderCancelled {
                id,
                beer: order.beer.clone(),
                bottles: order.bottles,
            };
            Ok((order, vec![event]))
        })
    }

    /// Merge a sales CSV into the history and refit every beer's demand
    ///
    /// The file is parsed completely first; any malformed row rejects the
    /// import and nothing is merged. The refitted store is saved before the
    /// new master sales file is moved into place.
    pub fn import_sales(&mut self, path: &Path, now: DateTime<Utc>) -> Result<ImportReport> {
        let imported = sales::read_sales_csv(path)?;

        let mut records = sales::load_master(&self.sales_path());
        records.extend(imported.iter().cloned());
        let history = SalesHistory::from_records(&records);

        let mut beers: Vec<String> = imported.iter().map(|r| r.beer.clone()).collect();
        beers.sort();
        beers.dedup();

        let report = ImportReport {
            rows: imported.len(),
            beers,
        };
        let event = AuditEvent::SalesImported {
            source: path.display().to_string(),
            rows: report.rows,
            beers: report.beers.len(),
        };

        let (working, (), events) = self.stage(|brewery, config| {
            for (name, series) in history.iter() {
                let mut beer = brewery
                    .beer(name)
                    .cloned()
                    .unwrap_or_else(|| BeerType::new(name));
                if let Some(model) = DemandModel::fit(series, &config.forecast) {
                    model.apply(&mut beer);
                    tracing::info!(
                        "{}: anchor {:.1} bottles/day, growth {:.4}/day",
                        name,
                        model.base_sales,
                        model.growth_rate
                    );
                }
                brewery.upsert_beer(beer);
            }
            Ok(((), vec![event]))
        })?;

        let master = sales::stage_append(&self.sales_path(), &imported)?;
        working.save(&self.state_path())?;
        if let Err(e) = master.commit() {
            // Put the previous store back so state and sales stay in step
            if let Err(restore) = self.brewery.save(&self.state_path()) {
                tracing::error!("Failed to restore state after import error: {}", restore);
            }
            return Err(e);
        }

        self.commit(working, &events, now)?;
        self.sales = history;
        Ok(report)
    }

    /// Run a command against a copy of the store, save, then swap it in
    fn transact<T, F>(&mut self, now: DateTime<Utc>, command: F) -> Result<T>
    where
        F: FnOnce(&mut Brewery, &Config) -> Result<(T, Vec<AuditEvent>)>,
    {
        let (working, value, events) = self.stage(command)?;
        working.save(&self.state_path())?;
        self.commit(working, &events, now)?;
        Ok(value)
    }

    /// Apply a command to a copy of the store
    fn stage<T, F>(&self, command: F) -> Result<(Brewery, T, Vec<AuditEvent>)>
    where
        F: FnOnce(&mut Brewery, &Config) -> Result<(T, Vec<AuditEvent>)>,
    {
        let mut working = self.brewery.clone();
        let (value, events) = command(&mut working, &self.config)?;
        Ok((working, value, events))
    }

    /// Swap in a saved store and record its events
    fn commit(&mut self, working: Brewery, events: &[AuditEvent], now: DateTime<Utc>) -> Result<()> {
        self.brewery = working;
        for event in events {
            self.audit.record(now, event)?;
        }
        Ok(())
    }
}

fn batch_added(brewery: &Brewery, id: Uuid) -> Vec<AuditEvent> {
    brewery
        .batch(id)
        .map(|b| AuditEvent::BatchAdded {
            id,
            beer: b.beer.clone(),
            volume: b.volume,
            stage: b.stage,
        })
        .into_iter()
        .collect()
}

fn transition_events(transition: &Transition) -> Vec<AuditEvent> {
    let mut events = Vec::new();
    if let Some(tank) = &transition.released {
        events.push(AuditEvent::TankReleased {
            tank: tank.clone(),
            batch: transition.batch,
        });
    }
    events.push(AuditEvent::BatchAdvanced {
        id: transition.batch,
        beer: transition.beer.clone(),
        from: transition.from,
        to: transition.to,
    });
    if let Some(tank) = &transition.assigned {
        events.push(AuditEvent::TankAssigned {
            tank: tank.clone(),
            batch: transition.batch,
            stage: transition.to,
        });
    }
    if let Some(bottles) = transition.bottles {
        events.push(AuditEvent::BatchBottled {
            id: transition.batch,
            beer: transition.beer.clone(),
            bottles,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stage;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap()
    }

    fn open(dir: &Path) -> Workspace {
        crate::logging::init_test();
        Workspace::open(dir, Config::default()).unwrap()
    }

    #[test]
    fn test_commands_persist_and_audit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ws = open(temp_dir.path());

        let id = ws.add_batch("Organic Pilsner", 500, now()).unwrap();
        ws.advance_batch(&id.to_string(), Some("Albert"), now()).unwrap();

        let reopened = open(temp_dir.path());
        assert_eq!(reopened.brewery().batch(id).unwrap().stage, Stage::Fermenting);

        let entries = reopened.audit_entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].contains(" - batch - Added 500L of Organic Pilsner"));
        assert!(entries[1].contains("from brewing to fermenting"));
        assert!(entries[2].contains(" - tank - Albert now fermenting"));
    }

    #[test]
    fn test_failed_command_changes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ws = open(temp_dir.path());

        assert!(ws.add_batch("Organic Pilsner", 1001, now()).is_err());
        assert!(ws.add_order("Organic Pilsner", 1001, now().date_naive(), now()).is_err());

        assert!(!ws.state_path().exists());
        assert!(ws.audit_entries().unwrap().is_empty());
    }

    #[test]
    fn test_delivery_flow() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ws = open(temp_dir.path());

        let order = ws
            .add_order("Organic Dunkel", 1000, now().date_naive(), now())
            .unwrap();
        let short = order.simple().to_string()[..8].to_string();

        let err = ws.deliver_order(&short, now()).unwrap_err();
        assert!(matches!(err, Error::InsufficientStock { .. }));
        assert!(ws.brewery().order(order).unwrap().is_pending());

        let id = ws.add_batch("Organic Dunkel", 500, now()).unwrap();
        let key = id.to_string();
        ws.advance_batch(&key, Some("Albert"), now()).unwrap();
        ws.advance_batch(&key, Some("Albert"), now()).unwrap();
        ws.advance_batch(&key, None, now()).unwrap();
        let bottled = ws.advance_batch(&key, None, now()).unwrap();
        assert_eq!(bottled.bottles, Some(1000));

        let delivery = ws.deliver_order(&short, now()).unwrap();
        assert_eq!(delivery.remaining, 0);

        let entries = ws.audit_entries().unwrap();
        assert!(entries.last().unwrap().contains("Delivered order"));
    }

    #[test]
    fn test_suggested_start_and_advance() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ws = open(temp_dir.path());

        let csv_path = temp_dir.path().join("import.csv");
        let mut csv = String::from("date,beer,quantity\n");
        for day in 0..14 {
            let date = now().date_naive() - Duration::days(13 - day);
            csv.push_str(&format!("{},Organic Pilsner,40\n", date.format("%Y-%m-%d")));
        }
        std::fs::write(&csv_path, csv).unwrap();

        let report = ws.import_sales(&csv_path, now()).unwrap();
        assert_eq!(report.rows, 14);
        assert_eq!(report.beers, vec!["Organic Pilsner".to_string()]);
        let pilsner = ws.brewery().beer("Organic Pilsner").unwrap();
        assert_eq!(pilsner.base_sales, 40.0);
        assert_eq!(pilsner.anchor_date, Some(now().date_naive()));

        let refresh = ws.refresh(now());
        let start = refresh.suggestions.start.unwrap();
        assert_eq!(start.beer, "Organic Pilsner");
        // 40 * 42 = 1680 bottles = 840L, within the largest fermenter
        assert_eq!(start.volume, 840);

        let id = ws.execute_start(now()).unwrap();
        assert!(matches!(
            ws.execute_start(now()),
            Err(Error::StaleSuggestion(_))
        ));

        let later = now() + Duration::hours(4);
        assert!(matches!(
            ws.execute_advance(&id.to_string(), None, now()),
            Err(Error::StaleSuggestion(_))
        ));
        let t = ws
            .execute_advance(&id.to_string(), Some("Albert"), later)
            .unwrap();
        assert_eq!(t.to, Stage::Fermenting);
    }

    #[test]
    fn test_bad_import_merges_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ws = open(temp_dir.path());

        let csv_path = temp_dir.path().join("bad.csv");
        std::fs::write(&csv_path, "date,beer,quantity\nnot a date,Organic Pilsner,4\n").unwrap();

        let err = ws.import_sales(&csv_path, now()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Import);
        assert!(!ws.sales_path().exists());
        assert!(ws.sales().is_empty());
        assert_eq!(ws.brewery().beer("Organic Pilsner").unwrap().base_sales, 0.0);
    }

    #[test]
    fn test_import_with_unsaveable_state_leaves_sales_alone() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ws = open(temp_dir.path());

        // A directory where the state file belongs makes every save fail
        std::fs::create_dir_all(ws.state_path()).unwrap();

        let csv_path = temp_dir.path().join("import.csv");
        std::fs::write(&csv_path, "date,beer,quantity\n2026-10-17,Organic Pilsner,40\n").unwrap();

        let err = ws.import_sales(&csv_path, now()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Infrastructure);
        assert!(!ws.sales_path().exists());
        assert!(ws.sales().is_empty());
        assert_eq!(ws.brewery().beer("Organic Pilsner").unwrap().base_sales, 0.0);
        assert!(ws.audit_entries().unwrap().is_empty());

        // Once the state can be saved, the retry imports the rows exactly once
        std::fs::remove_dir(ws.state_path()).unwrap();
        ws.import_sales(&csv_path, now()).unwrap();
        assert_eq!(sales::load_master(&ws.sales_path()).len(), 1);
        assert_eq!(ws.brewery().beer("Organic Pilsner").unwrap().base_sales, 40.0);
    }

    #[test]
    fn test_forecast_for_unknown_beer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ws = open(temp_dir.path());
        assert!(matches!(
            ws.forecast("Stout", now().date_naive()),
            Err(Error::UnknownBeer(_))
        ));
        let forecast = ws.forecast("Organic Pilsner", now().date_naive()).unwrap();
        assert_eq!(forecast.points().len(), 365);
    }
}
