//! Production advisor: what to brew next and which batches to move on.
//!
//! Two independent rules, both evaluated against an explicit `now`:
//!
//! 1. **Start brew** - look at forecast demand for a window starting
//!    `lookahead_weeks` from now, subtract what is already in the pipeline
//!    (waiting, brewing, fermenting), and suggest a batch of the beer with
//!    the most unmet demand if the brewhouse and a fermenter are free.
//! 2. **Advance stage** - every batch that has overstayed its stage, plus
//!    the head of the waiting queue once the brewhouse is free.
//!
//! Suggestions are plain values. Executing one re-checks the rule first,
//! so acting on a suggestion twice fails instead of acting twice.

use crate::forecast::Forecast;
use crate::store::Transition;
use crate::{Batch, Brewery, Config, Error, Result, Stage, MAX_BATCH_LITRES};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

/// Suggestion to start brewing a new batch
#[derive(Clone, Debug, PartialEq)]
pub struct StartSuggestion {
    pub beer: String,
    /// Suggested volume in litres
    pub volume: u32,
    /// Unmet demand in bottles over the window
    pub demand: f64,
    pub window_start: NaiveDate,
    pub window_days: u32,
}

/// How an advance suggestion can be carried out
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdvanceAction {
    /// Next stage needs no tank; one action executes it
    Auto,
    /// Pick one of these tanks first
    ChooseTank(Vec<String>),
    /// Next stage needs a tank and none is free
    Blocked,
}

/// Suggestion to move a batch to its next stage
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceSuggestion {
    pub batch: Uuid,
    pub beer: String,
    pub volume: u32,
    pub from: Stage,
    pub to: Stage,
    pub elapsed: Duration,
    pub action: AdvanceAction,
}

/// Everything the advisor recommends right now
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Suggestions {
    pub start: Option<StartSuggestion>,
    pub advances: Vec<AdvanceSuggestion>,
}

/// Evaluate both rules
pub fn evaluate(brewery: &Brewery, config: &Config, now: DateTime<Utc>) -> Suggestions {
    Suggestions {
        start: suggest_start(brewery, config, now),
        advances: suggest_advances(brewery, config, now),
    }
}

/// Start-brew rule
pub fn suggest_start(
    brewery: &Brewery,
    config: &Config,
    now: DateTime<Utc>,
) -> Option<StartSuggestion> {
    if brewery.brewhouse_busy() || brewery.next_waiting().is_some() {
        tracing::debug!("Brewhouse occupied or queued, no start suggestion");
        return None;
    }

    let largest_free = brewery
        .available_tanks(Stage::Fermenting, 1)
        .iter()
        .map(|t| t.capacity)
        .max();
    let Some(largest_free) = largest_free else {
        tracing::debug!("No free fermenter, no start suggestion");
        return None;
    };

    let today = now.date_naive();
    let lookahead = Duration::try_weeks(config.forecast.lookahead_weeks.into())
        .and_then(|offset| today.checked_add_signed(offset));
    let Some(window_start) = lookahead else {
        tracing::warn!(
            "Lookahead of {} weeks is out of range, no start suggestion",
            config.forecast.lookahead_weeks
        );
        return None;
    };
    let window_days = config.forecast.demand_window_days;

    let mut best: Option<(&str, f64)> = None;
    let mut beers: Vec<_> = brewery.beers().iter().collect();
    beers.sort_by(|a, b| a.name.cmp(&b.name));

    for beer in beers {
        let total = Forecast::for_beer(beer, config.forecast.horizon_days, today)
            .and_then(|f| f.total(window_start, window_days));
        let total = match total {
            Ok(total) => total,
            Err(e) => {
                tracing::debug!("No demand figure for {}: {}", beer.name, e);
                continue;
            }
        };

        let demand = total - f64::from(pipeline_bottles(brewery, config, &beer.name));
        if best.map_or(true, |(_, d)| demand > d) {
            best = Some((beer.name.as_str(), demand));
        }
    }

    let (beer, demand) = best?;
    if demand <= 0.0 {
        tracing::debug!("Pipeline covers forecast demand, no start suggestion");
        return None;
    }

    let step = f64::from(config.forecast.volume_step_litres.max(1));
    let litres = (config.production.litres_for(demand) / step).ceil() * step;
    let volume = (litres.min(f64::from(MAX_BATCH_LITRES)) as u32).min(largest_free);

    if volume <= config.forecast.min_batch_litres {
        tracing::debug!("Suggested volume {}L too small, suppressed", volume);
        return None;
    }

    tracing::info!("Suggesting {}L of {} ({:.0} bottles unmet)", volume, beer, demand);
    Some(StartSuggestion {
        beer: beer.to_string(),
        volume,
        demand,
        window_start,
        window_days,
    })
}

/// Advance-stage rule
pub fn suggest_advances(
    brewery: &Brewery,
    config: &Config,
    now: DateTime<Utc>,
) -> Vec<AdvanceSuggestion> {
    let mut suggestions = Vec::new();

    if !brewery.brewhouse_busy() {
        if let Some(head) = brewery.next_waiting() {
            suggestions.push(advance_suggestion(brewery, head, now));
        }
    }

    for batch in brewery.batches() {
        if is_overdue(batch, config, now) {
            suggestions.push(advance_suggestion(brewery, batch, now));
        }
    }

    suggestions
}

/// Carry out a start suggestion if the rule still recommends that beer
pub fn execute_start(
    brewery: &mut Brewery,
    config: &Config,
    suggestion: &StartSuggestion,
    now: DateTime<Utc>,
) -> Result<Uuid> {
    match suggest_start(brewery, config, now) {
        Some(current) if current.beer == suggestion.beer => {
            brewery.add_batch(&suggestion.beer, suggestion.volume, now)
        }
        _ => Err(Error::StaleSuggestion(format!(
            "starting {} is no longer suggested",
            suggestion.beer
        ))),
    }
}

/// Carry out an advance suggestion if the batch is still due to move
///
/// `tank` is required when the suggestion asks for a tank choice.
pub fn execute_advance(
    brewery: &mut Brewery,
    config: &Config,
    suggestion: &AdvanceSuggestion,
    tank: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Transition> {
    let current = suggest_advances(brewery, config, now)
        .into_iter()
        .find(|s| s.batch == suggestion.batch && s.from == suggestion.from)
        .ok_or_else(|| {
            Error::StaleSuggestion(format!(
                "{} is no longer due to leave {}",
                suggestion.beer, suggestion.from
            ))
        })?;

    if current.action == AdvanceAction::Blocked && tank.is_none() {
        return Err(Error::NoFreeTank {
            stage: current.to,
            volume: current.volume,
        });
    }

    brewery.advance_batch(current.batch, tank, now, &config.production)
}

/// Whether a batch has spent longer than allowed in its stage
pub fn is_overdue(batch: &Batch, config: &Config, now: DateTime<Utc>) -> bool {
    let Some(limit) = config.production.max_duration(batch.stage, batch.volume) else {
        return false;
    };
    let elapsed = batch.elapsed(now);
    if batch.stage == Stage::Bottling {
        elapsed >= limit
    } else {
        elapsed > limit
    }
}

fn advance_suggestion(brewery: &Brewery, batch: &Batch, now: DateTime<Utc>) -> AdvanceSuggestion {
    // Active batches are never bottled, so there is always a next stage
    let to = batch.stage.next().unwrap_or(Stage::Bottled);
    let action = if to.requires_tank() {
        let candidates = brewery.candidate_tanks(batch);
        if candidates.is_empty() {
            AdvanceAction::Blocked
        } else {
            AdvanceAction::ChooseTank(candidates)
        }
    } else {
        AdvanceAction::Auto
    };

    AdvanceSuggestion {
        batch: batch.id,
        beer: batch.beer.clone(),
        volume: batch.volume,
        from: batch.stage,
        to,
        elapsed: batch.elapsed(now),
        action,
    }
}

fn pipeline_bottles(brewery: &Brewery, config: &Config, beer: &str) -> u32 {
    brewery
        .batches()
        .iter()
        .filter(|b| b.beer == beer && b.stage.in_pipeline())
        .map(|b| config.production.bottles_for(b.volume))
        .sum()
}
