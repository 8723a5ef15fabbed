//! Sales forecasting.
//!
//! A forecast compounds a beer's daily growth rate onto its anchor sales
//! figure: day `d` is day `d - 1` scaled by `1 + rate`, never below zero.
//! Day 0 is the anchor date (the last day of known sales); the sequence
//! starts at day 1.

use crate::config::{ForecastConfig, MAX_HORIZON_DAYS};
use crate::sales::DailySeries;
use crate::{BeerType, Error, Result};
use chrono::{Duration, NaiveDate};
use std::str::FromStr;

/// Sales figure substituted for an all-zero starting window, so a beer that
/// started from nothing still gets a finite growth rate
const ZERO_START_SUBSTITUTE: f64 = 1.1;

/// One projected day
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForecastPoint {
    pub day: u32,
    pub date: NaiveDate,
    pub value: f64,
}

/// Width of a forecast range query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSpan {
    Week,
    Month,
    Days(u32),
}

impl RangeSpan {
    pub fn days(self) -> u32 {
        match self {
            RangeSpan::Week => 7,
            RangeSpan::Month => 30,
            RangeSpan::Days(n) => n,
        }
    }
}

impl FromStr for RangeSpan {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "week" => Ok(RangeSpan::Week),
            "month" => Ok(RangeSpan::Month),
            other => other
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(RangeSpan::Days)
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "span must be 'week', 'month' or a number of days, got {:?}",
                        s
                    ))
                }),
        }
    }
}

/// A finite projection of daily sales
#[derive(Clone, Debug, PartialEq)]
pub struct Forecast {
    anchor: f64,
    rate: f64,
    anchor_date: NaiveDate,
    horizon: u32,
}

impl Forecast {
    /// Build a forecast of `horizon` days after `anchor_date`
    pub fn new(anchor: f64, rate: f64, anchor_date: NaiveDate, horizon: u32) -> Result<Self> {
        if !anchor.is_finite() || anchor < 0.0 {
            return Err(Error::Validation(format!(
                "anchor sales must be a non-negative number, got {}",
                anchor
            )));
        }
        if !rate.is_finite() {
            return Err(Error::Validation(format!(
                "growth rate must be finite, got {}",
                rate
            )));
        }
        if horizon == 0 || horizon > MAX_HORIZON_DAYS {
            return Err(Error::Validation(format!(
                "forecast horizon must be within 1..={} days, got {}",
                MAX_HORIZON_DAYS, horizon
            )));
        }
        Ok(Self {
            anchor,
            rate,
            anchor_date,
            horizon,
        })
    }

    /// Forecast for a beer; beers without history are anchored on `fallback`
    pub fn for_beer(beer: &BeerType, horizon: u32, fallback: NaiveDate) -> Result<Self> {
        Self::new(
            beer.base_sales,
            beer.growth_rate,
            beer.anchor_date.unwrap_or(fallback),
            horizon,
        )
    }

    pub fn anchor_date(&self) -> NaiveDate {
        self.anchor_date
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// First projected date
    pub fn first_date(&self) -> NaiveDate {
        self.anchor_date + Duration::days(1)
    }

    /// Last projected date
    pub fn last_date(&self) -> NaiveDate {
        self.anchor_date + Duration::days(self.horizon.into())
    }

    /// Lazily iterate over every projected day
    pub fn points(&self) -> ForecastIter {
        ForecastIter {
            anchor_date: self.anchor_date,
            factor: (1.0 + self.rate).max(0.0),
            value: self.anchor,
            day: 0,
            horizon: self.horizon,
        }
    }

    /// Projected value for one date inside the horizon
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        let day = self.day_of(date)?;
        self.points().nth(day as usize - 1).map(|p| p.value)
    }

    /// Projected days `[from, from + span)`
    ///
    /// The whole range must lie inside the horizon.
    pub fn range(&self, from: NaiveDate, span: RangeSpan) -> Result<Vec<ForecastPoint>> {
        let len = span.days();
        let first = self.day_of(from);
        let last = from
            .checked_add_signed(Duration::days(i64::from(len) - 1))
            .and_then(|d| self.day_of(d));

        match (first, last) {
            (Some(first), Some(_)) if len > 0 => Ok(self
                .points()
                .skip(first as usize - 1)
                .take(len as usize)
                .collect()),
            _ => Err(Error::Validation(format!(
                "{} days from {} fall outside the forecast ({} to {})",
                len,
                from,
                self.first_date(),
                self.last_date()
            ))),
        }
    }

    /// Total projected sales over `days` days starting at `from`
    pub fn total(&self, from: NaiveDate, days: u32) -> Result<f64> {
        Ok(self
            .range(from, RangeSpan::Days(days))?
            .iter()
            .map(|p| p.value)
            .sum())
    }

    fn day_of(&self, date: NaiveDate) -> Option<u32> {
        let day = (date - self.anchor_date).num_days();
        if day >= 1 && day <= i64::from(self.horizon) {
            Some(day as u32)
        } else {
            None
        }
    }
}

/// Iterator over a forecast's projected days
#[derive(Clone, Debug)]
pub struct ForecastIter {
    anchor_date: NaiveDate,
    factor: f64,
    value: f64,
    day: u32,
    horizon: u32,
}

impl Iterator for ForecastIter {
    type Item = ForecastPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.day >= self.horizon {
            return None;
        }
        self.day += 1;
        self.value = (self.value * self.factor).max(0.0);
        Some(ForecastPoint {
            day: self.day,
            date: self.anchor_date + Duration::days(self.day.into()),
            value: self.value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.horizon - self.day) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ForecastIter {}

/// Anchor and growth rate derived from a sales series
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DemandModel {
    pub base_sales: f64,
    pub growth_rate: f64,
    pub anchor_date: NaiveDate,
}

impl DemandModel {
    /// Fit a demand model to a daily series
    ///
    /// The anchor is the mean of the trailing `anchor_window_days`, which by
    /// default is just the last day's sales. The rate
    /// is the compound daily growth between the first and the last such
    /// window inside the trailing `growth_window_days`. Series too short to
    /// hold two separate windows get a flat rate.
    pub fn fit(series: &DailySeries, config: &ForecastConfig) -> Option<Self> {
        if series.is_empty() {
            return None;
        }

        let values = &series.values;
        let window = (config.anchor_window_days.max(1) as usize).min(values.len());
        let base_sales = mean(&values[values.len() - window..]);

        let span = (config.growth_window_days as usize).min(values.len());
        let growth_rate = if span >= 2 * window {
            let start = values.len() - span;
            let mut first = mean(&values[start..start + window]);
            if first == 0.0 {
                first = ZERO_START_SUBSTITUTE;
            }
            let gap = (span - window) as f64;
            ((base_sales / first).powf(1.0 / gap) - 1.0).max(-1.0)
        } else {
            0.0
        };

        Some(Self {
            base_sales,
            growth_rate,
            anchor_date: series.end(),
        })
    }

    /// Copy the model onto a beer type
    pub fn apply(&self, beer: &mut BeerType) {
        beer.base_sales = self.base_sales;
        beer.growth_rate = self.growth_rate;
        beer.anchor_date = Some(self.anchor_date);
    }
}

fn mean(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_seven_compounds() {
        let forecast = Forecast::new(100.0, 0.01, date(2019, 1, 1), 365).unwrap();
        let day7 = forecast.points().nth(6).unwrap();
        assert_eq!(day7.day, 7);
        assert_eq!(day7.date, date(2019, 1, 8));
        assert!((day7.value - 107.2135).abs() < 1e-3, "{}", day7.value);
    }

    #[test]
    fn test_zero_rate_is_flat() {
        let forecast = Forecast::new(42.0, 0.0, date(2019, 1, 1), 30).unwrap();
        assert!(forecast.points().all(|p| p.value == 42.0));
        assert_eq!(forecast.points().len(), 30);
    }

    #[test]
    fn test_never_negative_and_geometric() {
        let rates = [-1.5, -1.0, -0.5, -0.01, 0.0, 0.003, 0.2];
        let anchors = [0.0, 1.0, 37.5, 1000.0];
        for &rate in &rates {
            for &anchor in &anchors {
                let forecast = Forecast::new(anchor, rate, date(2019, 1, 1), 365).unwrap();
                let mut previous = anchor;
                for point in forecast.points() {
                    assert!(point.value >= 0.0, "rate {} anchor {}", rate, anchor);
                    let expected = (previous * (1.0 + rate)).max(0.0);
                    assert!((point.value - expected).abs() <= 1e-9 * expected.max(1.0));
                    previous = point.value;
                }
            }
        }
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(Forecast::new(-1.0, 0.0, date(2019, 1, 1), 10).is_err());
        assert!(Forecast::new(f64::NAN, 0.0, date(2019, 1, 1), 10).is_err());
        assert!(Forecast::new(1.0, f64::INFINITY, date(2019, 1, 1), 10).is_err());
        assert!(Forecast::new(1.0, 0.0, date(2019, 1, 1), 0).is_err());
        assert!(Forecast::new(1.0, 0.0, date(2019, 1, 1), 366).is_err());
    }

    #[test]
    fn test_range_queries() {
        let forecast = Forecast::new(10.0, 0.0, date(2019, 1, 1), 60).unwrap();

        let week = forecast.range(date(2019, 1, 2), RangeSpan::Week).unwrap();
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].day, 1);
        assert_eq!(week[6].date, date(2019, 1, 8));

        let month = forecast.range(date(2019, 1, 10), RangeSpan::Month).unwrap();
        assert_eq!(month.len(), 30);
        assert_eq!(month[0].date, date(2019, 1, 10));

        // Anchor day itself is not projected
        assert!(forecast.range(date(2019, 1, 1), RangeSpan::Week).is_err());
        // Runs past the horizon
        assert!(forecast.range(date(2019, 2, 25), RangeSpan::Week).is_err());

        assert_eq!(forecast.total(date(2019, 1, 2), 3).unwrap(), 30.0);
        assert_eq!(forecast.value_on(date(2019, 3, 2)), Some(10.0));
        assert_eq!(forecast.value_on(date(2019, 3, 3)), None);
    }

    #[test]
    fn test_range_span_parse() {
        assert_eq!("week".parse::<RangeSpan>().unwrap(), RangeSpan::Week);
        assert_eq!("Month".parse::<RangeSpan>().unwrap(), RangeSpan::Month);
        assert_eq!("14".parse::<RangeSpan>().unwrap(), RangeSpan::Days(14));
        assert!("0".parse::<RangeSpan>().is_err());
        assert!("fortnight".parse::<RangeSpan>().is_err());
    }

    #[test]
    fn test_fit_growing_series() {
        let config = ForecastConfig {
            anchor_window_days: 1,
            growth_window_days: 11,
            ..ForecastConfig::default()
        };
        // 100 growing to ~110.46 over 10 days = 1% per day
        let values: Vec<u32> = (0..11).map(|d| (100.0 * 1.01f64.powi(d)).round() as u32).collect();
        let series = DailySeries {
            start: date(2019, 1, 1),
            values,
        };

        let model = DemandModel::fit(&series, &config).unwrap();
        assert_eq!(model.anchor_date, date(2019, 1, 11));
        assert_eq!(model.base_sales, 110.0);
        assert!((model.growth_rate - 0.00957).abs() < 1e-3, "{}", model.growth_rate);
    }

    #[test]
    fn test_fit_anchors_on_last_day_by_default() {
        let series = DailySeries {
            start: date(2019, 1, 1),
            values: vec![4, 6, 8, 5],
        };
        let model = DemandModel::fit(&series, &ForecastConfig::default()).unwrap();
        assert_eq!(model.base_sales, 5.0);
        assert_eq!(model.anchor_date, date(2019, 1, 4));
    }

    #[test]
    fn test_fit_anchor_window_averages() {
        let config = ForecastConfig {
            anchor_window_days: 3,
            ..ForecastConfig::default()
        };
        let series = DailySeries {
            start: date(2019, 1, 1),
            values: vec![4, 6, 8],
        };
        let model = DemandModel::fit(&series, &config).unwrap();
        assert_eq!(model.base_sales, 6.0);
        // Too short for two separate windows
        assert_eq!(model.growth_rate, 0.0);
    }

    #[test]
    fn test_fit_single_day_is_flat() {
        let series = DailySeries {
            start: date(2019, 1, 1),
            values: vec![12],
        };
        let model = DemandModel::fit(&series, &ForecastConfig::default()).unwrap();
        assert_eq!(model.base_sales, 12.0);
        assert_eq!(model.growth_rate, 0.0);
    }

    #[test]
    fn test_fit_zero_start_uses_substitute() {
        let config = ForecastConfig {
            anchor_window_days: 1,
            growth_window_days: 3,
            ..ForecastConfig::default()
        };
        let series = DailySeries {
            start: date(2019, 1, 1),
            values: vec![0, 0, 11],
        };
        let model = DemandModel::fit(&series, &config).unwrap();
        // (11 / 1.1)^(1/2) - 1
        assert!((model.growth_rate - (10f64.sqrt() - 1.0)).abs() < 1e-9);

        let mut beer = BeerType::new("Organic Pilsner");
        model.apply(&mut beer);
        assert_eq!(beer.anchor_date, Some(date(2019, 1, 3)));
    }
}
