//! Weekly training load with uncertainty
//!
//! Sessions are bucketed into five weeks, most recent first. The calculator
//! derives ACWR, ramp, monotony and strain from those buckets for each load type.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::TrainingSession;
use crate::uncertainty::UncertaintyRange;

/// Number of weekly buckets the calculator works over: current + 4 prior
pub const LOAD_WEEKS: usize = 5;

/// Load calculation and high-load detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Week-over-week ramp above which a sport counts as ramping up
    pub ramp_factor: f64,

    /// Session RPE a session must exceed to count as high load
    pub high_load_min_session_rpe: f64,

    /// Weekly workouts assumed when the athlete has not set a target
    pub default_expected_weekly_workouts: u32,

    /// z value of the standard-error band around partial weeks
    pub standard_error_z: f64,

    /// Strain z-score above which a week counts as a spike
    pub strain_spike_threshold: f64,

    pub monotony_ideal: f64,

    pub monotony_concerning: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            ramp_factor: 1.1,
            high_load_min_session_rpe: 4.0,
            default_expected_weekly_workouts: 5,
            standard_error_z: 1.96,
            strain_spike_threshold: 1.2,
            monotony_ideal: 1.5,
            monotony_concerning: 2.0,
        }
    }
}

/// Which load measure a metric was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    Rpe,
    Power,
}

impl LoadType {
    pub const ALL: [LoadType; 2] = [LoadType::Rpe, LoadType::Power];
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadType::Rpe => write!(f, "rpe"),
            LoadType::Power => write!(f, "power"),
        }
    }
}

/// Load inputs of a single session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLoad {
    pub rpe_load: UncertaintyRange,
    pub power_load: UncertaintyRange,
    pub session_rpe: UncertaintyRange,
}

impl SessionLoad {
    pub fn from_session(session: &TrainingSession) -> Self {
        let range = |value: Option<f64>| {
            value.map_or_else(UncertaintyRange::insufficient, UncertaintyRange::observed)
        };
        SessionLoad {
            rpe_load: range(session.rpe_load()),
            power_load: range(session.power_load),
            session_rpe: range(session.session_rpe),
        }
    }

    pub fn load(&self, load_type: LoadType) -> &UncertaintyRange {
        match load_type {
            LoadType::Rpe => &self.rpe_load,
            LoadType::Power => &self.power_load,
        }
    }
}

/// The sessions of one week
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyLoadBucket {
    /// First day of the week, as the caller defines week boundaries
    pub week_start: Option<NaiveDate>,

    pub sessions: Vec<SessionLoad>,
}

impl WeeklyLoadBucket {
    pub fn new(week_start: Option<NaiveDate>, sessions: Vec<SessionLoad>) -> Self {
        WeeklyLoadBucket { week_start, sessions }
    }

    /// Bucket the sessions that count toward load
    pub fn from_sessions(week_start: Option<NaiveDate>, sessions: &[TrainingSession]) -> Self {
        let sessions = sessions
            .iter()
            .filter(|session| session.kind.counts_toward_load())
            .map(SessionLoad::from_session)
            .collect();
        WeeklyLoadBucket { week_start, sessions }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Session loads that carry at least one populated field
    pub fn load_values(&self, load_type: LoadType) -> Vec<UncertaintyRange> {
        self.sessions
            .iter()
            .map(|session| session.load(load_type))
            .filter(|range| !range.is_empty())
            .cloned()
            .collect()
    }

    pub fn rpe_values(&self) -> Vec<UncertaintyRange> {
        self.sessions
            .iter()
            .map(|session| &session.session_rpe)
            .filter(|range| !range.is_empty())
            .cloned()
            .collect()
    }

    /// Weekly total; sessions without this load type mark it insufficient
    pub fn weekly_sum(&self, load_type: LoadType) -> UncertaintyRange {
        let values = self.load_values(load_type);
        let mut sum = UncertaintyRange::sum(&values);
        if values.len() < self.sessions.len() {
            sum.insufficient_data = true;
        }
        sum
    }
}

/// Five weekly buckets, most recent first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WeeklyLoadBucket>", into = "Vec<WeeklyLoadBucket>")]
pub struct LoadHistory {
    weeks: Vec<WeeklyLoadBucket>,
}

impl LoadHistory {
    pub fn current(&self) -> &WeeklyLoadBucket {
        &self.weeks[0]
    }

    /// Week `n` before the current one, 1..=4
    pub fn previous(&self, n: usize) -> &WeeklyLoadBucket {
        &self.weeks[n.clamp(1, LOAD_WEEKS - 1)]
    }

    pub fn weeks(&self) -> &[WeeklyLoadBucket] {
        &self.weeks
    }

    /// An all-empty history
    pub fn empty() -> Self {
        LoadHistory {
            weeks: vec![WeeklyLoadBucket::default(); LOAD_WEEKS],
        }
    }
}

impl TryFrom<Vec<WeeklyLoadBucket>> for LoadHistory {
    type Error = ValidationError;

    fn try_from(weeks: Vec<WeeklyLoadBucket>) -> Result<Self, Self::Error> {
        if weeks.len() != LOAD_WEEKS {
            return Err(ValidationError::WeekCount(weeks.len()));
        }
        Ok(LoadHistory { weeks })
    }
}

impl From<LoadHistory> for Vec<WeeklyLoadBucket> {
    fn from(history: LoadHistory) -> Self {
        history.weeks
    }
}

/// Monotony interpretation bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonotonyInterpretation {
    Ideal,
    Elevated,
    Concerning,
}

impl MonotonyInterpretation {
    /// Band for the observed monotony, if there is one
    pub fn from_monotony(monotony: &UncertaintyRange, config: &LoadConfig) -> Option<Self> {
        let value = monotony.observed?;
        Some(if value < config.monotony_ideal {
            MonotonyInterpretation::Ideal
        } else if value <= config.monotony_concerning {
            MonotonyInterpretation::Elevated
        } else {
            MonotonyInterpretation::Concerning
        })
    }

    pub fn description(&self) -> &'static str {
        match self {
            MonotonyInterpretation::Ideal => "Varied loading",
            MonotonyInterpretation::Elevated => "Loading is becoming repetitive",
            MonotonyInterpretation::Concerning => "Repetitive loading with little variation",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            MonotonyInterpretation::Ideal => "Keep alternating hard and easy days",
            MonotonyInterpretation::Elevated => "Add an easier day to break up the week",
            MonotonyInterpretation::Concerning => {
                "Vary session intensity; monotonous weeks raise overreaching risk"
            }
        }
    }
}

/// Current-week strain as a z-score against the five-week strain history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrainSpike(pub UncertaintyRange);

impl StrainSpike {
    pub fn is_spike(&self, threshold: f64) -> bool {
        self.0.observed.map_or(false, |z| z > threshold)
    }
}

/// Derived metrics for one load type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadMetrics {
    pub load_type: LoadType,

    /// Current week total
    pub current_week: UncertaintyRange,

    /// Mean of the four prior weekly totals
    pub chronic_average: UncertaintyRange,

    /// Acute:chronic workload ratio
    pub acwr: UncertaintyRange,

    /// Current week over previous week
    pub ramp: UncertaintyRange,

    /// Current week minus previous week
    pub freshness: UncertaintyRange,

    pub monotony: UncertaintyRange,

    pub strain: UncertaintyRange,

    pub strain_spike: StrainSpike,

    pub average_session_load: UncertaintyRange,

    pub monotony_interpretation: Option<MonotonyInterpretation>,

    /// Strain spike above the configured threshold
    pub overreaching: bool,
}

/// Metrics for every load type plus the load-independent averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub metrics: Vec<TrainingLoadMetrics>,
    pub average_session_rpe: UncertaintyRange,
    pub average_sessions_per_week: UncertaintyRange,
}

impl LoadSummary {
    pub fn for_type(&self, load_type: LoadType) -> Option<&TrainingLoadMetrics> {
        self.metrics.iter().find(|metrics| metrics.load_type == load_type)
    }
}

/// Acute/chronic training load calculator
#[derive(Debug, Clone, Default)]
pub struct TrainingLoadCalculator {
    config: LoadConfig,
}

impl TrainingLoadCalculator {
    pub fn new() -> Self {
        TrainingLoadCalculator {
            config: LoadConfig::default(),
        }
    }

    pub fn with_config(config: LoadConfig) -> Self {
        TrainingLoadCalculator { config }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Weekly totals, most recent first
    pub fn weekly_sums(&self, history: &LoadHistory, load_type: LoadType) -> Vec<UncertaintyRange> {
        history
            .weeks()
            .iter()
            .map(|week| week.weekly_sum(load_type))
            .collect()
    }

    /// Mean of the four prior weekly totals
    pub fn chronic_average(&self, history: &LoadHistory, load_type: LoadType) -> UncertaintyRange {
        let sums = self.weekly_sums(history, load_type);
        UncertaintyRange::average(&sums[1..])
    }

    pub fn acwr(&self, history: &LoadHistory, load_type: LoadType) -> UncertaintyRange {
        let current = history.current().weekly_sum(load_type);
        let chronic = self.chronic_average(history, load_type);
        &current / &chronic
    }

    pub fn ramp(&self, history: &LoadHistory, load_type: LoadType) -> UncertaintyRange {
        let current = history.current().weekly_sum(load_type);
        let previous = history.previous(1).weekly_sum(load_type);
        &current / &previous
    }

    pub fn freshness(&self, history: &LoadHistory, load_type: LoadType) -> UncertaintyRange {
        let current = history.current().weekly_sum(load_type);
        let previous = history.previous(1).weekly_sum(load_type);
        &current - &previous
    }

    /// Mean over standard deviation; unset where the spread is zero
    pub fn monotony(values: &[UncertaintyRange]) -> UncertaintyRange {
        let average = UncertaintyRange::average(values);
        let stddev = UncertaintyRange::stddev(values);
        &average / &stddev
    }

    /// Total times monotony
    pub fn strain(values: &[UncertaintyRange]) -> UncertaintyRange {
        let total = UncertaintyRange::sum(values);
        let monotony = Self::monotony(values);
        &total * &monotony
    }

    pub fn strain_spike(&self, history: &LoadHistory, load_type: LoadType) -> StrainSpike {
        let strains: Vec<UncertaintyRange> = history
            .weeks()
            .iter()
            .map(|week| Self::strain(&week.load_values(load_type)))
            .collect();

        let mean = UncertaintyRange::average(&strains);
        let stddev = UncertaintyRange::stddev(&strains);
        let deviation = &strains[0] - &mean;
        StrainSpike(&deviation / &stddev)
    }

    fn recent_values(
        history: &LoadHistory,
        values: impl Fn(&WeeklyLoadBucket) -> Vec<UncertaintyRange>,
    ) -> Vec<UncertaintyRange> {
        let mut combined = values(history.current());
        combined.extend(values(history.previous(1)));
        if history.current().session_count() <= 1 {
            combined.extend(values(history.previous(2)));
        }
        combined
    }

    /// Mean session load over the last two weeks, three when this week is thin
    pub fn average_session_load(&self, history: &LoadHistory, load_type: LoadType) -> UncertaintyRange {
        let values = Self::recent_values(history, |week| week.load_values(load_type));
        UncertaintyRange::average(&values)
    }

    pub fn average_session_rpe(&self, history: &LoadHistory) -> UncertaintyRange {
        let values = Self::recent_values(history, WeeklyLoadBucket::rpe_values);
        UncertaintyRange::average(&values)
    }

    /// Sessions per week, ignoring empty weeks before the athlete started logging
    ///
    /// Observed is the mean weekly count; the bounds are the quietest and
    /// busiest counted weeks.
    pub fn average_sessions_per_week(&self, history: &LoadHistory) -> UncertaintyRange {
        let mut counts = Vec::with_capacity(LOAD_WEEKS - 1);
        let mut started = false;
        for n in (2..LOAD_WEEKS).rev() {
            let count = history.previous(n).session_count();
            if count > 0 {
                started = true;
            }
            if started {
                counts.push(count as f64);
            }
        }
        counts.push(history.previous(1).session_count() as f64);

        let total: f64 = counts.iter().sum();
        let lowest = counts.iter().copied().fold(f64::INFINITY, f64::min);
        let highest = counts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        UncertaintyRange::bounded(lowest, total / counts.len() as f64, highest)
    }

    /// All metrics for one load type
    pub fn calculate(&self, history: &LoadHistory, load_type: LoadType) -> TrainingLoadMetrics {
        let current_values = history.current().load_values(load_type);
        let monotony = Self::monotony(&current_values);
        let strain_spike = self.strain_spike(history, load_type);
        let overreaching = strain_spike.is_spike(self.config.strain_spike_threshold);

        let metrics = TrainingLoadMetrics {
            load_type,
            current_week: history.current().weekly_sum(load_type),
            chronic_average: self.chronic_average(history, load_type),
            acwr: self.acwr(history, load_type),
            ramp: self.ramp(history, load_type),
            freshness: self.freshness(history, load_type),
            monotony_interpretation: MonotonyInterpretation::from_monotony(&monotony, &self.config),
            strain: Self::strain(&current_values),
            monotony,
            strain_spike,
            average_session_load: self.average_session_load(history, load_type),
            overreaching,
        };

        debug!(
            load_type = %load_type,
            acwr = ?metrics.acwr.observed,
            ramp = ?metrics.ramp.observed,
            overreaching,
            "training load metrics"
        );
        metrics
    }

    /// Metrics for every load type
    pub fn summarize(&self, history: &LoadHistory) -> LoadSummary {
        LoadSummary {
            metrics: LoadType::ALL
                .iter()
                .map(|&load_type| self.calculate(history, load_type))
                .collect(),
            average_session_rpe: self.average_session_rpe(history),
            average_sessions_per_week: self.average_sessions_per_week(history),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_bucket(loads: &[f64]) -> WeeklyLoadBucket {
        let sessions = loads
            .iter()
            .map(|&load| SessionLoad {
                rpe_load: UncertaintyRange::observed(load),
                power_load: UncertaintyRange::insufficient(),
                session_rpe: UncertaintyRange::observed(load / 60.0),
            })
            .collect();
        WeeklyLoadBucket::new(None, sessions)
    }

    fn create_test_history(weeks: [&[f64]; 5]) -> LoadHistory {
        LoadHistory::try_from(weeks.iter().map(|loads| create_test_bucket(loads)).collect::<Vec<_>>())
            .unwrap()
    }

    #[test]
    fn test_history_requires_five_weeks() {
        let result = LoadHistory::try_from(vec![WeeklyLoadBucket::default(); 3]);
        assert_eq!(result, Err(ValidationError::WeekCount(3)));
    }

    #[test]
    fn test_weekly_ratios() {
        let calculator = TrainingLoadCalculator::new();
        let history = create_test_history([&[300.0, 300.0], &[200.0, 200.0], &[200.0], &[300.0], &[100.0]]);

        assert_eq!(calculator.chronic_average(&history, LoadType::Rpe).observed, Some(250.0));
        assert_eq!(calculator.acwr(&history, LoadType::Rpe).observed, Some(2.4));
        assert_eq!(calculator.ramp(&history, LoadType::Rpe).observed, Some(1.5));
        assert_eq!(calculator.freshness(&history, LoadType::Rpe).observed, Some(200.0));
    }

    #[test]
    fn test_empty_previous_week_guards_ramp() {
        let calculator = TrainingLoadCalculator::new();
        let history = create_test_history([&[300.0], &[], &[], &[], &[]]);

        let ramp = calculator.ramp(&history, LoadType::Rpe);
        assert_eq!(ramp.observed, None);
        assert_eq!(calculator.freshness(&history, LoadType::Rpe).observed, Some(300.0));
    }

    #[test]
    fn test_power_missing_marks_insufficient() {
        let bucket = create_test_bucket(&[100.0, 200.0]);
        let sum = bucket.weekly_sum(LoadType::Power);
        assert!(sum.insufficient_data);
        assert_eq!(sum.observed, Some(0.0));
    }

    #[test]
    fn test_monotony_of_flat_loads_is_unset() {
        let values = vec![UncertaintyRange::observed(100.0); 5];
        let monotony = TrainingLoadCalculator::monotony(&values);
        assert_eq!(monotony.observed, None);
        assert_eq!(TrainingLoadCalculator::strain(&values).observed, None);
    }

    #[test]
    fn test_monotony_and_strain() {
        let values: Vec<UncertaintyRange> = [100.0, 200.0, 300.0]
            .iter()
            .map(|&v| UncertaintyRange::observed(v))
            .collect();
        let monotony = TrainingLoadCalculator::monotony(&values).observed.unwrap();
        // population stddev of 100/200/300 is 81.65
        assert!((monotony - 200.0 / 81.649_658).abs() < 1e-4);

        let strain = TrainingLoadCalculator::strain(&values).observed.unwrap();
        assert!((strain - 600.0 * monotony).abs() < 1e-9);

        let config = LoadConfig::default();
        let band = MonotonyInterpretation::from_monotony(&UncertaintyRange::observed(monotony), &config);
        assert_eq!(band, Some(MonotonyInterpretation::Concerning));
    }

    #[test]
    fn test_strain_spike_flags_heavy_week() {
        let calculator = TrainingLoadCalculator::new();
        let history = create_test_history([
            &[600.0, 600.0, 610.0],
            &[200.0, 250.0, 300.0],
            &[200.0, 260.0, 300.0],
            &[210.0, 250.0, 300.0],
            &[200.0, 250.0, 320.0],
        ]);

        let spike = calculator.strain_spike(&history, LoadType::Rpe);
        assert!(spike.is_spike(1.2));
        assert!(calculator.calculate(&history, LoadType::Rpe).overreaching);
    }

    #[test]
    fn test_average_session_load_fallback() {
        let calculator = TrainingLoadCalculator::new();

        let busy = create_test_history([&[100.0, 300.0], &[200.0], &[900.0], &[], &[]]);
        assert_eq!(calculator.average_session_load(&busy, LoadType::Rpe).observed, Some(200.0));

        let thin = create_test_history([&[100.0], &[200.0], &[900.0], &[], &[]]);
        assert_eq!(calculator.average_session_load(&thin, LoadType::Rpe).observed, Some(400.0));
    }

    #[test]
    fn test_average_sessions_per_week_skips_leading_empty_weeks() {
        let calculator = TrainingLoadCalculator::new();

        let history = create_test_history([&[100.0], &[100.0, 100.0], &[], &[100.0; 4], &[]]);
        let average = calculator.average_sessions_per_week(&history);
        assert_eq!(average.observed, Some(2.0));
        assert_eq!(average.lower, Some(0.0));
        assert_eq!(average.upper, Some(4.0));

        let new_athlete = create_test_history([&[100.0], &[], &[], &[], &[]]);
        assert_eq!(calculator.average_sessions_per_week(&new_athlete).observed, Some(0.0));
    }

    #[test]
    fn test_summary_covers_both_load_types() {
        let calculator = TrainingLoadCalculator::new();
        let history = create_test_history([&[300.0], &[200.0], &[200.0], &[200.0], &[200.0]]);
        let summary = calculator.summarize(&history);

        assert_eq!(summary.metrics.len(), 2);
        assert_eq!(summary.for_type(LoadType::Rpe).unwrap().ramp.observed, Some(1.5));
        assert!(summary.for_type(LoadType::Power).unwrap().current_week.insufficient_data);
    }
}
