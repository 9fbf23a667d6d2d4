//! High relative load detection
//!
//! Week-over-week ramps are estimated per sport with a standard-error band for
//! partially logged weeks. A session is high load when its sport is ramping
//! up and the athlete rated it hard. Detection only runs once the athlete has
//! enough history for a ramp to mean anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::debug;

use crate::models::{HighLoadSession, SportName, TrainingSession};
use crate::training_load::LoadConfig;
use crate::uncertainty::UncertaintyRange;

/// Ramp estimate for one sport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportRamp {
    pub sport_name: SportName,
    pub ramp: UncertaintyRange,
}

/// Result of one high-load pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighLoadAnalysis {
    /// Enough recent history for high-load triggers
    pub eligible: bool,

    pub sport_ramps: Vec<SportRamp>,

    /// Flagged sessions from the last two weeks
    pub sessions: Vec<HighLoadSession>,
}

impl HighLoadAnalysis {
    pub fn ramp_for(&self, sport_name: SportName) -> Option<&UncertaintyRange> {
        self.sport_ramps
            .iter()
            .find(|ramp| ramp.sport_name == sport_name)
            .map(|ramp| &ramp.ramp)
    }
}

/// Ratio of this week's load to last week's, with bounds from partial weeks
pub fn ramp_with_uncertainty(
    expected_workouts: u32,
    current_values: &[f64],
    previous_values: &[f64],
    z: f64,
) -> UncertaintyRange {
    let current = UncertaintyRange::from_session_values(current_values, expected_workouts, z, true);
    let previous = UncertaintyRange::from_session_values(previous_values, expected_workouts, z, true);

    let ratio = |a: Option<f64>, b: Option<f64>| match (a, b) {
        (Some(a), Some(b)) if b > 0.0 => Some(a / b),
        _ => None,
    };

    let observed = ratio(current.observed, previous.observed);
    let candidates: Vec<f64> = [
        ratio(current.observed, previous.upper),
        ratio(current.upper, previous.observed),
        ratio(current.upper, previous.upper),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut ramp = UncertaintyRange::new(None, observed, None);
    ramp.insufficient_data = current.insufficient_data || previous.insufficient_data;

    let lowest = candidates.iter().copied().reduce(f64::min);
    let highest = candidates.iter().copied().reduce(f64::max);
    ramp.lower = lowest.filter(|&low| observed.map_or(true, |obs| low < obs));
    ramp.upper = highest.filter(|&high| observed.map_or(true, |obs| high > obs));
    ramp
}

/// Detects high relative load sessions for one athlete
#[derive(Debug, Clone, Default)]
pub struct HighLoadDetector {
    config: LoadConfig,
}

impl HighLoadDetector {
    pub fn new() -> Self {
        HighLoadDetector {
            config: LoadConfig::default(),
        }
    }

    pub fn with_config(config: LoadConfig) -> Self {
        HighLoadDetector { config }
    }

    /// Sessions whose calendar day lies `days_ago` before `as_of`
    fn within(
        sessions: &[TrainingSession],
        as_of: DateTime<Utc>,
        days_ago: RangeInclusive<i64>,
    ) -> Vec<&TrainingSession> {
        let today = as_of.date_naive();
        sessions
            .iter()
            .filter(|session| session.event_date <= as_of)
            .filter(|session| days_ago.contains(&(today - session.date()).num_days()))
            .collect()
    }

    /// Whether the athlete has logged enough to judge relative load
    ///
    /// Requires a training base 8-35 days back, then enough sessions in the
    /// last two weeks for the athlete's expected weekly volume.
    pub fn is_eligible(
        &self,
        sessions: &[TrainingSession],
        as_of: DateTime<Utc>,
        expected_weekly_workouts: Option<u32>,
    ) -> bool {
        if Self::within(sessions, as_of, 8..=35).is_empty() {
            return false;
        }

        let recent = Self::within(sessions, as_of, 0..=13).len();
        match expected_weekly_workouts {
            None | Some(0..=1) => recent > 1,
            Some(2..=4) => recent > 2,
            Some(_) => recent > 4,
        }
    }

    /// Ramp per sport from the last week against the week before
    pub fn sport_ramps(
        &self,
        sessions: &[TrainingSession],
        as_of: DateTime<Utc>,
        expected_weekly_workouts: Option<u32>,
    ) -> Vec<SportRamp> {
        let expected = expected_weekly_workouts
            .unwrap_or(self.config.default_expected_weekly_workouts);
        let mut by_sport: BTreeMap<SportName, (Vec<f64>, Vec<f64>)> = BTreeMap::new();

        for session in Self::within(sessions, as_of, 0..=6) {
            if let Some(load) = session.training_load() {
                by_sport.entry(session.sport_name).or_default().0.push(load);
            }
        }
        for session in Self::within(sessions, as_of, 7..=13) {
            if let Some(load) = session.training_load() {
                by_sport.entry(session.sport_name).or_default().1.push(load);
            }
        }

        by_sport
            .into_iter()
            .map(|(sport_name, (current, previous))| SportRamp {
                sport_name,
                ramp: ramp_with_uncertainty(
                    expected,
                    &current,
                    &previous,
                    self.config.standard_error_z,
                ),
            })
            .collect()
    }

    /// Hard sessions in sports that are ramping up, from the last two weeks
    pub fn high_relative_load_sessions(
        &self,
        sessions: &[TrainingSession],
        as_of: DateTime<Utc>,
        ramps: &[SportRamp],
    ) -> Vec<HighLoadSession> {
        let recent = Self::within(sessions, as_of, 0..=13);

        let mut max_load: BTreeMap<SportName, f64> = BTreeMap::new();
        for session in &recent {
            if let Some(load) = session.training_load() {
                let entry = max_load.entry(session.sport_name).or_insert(load);
                *entry = entry.max(load);
            }
        }

        let ramping = |sport_name: SportName| {
            ramps
                .iter()
                .find(|ramp| ramp.sport_name == sport_name)
                .and_then(|ramp| ramp.ramp.observed)
                .map_or(true, |observed| observed > self.config.ramp_factor)
        };

        recent
            .into_iter()
            .filter(|session| session.kind.counts_toward_load())
            .filter(|session| ramping(session.sport_name))
            .filter(|session| {
                session
                    .session_rpe
                    .map_or(false, |rpe| rpe > self.config.high_load_min_session_rpe)
            })
            .map(|session| {
                let max = max_load.get(&session.sport_name).copied();
                let percent_of_max = match (session.training_load(), max) {
                    (Some(load), Some(max)) if max > 0.0 => {
                        Some((load / max * 100.0).round() as u32)
                    }
                    _ => None,
                };
                HighLoadSession {
                    date: session.date(),
                    sport_name: session.sport_name,
                    percent_of_max,
                }
            })
            .collect()
    }

    /// Eligibility, ramps and flagged sessions in one pass
    pub fn analyze(
        &self,
        sessions: &[TrainingSession],
        as_of: DateTime<Utc>,
        expected_weekly_workouts: Option<u32>,
    ) -> HighLoadAnalysis {
        let eligible = self.is_eligible(sessions, as_of, expected_weekly_workouts);
        let sport_ramps = self.sport_ramps(sessions, as_of, expected_weekly_workouts);
        let flagged = if eligible {
            self.high_relative_load_sessions(sessions, as_of, &sport_ramps)
        } else {
            Vec::new()
        };

        debug!(
            eligible,
            sports = sport_ramps.len(),
            flagged = flagged.len(),
            "high load analysis"
        );

        HighLoadAnalysis {
            eligible,
            sport_ramps,
            sessions: flagged,
        }
    }
}
