//! One athlete, one event date
//!
//! [`DailyRiskProcessor`] ties the pieces together in a fixed order: survey
//! merge, historic update, load metrics, high-load detection, historic merge
//! and finally the trigger pass.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::high_load::{HighLoadAnalysis, HighLoadDetector};
use crate::historic_soreness::{HistoricSorenessState, HistoricSorenessTracker};
use crate::models::{DatedValue, HighLoadSession, TrainingSession};
use crate::soreness::{self, SorenessAccumulator, SorenessReport, SorenessRecord};
use crate::training_load::{
    LoadHistory, LoadSummary, TrainingLoadCalculator, WeeklyLoadBucket, LOAD_WEEKS,
};
use crate::trigger::Trigger;
use crate::trigger_engine::{TriggerContext, TriggerRuleEngine};

/// Everything the caller loads for one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteDayInput {
    pub event_date: DateTime<Utc>,

    #[serde(default)]
    pub soreness_reports: Vec<SorenessReport>,

    #[serde(default)]
    pub historic_soreness: Vec<HistoricSorenessState>,

    /// Persisted triggers from the previous pass
    #[serde(default)]
    pub triggers: Vec<Trigger>,

    /// Weekly buckets, most recent first; built from `sessions` when absent
    #[serde(default)]
    pub load_history: Option<LoadHistory>,

    #[serde(default)]
    pub sessions: Vec<TrainingSession>,

    pub expected_weekly_workouts: Option<u32>,

    /// High-load eligibility carried over from earlier passes
    #[serde(default)]
    pub previously_eligible: bool,

    #[serde(default)]
    pub muscular_strain: Vec<DatedValue>,
}

impl AthleteDayInput {
    /// An input with nothing but the date set
    pub fn new(event_date: DateTime<Utc>) -> Self {
        AthleteDayInput {
            event_date,
            soreness_reports: Vec::new(),
            historic_soreness: Vec::new(),
            triggers: Vec::new(),
            load_history: None,
            sessions: Vec::new(),
            expected_weekly_workouts: None,
            previously_eligible: false,
            muscular_strain: Vec::new(),
        }
    }
}

/// Everything the pass hands back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteDayOutput {
    pub event_date: DateTime<Utc>,

    pub historic_soreness: Vec<HistoricSorenessState>,

    /// Today's records merged with carried-over history
    pub soreness: Vec<SorenessRecord>,

    /// Full working set, retired triggers included
    pub triggers: Vec<Trigger>,

    /// Triggers to feed the next pass
    pub persisted_triggers: Vec<Trigger>,

    pub load: LoadSummary,

    pub high_load: HighLoadAnalysis,

    /// Reports dropped at validation
    pub rejected_reports: usize,
}

/// Runs the daily pass with one configuration
#[derive(Debug, Clone, Default)]
pub struct DailyRiskProcessor {
    config: EngineConfig,
    tracker: HistoricSorenessTracker,
    calculator: TrainingLoadCalculator,
    detector: HighLoadDetector,
    engine: TriggerRuleEngine,
}

impl DailyRiskProcessor {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        DailyRiskProcessor {
            tracker: HistoricSorenessTracker::with_config(config.soreness.clone()),
            calculator: TrainingLoadCalculator::with_config(config.load.clone()),
            detector: HighLoadDetector::with_config(config.load.clone()),
            engine: TriggerRuleEngine::with_config(config.triggers.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse a JSON input document and process it
    pub fn process_json(&self, json: &str) -> Result<AthleteDayOutput> {
        let input: AthleteDayInput = serde_json::from_str(json)?;
        Ok(self.process(input))
    }

    #[instrument(skip_all, fields(event_date = %input.event_date))]
    pub fn process(&self, input: AthleteDayInput) -> AthleteDayOutput {
        let now = input.event_date;

        let mut accumulator = SorenessAccumulator::new();
        let recent = soreness::recent_reports(
            &input.soreness_reports,
            now,
            self.config.soreness.survey_lookback_days,
        );
        let rejected_reports = accumulator.merge_reports(recent);
        let records = accumulator.into_records();

        let mut states = input.historic_soreness;
        self.tracker
            .update_daily(&mut states, &records, &input.sessions, now);

        let history = match input.load_history {
            Some(history) => history,
            None => Self::bucket_sessions(&input.sessions, now),
        };
        let load = self.calculator.summarize(&history);

        let mut high_load =
            self.detector
                .analyze(&input.sessions, now, input.expected_weekly_workouts);
        if input.previously_eligible && !high_load.eligible {
            high_load.eligible = true;
            high_load.sessions =
                self.detector
                    .high_relative_load_sessions(&input.sessions, now, &high_load.sport_ramps);
        }

        let today = now.date_naive();
        let high_load_today: Vec<HighLoadSession> = high_load
            .sessions
            .iter()
            .filter(|session| session.date == today)
            .cloned()
            .collect();
        let sessions_today: Vec<TrainingSession> = input
            .sessions
            .iter()
            .filter(|session| session.date() == today && session.event_date <= now)
            .cloned()
            .collect();

        let merged = soreness::merge_current_historic(records, &states, now);

        let context = TriggerContext {
            now,
            eligible_for_high_load: high_load.eligible,
            high_load_sessions: &high_load_today,
            sessions: &sessions_today,
            muscular_strain: &input.muscular_strain,
            soreness: &merged,
        };
        let trigger_set = self.engine.run(input.triggers, &context);
        let persisted_triggers = trigger_set.persisted();

        info!(
            records = merged.len(),
            states = states.len(),
            triggers = persisted_triggers.len(),
            rejected = rejected_reports,
            "daily pass complete"
        );

        AthleteDayOutput {
            event_date: now,
            historic_soreness: states,
            soreness: merged,
            triggers: trigger_set.triggers,
            persisted_triggers,
            load,
            high_load,
            rejected_reports,
        }
    }

    /// Seven-day buckets ending at `now`, most recent first
    pub fn bucket_sessions(sessions: &[TrainingSession], now: DateTime<Utc>) -> LoadHistory {
        let today = now.date_naive();
        let weeks: Vec<WeeklyLoadBucket> = (0..LOAD_WEEKS as i64)
            .map(|week| {
                let week_start = today - Duration::days(7 * week + 6);
                let in_week: Vec<TrainingSession> = sessions
                    .iter()
                    .filter(|session| session.event_date <= now)
                    .filter(|session| {
                        let days_ago = (today - session.date()).num_days();
                        days_ago >= 7 * week && days_ago < 7 * (week + 1)
                    })
                    .cloned()
                    .collect();
                WeeklyLoadBucket::from_sessions(Some(week_start), &in_week)
            })
            .collect();

        LoadHistory::try_from(weeks).unwrap_or_else(|_| LoadHistory::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionKind, SportName};
    use crate::soreness::QualitativeFlags;
    use crate::trigger::TriggerType;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 7, 19, 0, 0).unwrap()
    }

    fn create_test_report(body_part: u8, pain: bool, severity: f64, hours_ago: i64) -> SorenessReport {
        SorenessReport {
            body_part,
            side: 2,
            pain,
            severity: Some(severity),
            movement: None,
            flags: QualitativeFlags::default(),
            reported_at: now() - Duration::hours(hours_ago),
        }
    }

    fn create_test_session(days_ago: i64, rpe: f64) -> TrainingSession {
        TrainingSession {
            id: format!("session-{}", days_ago),
            kind: SessionKind::Practice,
            sport_name: SportName::Soccer,
            event_date: now() - Duration::days(days_ago) - Duration::hours(3),
            duration_minutes: Some(60.0),
            session_rpe: Some(rpe),
            power_load: None,
        }
    }

    #[test]
    fn test_process_creates_state_and_triggers() {
        let processor = DailyRiskProcessor::new();
        let mut input = AthleteDayInput::new(now());
        input.soreness_reports = vec![
            create_test_report(7, true, 2.0, 1),
            create_test_report(7, true, 3.0, 2),
            create_test_report(7, true, 4.0, 80),
            create_test_report(250, false, 1.0, 1),
        ];

        let output = processor.process(input);

        assert_eq!(output.rejected_reports, 1);
        assert_eq!(output.historic_soreness.len(), 1);
        assert_eq!(output.soreness.len(), 1);
        assert_eq!(output.soreness[0].severity, 3.0);

        let types: Vec<TriggerType> = output
            .persisted_triggers
            .iter()
            .map(|trigger| trigger.trigger_type)
            .collect();
        assert_eq!(
            types,
            vec![
                TriggerType::NotEnoughHistoryForHighVolumeIntensity,
                TriggerType::NoHistPainPainTodayHighSeverity3To5,
            ]
        );
    }

    #[test]
    fn test_bucket_sessions() {
        let sessions = vec![
            create_test_session(0, 5.0),
            create_test_session(6, 5.0),
            create_test_session(7, 5.0),
            create_test_session(34, 5.0),
            create_test_session(35, 5.0),
        ];
        let history = DailyRiskProcessor::bucket_sessions(&sessions, now());

        assert_eq!(history.current().session_count(), 2);
        assert_eq!(history.previous(1).session_count(), 1);
        assert_eq!(history.previous(4).session_count(), 1);
        assert_eq!(history.current().week_start, Some(now().date_naive() - Duration::days(6)));
    }

    #[test]
    fn test_process_json_rejects_malformed_input() {
        let processor = DailyRiskProcessor::new();
        assert!(processor.process_json("{\"event_date\": 12}").is_err());

        let output = processor
            .process_json("{\"event_date\": \"2024-10-07T19:00:00Z\", \"expected_weekly_workouts\": null}")
            .unwrap();
        assert!(output.triggers.is_empty());
    }

    #[test]
    fn test_previous_eligibility_is_carried() {
        let processor = DailyRiskProcessor::new();
        let mut input = AthleteDayInput::new(now());
        input.sessions = vec![create_test_session(0, 8.0)];
        input.previously_eligible = true;

        let output = processor.process(input);
        assert!(output.high_load.eligible);
        assert_eq!(output.high_load.sessions.len(), 1);
        assert!(output
            .persisted_triggers
            .iter()
            .any(|trigger| trigger.trigger_type == TriggerType::HighVolumeIntensity));
    }

    #[test]
    fn test_hard_session_without_training_base_fires_nothing() {
        let processor = DailyRiskProcessor::new();
        let mut input = AthleteDayInput::new(now());
        input.sessions = vec![create_test_session(0, 9.0)];

        let output = processor.process(input);
        assert!(!output.high_load.eligible);
        assert!(output.persisted_triggers.is_empty());
    }
}
