use chrono::{DateTime, Duration, TimeZone, Utc};
use soreness_risk::historic_soreness::HistoricSorenessStatus;
use soreness_risk::processing::{AthleteDayInput, AthleteDayOutput, DailyRiskProcessor};
use soreness_risk::soreness::{QualitativeFlags, SorenessReport};
use soreness_risk::{
    EngineConfig, SessionKind, SorenessCause, SportName, TrainingLoadCalculator, TrainingSession,
    TriggerType, UncertaintyRange,
};
use tempfile::TempDir;

/// End-to-end tests of the daily pass over several simulated days

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 19, 0, 0).unwrap() + Duration::days(n - 1)
    }

    fn create_test_knee_pain(n: i64) -> SorenessReport {
        SorenessReport {
            body_part: 7,
            side: 2,
            pain: true,
            severity: Some(3.0),
            movement: None,
            flags: QualitativeFlags::default(),
            reported_at: day(n) - Duration::hours(11),
        }
    }

    fn create_test_session(n: i64, sport: SportName, rpe: f64) -> TrainingSession {
        TrainingSession {
            id: format!("{:?}-day-{}", sport, n),
            kind: SessionKind::Practice,
            sport_name: sport,
            event_date: day(n) - Duration::hours(2),
            duration_minutes: Some(75.0),
            session_rpe: Some(rpe),
            power_load: None,
        }
    }

    /// Run one day, carrying state, eligibility and persisted triggers from the previous output
    fn run_day(
        processor: &DailyRiskProcessor,
        previous: Option<&AthleteDayOutput>,
        n: i64,
        reports: Vec<SorenessReport>,
        sessions: Vec<TrainingSession>,
    ) -> AthleteDayOutput {
        let mut input = AthleteDayInput::new(day(n));
        if let Some(previous) = previous {
            input.historic_soreness = previous.historic_soreness.clone();
            input.triggers = previous.persisted_triggers.clone();
            input.previously_eligible = previous.high_load.eligible;
        }
        input.soreness_reports = reports;
        input.sessions = sessions;
        processor.process(input)
    }

    fn trigger_types(output: &AthleteDayOutput) -> Vec<TriggerType> {
        output
            .persisted_triggers
            .iter()
            .map(|trigger| trigger.trigger_type)
            .collect()
    }

    /// Fourteen days of right knee pain moves the cause from overloading to weakness
    #[test]
    fn test_two_weeks_of_knee_pain() {
        let processor = DailyRiskProcessor::new();
        let mut output: Option<AthleteDayOutput> = None;

        for n in 1..=14 {
            let today = run_day(&processor, output.as_ref(), n, vec![create_test_knee_pain(n)], vec![]);
            assert_eq!(today.historic_soreness.len(), 1);

            let state = &today.historic_soreness[0];
            assert_eq!(state.streak, n as u32);
            if n < 14 {
                assert_eq!(state.cause, SorenessCause::Overloading, "day {}", n);
            } else {
                assert_eq!(state.cause, SorenessCause::Weakness);
            }
            match n {
                1 => assert_eq!(state.status, HistoricSorenessStatus::DormantCleared),
                2 => assert_eq!(state.status, HistoricSorenessStatus::AlmostAcutePain),
                _ => assert_eq!(state.status, HistoricSorenessStatus::AcutePain),
            }
            output = Some(today);
        }

        let day_15 = run_day(&processor, output.as_ref(), 15, vec![create_test_knee_pain(15)], vec![]);
        let state = &day_15.historic_soreness[0];
        assert_eq!(state.status, HistoricSorenessStatus::PersistentPain);
        assert_eq!(state.average_severity, 3.0);

        let types = trigger_types(&day_15);
        assert!(types.contains(&TriggerType::HistPainPainTodaySeverity3To5));
        assert!(types.contains(&TriggerType::HistPain));
        assert!(!types.contains(&TriggerType::NoHistPainPainTodayHighSeverity3To5));
    }

    #[test]
    fn test_first_pain_report_has_no_history() {
        let processor = DailyRiskProcessor::new();
        let output = run_day(&processor, None, 1, vec![create_test_knee_pain(1)], vec![]);

        assert_eq!(
            trigger_types(&output),
            vec![
                TriggerType::NotEnoughHistoryForHighVolumeIntensity,
                TriggerType::NoHistPainPainTodayHighSeverity3To5,
            ]
        );
    }

    /// Without a training base a hard session counts for nothing
    #[test]
    fn test_new_athlete_hard_session_is_not_high_load() {
        let processor = DailyRiskProcessor::new();
        let output = run_day(
            &processor,
            None,
            1,
            vec![create_test_knee_pain(1)],
            vec![create_test_session(1, SportName::Soccer, 9.0)],
        );

        let types = trigger_types(&output);
        assert!(!output.high_load.eligible);
        assert!(types.contains(&TriggerType::NotEnoughHistoryForHighVolumeIntensity));
        assert!(!types.contains(&TriggerType::HighVolumeIntensity));
    }

    /// Identical weekly loads have no spread, so monotony stays unset
    #[test]
    fn test_flat_weeks_leave_monotony_unset() {
        let values = vec![UncertaintyRange::observed(100.0); 5];
        let monotony = TrainingLoadCalculator::monotony(&values);
        assert_eq!(monotony.observed, None);

        let strain = TrainingLoadCalculator::strain(&values);
        assert_eq!(strain.observed, None);
    }

    /// Fire on day 1, retire on day 2, drop on day 3, recreate on day 5
    #[test]
    fn test_high_volume_trigger_lifecycle() {
        let processor = DailyRiskProcessor::new();

        let mut input = AthleteDayInput::new(day(1));
        input.sessions = vec![create_test_session(1, SportName::Soccer, 8.0)];
        input.previously_eligible = true;
        let day_1 = processor.process(input);
        assert_eq!(day_1.persisted_triggers.len(), 1);
        let fired = &day_1.persisted_triggers[0];
        assert_eq!(fired.trigger_type, TriggerType::HighVolumeIntensity);
        assert_eq!(fired.sport_name, Some(SportName::Soccer));
        assert_eq!(fired.created_at, day(1));

        let day_2 = run_day(&processor, Some(&day_1), 2, vec![], vec![]);
        assert_eq!(day_2.triggers.len(), 1);
        assert_eq!(day_2.triggers[0].deleted_at, Some(day(2)));
        assert!(day_2.persisted_triggers.is_empty());

        let day_3 = run_day(&processor, Some(&day_2), 3, vec![], vec![]);
        assert!(day_3.triggers.is_empty());

        let day_4 = run_day(&processor, Some(&day_3), 4, vec![], vec![]);
        let day_5 = run_day(
            &processor,
            Some(&day_4),
            5,
            vec![],
            vec![create_test_session(5, SportName::Soccer, 8.0)],
        );
        assert_eq!(day_5.persisted_triggers.len(), 1);
        let refired = &day_5.persisted_triggers[0];
        assert_eq!(refired.created_at, day(5));
        assert_eq!(refired.deleted_at, None);
    }

    #[test]
    fn test_output_round_trips_through_json() {
        let processor = DailyRiskProcessor::new();
        let output = run_day(
            &processor,
            None,
            1,
            vec![create_test_knee_pain(1)],
            vec![create_test_session(1, SportName::DistanceRunning, 6.0)],
        );

        let json = serde_json::to_string(&output).unwrap();
        let parsed: AthleteDayOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.historic_soreness, output.historic_soreness);
        assert_eq!(parsed.soreness, output.soreness);
        assert_eq!(parsed.persisted_triggers, output.persisted_triggers);
        assert_eq!(parsed.load.metrics.len(), 2);
    }

    #[test]
    fn test_config_file_changes_severity_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = EngineConfig::default();
        config.triggers.pain_high_severity = 4.0;
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.triggers.pain_high_severity, 4.0);

        let processor = DailyRiskProcessor::with_config(loaded);
        let output = run_day(&processor, None, 1, vec![create_test_knee_pain(1)], vec![]);
        let types = trigger_types(&output);
        assert!(types.contains(&TriggerType::NoHistPainPainTodaySeverity1And2));
        assert!(!types.contains(&TriggerType::NoHistPainPainTodayHighSeverity3To5));
    }

    #[test]
    fn test_input_document_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("day.json");

        let mut input = AthleteDayInput::new(day(1));
        input.soreness_reports = vec![create_test_knee_pain(1)];
        std::fs::write(&path, serde_json::to_string_pretty(&input).unwrap()).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        let output = DailyRiskProcessor::new().process_json(&json).unwrap();
        assert_eq!(output.historic_soreness.len(), 1);
        assert_eq!(output.rejected_reports, 0);
    }
}
