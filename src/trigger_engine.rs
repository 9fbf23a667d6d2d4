//! Trigger rule engine
//!
//! Each pass starts from the athlete's existing triggers, fires every rule
//! that matches today's soreness and load picture, and retires whatever did
//! not fire. Retired triggers are soft-deleted so the next pass can tell
//! "never fired" from "fired before, not today".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::body_parts::expand_relations;
use crate::models::{DatedValue, HighLoadSession, SportName, TrainingSession};
use crate::soreness::SorenessRecord;
use crate::trigger::{Trigger, TriggerType};

/// Thresholds used by the trigger rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Days since first report separating recent from long-standing history
    pub historic_days_boundary: i64,

    /// Pain severity at or above which the high-severity variant fires
    pub pain_high_severity: f64,

    /// Muscular strain below this value signals overreaching
    pub muscular_strain_threshold: f64,

    /// Session RPE at or above which a session counts as high intensity
    pub high_relative_intensity_rpe: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        TriggerConfig {
            historic_days_boundary: 30,
            pain_high_severity: 3.0,
            muscular_strain_threshold: 50.0,
            high_relative_intensity_rpe: 7.0,
        }
    }
}

/// Everything the rules look at for one athlete on one day
#[derive(Debug, Clone, Copy)]
pub struct TriggerContext<'a> {
    /// Pass timestamp; every trigger touched in the pass carries it
    pub now: DateTime<Utc>,

    /// Enough history for high-load rules
    pub eligible_for_high_load: bool,

    /// Today's high relative load sessions
    pub high_load_sessions: &'a [HighLoadSession],

    /// Today's completed sessions
    pub sessions: &'a [TrainingSession],

    pub muscular_strain: &'a [DatedValue],

    /// Today's records merged with carried-over history
    pub soreness: &'a [SorenessRecord],
}

/// Outcome of a pass: the full working set, including retired triggers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerSet {
    pub triggers: Vec<Trigger>,
}

impl TriggerSet {
    /// Triggers to hand to the next pass
    pub fn persisted(&self) -> Vec<Trigger> {
        self.triggers
            .iter()
            .filter(|trigger| !trigger.is_deleted())
            .cloned()
            .collect()
    }

    pub fn active_types(&self) -> Vec<TriggerType> {
        self.triggers
            .iter()
            .filter(|trigger| !trigger.is_deleted())
            .map(|trigger| trigger.trigger_type)
            .collect()
    }

    pub fn retired(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter().filter(|trigger| trigger.is_deleted())
    }
}

/// Working set for one pass
struct TriggerPass {
    now: DateTime<Utc>,
    triggers: Vec<Trigger>,
}

impl TriggerPass {
    fn matches(
        trigger: &Trigger,
        trigger_type: TriggerType,
        soreness: Option<&SorenessRecord>,
        sport_name: Option<SportName>,
    ) -> bool {
        trigger.trigger_type == trigger_type
            && soreness.map_or(true, |soreness| {
                trigger.body_part == Some(soreness.body_part_side())
                    && trigger.pain == Some(soreness.pain)
                    && trigger.historic_status == soreness.historic_status
            })
            && sport_name.map_or(true, |sport_name| trigger.sport_name == Some(sport_name))
    }

    fn set_trigger(
        &mut self,
        trigger_type: TriggerType,
        soreness: Option<&SorenessRecord>,
        sport_name: Option<SportName>,
    ) {
        let now = self.now;

        if let Some(existing) = self
            .triggers
            .iter_mut()
            .find(|trigger| Self::matches(trigger, trigger_type, soreness, sport_name))
        {
            if existing.is_deleted() {
                info!(trigger = %trigger_type, "resurrecting trigger");
                existing.deleted_at = None;
                existing.created_at = now;
            } else {
                debug!(trigger = %trigger_type, "refreshing trigger");
            }
            existing.modified_at = now;
            if let Some(soreness) = soreness {
                existing.severity = Some(soreness.severity);
                existing.source_date = Some(soreness.reported_at);
            }
            return;
        }

        let mut trigger = Trigger::new(trigger_type, now);
        trigger.sport_name = sport_name;
        if let Some(soreness) = soreness {
            let relations = soreness.body_part.relations();
            trigger.body_part = Some(soreness.body_part_side());
            trigger.pain = Some(soreness.pain);
            trigger.historic_status = soreness.historic_status;
            trigger.severity = Some(soreness.severity);
            trigger.source_date = Some(soreness.reported_at);
            trigger.source_first_reported_at = soreness.first_reported_at;
            trigger.agonists = expand_relations(relations.agonists, soreness.side);
            trigger.antagonists = expand_relations(relations.antagonists, soreness.side);
            trigger.synergists = expand_relations(relations.synergists, soreness.side);
        }

        info!(
            trigger = %trigger_type,
            body_part = ?trigger.body_part,
            sport = ?sport_name,
            "new trigger"
        );
        self.triggers.push(trigger);
    }

    /// Soft-delete everything not touched in this pass
    fn finish(mut self) -> TriggerSet {
        let now = self.now;
        for trigger in self.triggers.iter_mut().filter(|trigger| !trigger.is_deleted()) {
            if trigger.created_at != now && trigger.modified_at != now {
                info!(trigger = %trigger.trigger_type, "retiring trigger");
                trigger.deleted_at = Some(now);
            }
        }
        TriggerSet {
            triggers: self.triggers,
        }
    }
}

/// Evaluates the trigger rules against one day's context
#[derive(Debug, Clone, Default)]
pub struct TriggerRuleEngine {
    config: TriggerConfig,
}

impl TriggerRuleEngine {
    pub fn new() -> Self {
        TriggerRuleEngine {
            config: TriggerConfig::default(),
        }
    }

    pub fn with_config(config: TriggerConfig) -> Self {
        TriggerRuleEngine { config }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Run every rule and retire what did not fire
    pub fn run(&self, existing: Vec<Trigger>, context: &TriggerContext<'_>) -> TriggerSet {
        let mut pass = TriggerPass {
            now: context.now,
            triggers: existing,
        };

        // relative load and intensity only count for athletes with enough history
        let (high_load_sessions, high_intensity): (&[HighLoadSession], Vec<&TrainingSession>) =
            if context.eligible_for_high_load {
                let high_intensity = context
                    .sessions
                    .iter()
                    .filter(|session| session.high_intensity(self.config.high_relative_intensity_rpe))
                    .collect();
                (context.high_load_sessions, high_intensity)
            } else {
                (&[], Vec::new())
            };
        let high_load = !high_load_sessions.is_empty() || !high_intensity.is_empty();

        let sports: BTreeSet<SportName> = high_load_sessions
            .iter()
            .map(|session| session.sport_name)
            .chain(high_intensity.iter().map(|session| session.sport_name))
            .collect();

        if high_load {
            for &sport_name in &sports {
                pass.set_trigger(TriggerType::HighVolumeIntensity, None, Some(sport_name));
            }
        }

        if self.muscular_strain_low(context.muscular_strain) {
            pass.set_trigger(TriggerType::OverreachingHighMuscularStrain, None, None);
        }

        for soreness in context.soreness {
            self.soreness_rules(&mut pass, soreness, context, high_load, &sports);
        }

        let set = pass.finish();
        debug!(
            active = set.active_types().len(),
            retired = set.retired().count(),
            "trigger pass complete"
        );
        set
    }

    fn muscular_strain_low(&self, values: &[DatedValue]) -> bool {
        values
            .iter()
            .max_by_key(|value| value.date)
            .map_or(false, |latest| latest.value < self.config.muscular_strain_threshold)
    }

    fn soreness_rules(
        &self,
        pass: &mut TriggerPass,
        soreness: &SorenessRecord,
        context: &TriggerContext<'_>,
        high_load: bool,
        sports: &BTreeSet<SportName>,
    ) {
        let days = soreness.days_since_first_report(context.now);
        let boundary = self.config.historic_days_boundary;
        let long_standing = days.map_or(false, |days| days >= boundary);
        let recent = days.map_or(false, |days| days < boundary);
        let has_status = soreness.historic_status.is_some();
        let persistent_soreness =
            soreness.is_persistent_soreness() || soreness.is_persistent_2_soreness();
        let persistent_pain = soreness.is_persistent_pain() || soreness.is_persistent_2_pain();

        if !soreness.is_dormant_cleared() && !soreness.pain && persistent_soreness && recent {
            pass.set_trigger(TriggerType::HistSoreLess30, Some(soreness), None);
        }

        if context.eligible_for_high_load {
            if high_load && has_status && !soreness.is_dormant_cleared() && !soreness.is_doms() {
                self.high_load_rules(pass, soreness, sports, long_standing, persistent_pain);
            }
        } else {
            pass.set_trigger(TriggerType::NotEnoughHistoryForHighVolumeIntensity, None, None);
        }

        if soreness.daily && !soreness.pain {
            let trigger_type = if soreness.is_doms() {
                TriggerType::SoreTodayDoms
            } else if persistent_soreness && recent {
                TriggerType::HistSoreLess30SoreToday
            } else if persistent_soreness && long_standing {
                TriggerType::HistSoreGreater30SoreToday
            } else {
                TriggerType::SoreToday
            };
            pass.set_trigger(trigger_type, Some(soreness), None);
        }

        let has_first_report = soreness.first_reported_at.is_some();

        if has_status && has_first_report && soreness.has_historic_pain() {
            pass.set_trigger(TriggerType::HistPain, Some(soreness), None);
        }

        if has_status && has_first_report && !soreness.is_dormant_cleared() && !soreness.is_doms() {
            if !soreness.pain && long_standing {
                pass.set_trigger(TriggerType::HistSoreGreater30, Some(soreness), None);
            } else if persistent_pain && !soreness.daily {
                let trigger_type = if recent {
                    TriggerType::PersPers2PainLess30NoPainToday
                } else {
                    TriggerType::PersPers2PainGreater30NoPainToday
                };
                pass.set_trigger(trigger_type, Some(soreness), None);
            }
        }

        if soreness.daily && soreness.pain {
            let historic_pain = soreness.has_historic_pain();
            let mild = soreness.severity < self.config.pain_high_severity;
            let trigger_type = match (mild, historic_pain) {
                (true, false) => TriggerType::NoHistPainPainTodaySeverity1And2,
                (true, true) => TriggerType::HistPainPainTodaySeverity1And2,
                (false, false) => TriggerType::NoHistPainPainTodayHighSeverity3To5,
                (false, true) => TriggerType::HistPainPainTodaySeverity3To5,
            };
            pass.set_trigger(trigger_type, Some(soreness), None);
        }
    }

    fn high_load_rules(
        &self,
        pass: &mut TriggerPass,
        soreness: &SorenessRecord,
        sports: &BTreeSet<SportName>,
        long_standing: bool,
        persistent_pain: bool,
    ) {
        if soreness.daily && !soreness.pain && long_standing {
            for &sport_name in sports {
                pass.set_trigger(
                    TriggerType::HistSoreGreater30HighVolumeIntensity,
                    Some(soreness),
                    Some(sport_name),
                );
            }
        } else if soreness.daily && soreness.pain {
            for &sport_name in sports {
                pass.set_trigger(
                    TriggerType::HistPainHighVolumeIntensity,
                    Some(soreness),
                    Some(sport_name),
                );
            }
        } else if !soreness.daily && !soreness.pain && long_standing {
            pass.set_trigger(
                TriggerType::HistSoreGreater30NoSoreTodayHighVolumeIntensity,
                Some(soreness),
                None,
            );
        } else if !soreness.daily && soreness.pain {
            if soreness.is_acute_pain() {
                pass.set_trigger(
                    TriggerType::AcutePainNoPainTodayHighVolumeIntensity,
                    Some(soreness),
                    None,
                );
            } else if persistent_pain {
                pass.set_trigger(
                    TriggerType::PersPers2PainNoPainSoreTodayHighVolumeIntensity,
                    Some(soreness),
                    None,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body_parts::{BodyPartLocation, BodyPartSide, Side};
    use crate::historic_soreness::HistoricSorenessStatus;
    use crate::models::SessionKind;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 6, 0, 0).unwrap()
    }

    fn create_test_soreness(
        pain: bool,
        daily: bool,
        status: Option<HistoricSorenessStatus>,
        days_since_first: Option<i64>,
    ) -> SorenessRecord {
        let mut record = SorenessRecord::new(BodyPartLocation::Quads, Side::Left, pain, 2.0, now());
        record.daily = daily;
        record.historic_status = status;
        record.first_reported_at = days_since_first.map(|days| now() - Duration::days(days));
        record
    }

    fn create_test_game(rpe: f64) -> TrainingSession {
        TrainingSession {
            id: "game".to_string(),
            kind: SessionKind::Game,
            sport_name: SportName::Basketball,
            event_date: now() - Duration::hours(12),
            duration_minutes: Some(48.0),
            session_rpe: Some(rpe),
            power_load: None,
        }
    }

    fn high_load_today() -> Vec<HighLoadSession> {
        vec![HighLoadSession {
            date: now().date_naive(),
            sport_name: SportName::Soccer,
            percent_of_max: Some(100),
        }]
    }

    fn run(
        soreness: &[SorenessRecord],
        high_load: &[HighLoadSession],
        eligible: bool,
    ) -> Vec<TriggerType> {
        let engine = TriggerRuleEngine::new();
        let context = TriggerContext {
            now: now(),
            eligible_for_high_load: eligible,
            high_load_sessions: high_load,
            sessions: &[],
            muscular_strain: &[],
            soreness,
        };
        engine.run(Vec::new(), &context).active_types()
    }

    #[test]
    fn test_daily_soreness_variants() {
        let plain = create_test_soreness(false, true, None, None);
        assert_eq!(run(&[plain], &[], true), vec![TriggerType::SoreToday]);

        let doms = create_test_soreness(false, true, Some(HistoricSorenessStatus::Doms), Some(1));
        assert_eq!(run(&[doms], &[], true), vec![TriggerType::SoreTodayDoms]);

        let recent = create_test_soreness(
            false,
            true,
            Some(HistoricSorenessStatus::PersistentSoreness),
            Some(10),
        );
        assert_eq!(
            run(&[recent], &[], true),
            vec![TriggerType::HistSoreLess30, TriggerType::HistSoreLess30SoreToday]
        );

        let old = create_test_soreness(
            false,
            true,
            Some(HistoricSorenessStatus::Persistent2Soreness),
            Some(45),
        );
        assert_eq!(
            run(&[old], &[], true),
            vec![TriggerType::HistSoreGreater30SoreToday, TriggerType::HistSoreGreater30]
        );
    }

    #[test]
    fn test_daily_pain_severity_split() {
        let mut mild = create_test_soreness(true, true, None, None);
        mild.severity = 2.5;
        assert_eq!(run(&[mild], &[], true), vec![TriggerType::NoHistPainPainTodaySeverity1And2]);

        let mut severe =
            create_test_soreness(true, true, Some(HistoricSorenessStatus::AcutePain), Some(3));
        severe.severity = 3.0;
        assert_eq!(
            run(&[severe], &[], true),
            vec![TriggerType::HistPain, TriggerType::HistPainPainTodaySeverity3To5]
        );
    }

    #[test]
    fn test_historic_pain_not_reported_today() {
        let recent = create_test_soreness(
            true,
            false,
            Some(HistoricSorenessStatus::PersistentPain),
            Some(12),
        );
        assert_eq!(
            run(&[recent], &[], true),
            vec![TriggerType::HistPain, TriggerType::PersPers2PainLess30NoPainToday]
        );

        let old = create_test_soreness(
            true,
            false,
            Some(HistoricSorenessStatus::Persistent2Pain),
            Some(40),
        );
        assert_eq!(
            run(&[old], &[], true),
            vec![TriggerType::HistPain, TriggerType::PersPers2PainGreater30NoPainToday]
        );
    }

    #[test]
    fn test_high_load_with_long_standing_soreness() {
        let soreness = create_test_soreness(
            false,
            true,
            Some(HistoricSorenessStatus::PersistentSoreness),
            Some(30),
        );
        let types = run(&[soreness], &high_load_today(), true);

        assert!(types.contains(&TriggerType::HighVolumeIntensity));
        assert!(types.contains(&TriggerType::HistSoreGreater30HighVolumeIntensity));
        assert!(types.contains(&TriggerType::HistSoreGreater30SoreToday));
        assert!(types.contains(&TriggerType::HistSoreGreater30));
    }

    #[test]
    fn test_high_load_with_acute_pain_not_reported_today() {
        let soreness = create_test_soreness(
            true,
            false,
            Some(HistoricSorenessStatus::AcutePain),
            Some(5),
        );
        let types = run(&[soreness], &high_load_today(), true);
        assert!(types.contains(&TriggerType::AcutePainNoPainTodayHighVolumeIntensity));
        assert!(!types.contains(&TriggerType::PersPers2PainNoPainSoreTodayHighVolumeIntensity));
    }

    #[test]
    fn test_ineligible_athlete_gets_history_trigger_without_load() {
        let first = create_test_soreness(false, true, None, None);
        let mut second = create_test_soreness(true, true, None, None);
        second.body_part = BodyPartLocation::Knee;
        let types = run(&[first, second], &[], false);

        let count = types
            .iter()
            .filter(|&&t| t == TriggerType::NotEnoughHistoryForHighVolumeIntensity)
            .count();
        assert_eq!(count, 1);
        assert!(types.contains(&TriggerType::SoreToday));
    }

    #[test]
    fn test_ineligible_athlete_ignores_high_load() {
        let pain = create_test_soreness(true, true, Some(HistoricSorenessStatus::AcutePain), Some(4));
        let types = run(&[pain], &high_load_today(), false);

        assert!(types.contains(&TriggerType::NotEnoughHistoryForHighVolumeIntensity));
        assert!(!types.contains(&TriggerType::HighVolumeIntensity));
        assert!(!types.contains(&TriggerType::HistPainHighVolumeIntensity));

        assert!(run(&[], &high_load_today(), false).is_empty());
    }

    #[test]
    fn test_ineligible_athlete_ignores_high_intensity_session() {
        let engine = TriggerRuleEngine::new();
        let session = create_test_game(9.0);
        let context = TriggerContext {
            now: now(),
            eligible_for_high_load: false,
            high_load_sessions: &[],
            sessions: std::slice::from_ref(&session),
            muscular_strain: &[],
            soreness: &[],
        };
        assert!(engine.run(Vec::new(), &context).triggers.is_empty());
    }

    #[test]
    fn test_eligible_athlete_never_gets_history_trigger() {
        let soreness = create_test_soreness(false, true, None, None);
        assert!(!run(&[soreness], &[], true)
            .contains(&TriggerType::NotEnoughHistoryForHighVolumeIntensity));
    }

    #[test]
    fn test_high_intensity_session_fires_for_its_sport() {
        let engine = TriggerRuleEngine::new();
        let session = create_test_game(9.0);
        let context = TriggerContext {
            now: now(),
            eligible_for_high_load: true,
            high_load_sessions: &[],
            sessions: std::slice::from_ref(&session),
            muscular_strain: &[],
            soreness: &[],
        };
        let set = engine.run(Vec::new(), &context);

        assert_eq!(set.triggers.len(), 1);
        assert_eq!(set.triggers[0].sport_name, Some(SportName::Basketball));
    }

    #[test]
    fn test_muscular_strain_uses_latest_value() {
        let engine = TriggerRuleEngine::new();
        let day = |d| NaiveDate::from_ymd_opt(2024, 9, d).unwrap();
        let strain = [
            DatedValue { date: day(2), value: 40.0 },
            DatedValue { date: day(1), value: 80.0 },
        ];
        let context = TriggerContext {
            now: now(),
            eligible_for_high_load: true,
            high_load_sessions: &[],
            sessions: &[],
            muscular_strain: &strain,
            soreness: &[],
        };
        assert_eq!(
            engine.run(Vec::new(), &context).active_types(),
            vec![TriggerType::OverreachingHighMuscularStrain]
        );
    }

    #[test]
    fn test_new_trigger_expands_relations() {
        let soreness = create_test_soreness(
            false,
            false,
            Some(HistoricSorenessStatus::PersistentSoreness),
            Some(35),
        );
        let engine = TriggerRuleEngine::new();
        let records = [soreness];
        let context = TriggerContext {
            now: now(),
            eligible_for_high_load: true,
            high_load_sessions: &[],
            sessions: &[],
            muscular_strain: &[],
            soreness: &records,
        };
        let set = engine.run(Vec::new(), &context);
        let trigger = &set.triggers[0];

        assert_eq!(trigger.trigger_type, TriggerType::HistSoreGreater30);
        assert_eq!(trigger.body_part, Some(BodyPartSide::new(BodyPartLocation::Quads, Side::Left)));
        assert!(trigger.antagonists.iter().all(|part| part.side != Side::Right));
        assert_eq!(trigger.source_first_reported_at, Some(now() - Duration::days(35)));
    }

    #[test]
    fn test_lifecycle_retire_and_resurrect() {
        fn context(at: DateTime<Utc>, high_load: &[HighLoadSession]) -> TriggerContext<'_> {
            TriggerContext {
                now: at,
                eligible_for_high_load: true,
                high_load_sessions: high_load,
                sessions: &[],
                muscular_strain: &[],
                soreness: &[],
            }
        }

        let engine = TriggerRuleEngine::new();
        let high_load = high_load_today();

        let day1 = engine.run(Vec::new(), &context(now(), &high_load));
        assert_eq!(day1.persisted().len(), 1);

        let day2_at = now() + Duration::days(1);
        let day2 = engine.run(day1.persisted(), &context(day2_at, &[]));
        assert_eq!(day2.triggers[0].deleted_at, Some(day2_at));
        assert!(day2.persisted().is_empty());

        // caller kept the retired trigger in its working set
        let day3_at = now() + Duration::days(2);
        let day3 = engine.run(day2.triggers.clone(), &context(day3_at, &high_load));
        assert_eq!(day3.triggers.len(), 1);
        assert_eq!(day3.triggers[0].deleted_at, None);
        assert_eq!(day3.triggers[0].created_at, day3_at);
    }
}
