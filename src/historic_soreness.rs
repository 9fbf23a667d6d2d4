//! Longitudinal soreness and pain classification
//!
//! One [`HistoricSorenessState`] exists per (body part, side, pain flag) key.
//! [`HistoricSorenessTracker`] advances those states from daily reports and
//! lets silent states decay back to `DormantCleared`. States are never deleted.
//!
//! Two windows drive the machine:
//! - the *streak*, which counts consecutive reporting days;
//! - the *chain*, which tolerates gaps of up to `acute_chain_max_gap_days` and
//!   decides whether pain is reported densely enough to be acute.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::body_parts::{BodyPartLocation, BodyPartSide, Side};
use crate::error::ValidationError;
use crate::models::TrainingSession;
use crate::soreness::{SorenessKey, SorenessRecord};
use crate::soreness_cause::{self, CoOccurrence, SorenessCause};

/// Historic status of a recurring complaint, serialized as its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HistoricSorenessStatus {
    #[default]
    DormantCleared = 0,
    PersistentPain = 1,
    Persistent2Pain = 2,
    AlmostPersistentPain = 3,
    AlmostPersistent2Pain = 4,
    AlmostPersistent2PainAcute = 5,
    PersistentSoreness = 6,
    Persistent2Soreness = 7,
    AlmostPersistentSoreness = 8,
    AlmostPersistent2Soreness = 9,
    AcutePain = 10,
    AlmostAcutePain = 11,
    Doms = 12,
}

impl HistoricSorenessStatus {
    pub fn is_acute_pain(self) -> bool {
        matches!(
            self,
            HistoricSorenessStatus::AcutePain | HistoricSorenessStatus::AlmostPersistent2PainAcute
        )
    }

    pub fn is_persistent_soreness(self) -> bool {
        matches!(
            self,
            HistoricSorenessStatus::PersistentSoreness
                | HistoricSorenessStatus::AlmostPersistent2Soreness
        )
    }

    pub fn is_persistent_pain(self) -> bool {
        matches!(
            self,
            HistoricSorenessStatus::PersistentPain | HistoricSorenessStatus::AlmostPersistent2Pain
        )
    }

    /// Resting states; the `almost_*` entry states count as cleared for triggers
    pub fn is_dormant_cleared(self) -> bool {
        matches!(
            self,
            HistoricSorenessStatus::DormantCleared
                | HistoricSorenessStatus::AlmostAcutePain
                | HistoricSorenessStatus::AlmostPersistentPain
                | HistoricSorenessStatus::AlmostPersistentSoreness
        )
    }

    /// Persistent or persistent-2 soreness, including the pending-question variant
    pub fn is_any_persistent_soreness(self) -> bool {
        self.is_persistent_soreness() || self == HistoricSorenessStatus::Persistent2Soreness
    }

    /// Persistent or persistent-2 pain, including the pending-question variant
    pub fn is_any_persistent_pain(self) -> bool {
        self.is_persistent_pain() || self == HistoricSorenessStatus::Persistent2Pain
    }

    /// Acute, persistent or persistent-2 pain
    pub fn is_historic_pain(self) -> bool {
        self.is_acute_pain() || self.is_any_persistent_pain()
    }

    pub const ALL: [HistoricSorenessStatus; 13] = [
        HistoricSorenessStatus::DormantCleared,
        HistoricSorenessStatus::PersistentPain,
        HistoricSorenessStatus::Persistent2Pain,
        HistoricSorenessStatus::AlmostPersistentPain,
        HistoricSorenessStatus::AlmostPersistent2Pain,
        HistoricSorenessStatus::AlmostPersistent2PainAcute,
        HistoricSorenessStatus::PersistentSoreness,
        HistoricSorenessStatus::Persistent2Soreness,
        HistoricSorenessStatus::AlmostPersistentSoreness,
        HistoricSorenessStatus::AlmostPersistent2Soreness,
        HistoricSorenessStatus::AcutePain,
        HistoricSorenessStatus::AlmostAcutePain,
        HistoricSorenessStatus::Doms,
    ];
}

impl TryFrom<u8> for HistoricSorenessStatus {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        HistoricSorenessStatus::ALL
            .get(code as usize)
            .copied()
            .ok_or(ValidationError::UnknownStatus(code))
    }
}

impl From<HistoricSorenessStatus> for u8 {
    fn from(status: HistoricSorenessStatus) -> u8 {
        status as u8
    }
}

/// One day's severity in a state's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricSeverity {
    pub reported_at: DateTime<Utc>,
    pub severity: f64,
    pub movement: Option<f64>,
}

impl HistoricSeverity {
    pub fn date(&self) -> NaiveDate {
        self.reported_at.date_naive()
    }
}

/// Windows and thresholds of the status machine, in days unless noted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorenessConfig {
    /// Largest gap between pain reports that keeps a chain alive
    pub acute_chain_max_gap_days: i64,

    /// Reports needed in a chain (or consecutive streak) to escalate
    pub acute_min_reports: u32,

    /// Silence after which acute pain triggers the follow-up question
    pub acute_question_silence_days: i64,

    /// Episode length at which acute pain becomes persistent
    pub acute_to_persistent_days: i64,

    /// Episode length at which persistent becomes a persistent-2 candidate
    pub persistent_2_days: i64,

    /// Severity of a broken-streak pain report that flags a persistent-2 candidate as acute
    pub pain_acute_severity: f64,

    /// Silence after which persistent states fall back to almost-persistent
    pub persistent_decay_days: i64,

    /// Silence after which almost-persistent states go dormant
    pub dormant_after_days: i64,

    pub acute_dormant_days: i64,

    pub almost_acute_dormant_days: i64,

    /// A session this many days before a first soreness report makes it DOMS
    pub doms_window_days: i64,

    pub doms_dormant_days: i64,

    /// Episode length at which the cause becomes weakness
    pub weakness_days: i64,

    /// Episode length at which the cause becomes dysfunction
    pub dysfunction_days: i64,

    /// Share of overlapping reports needed for a symmetric pair (0..=1)
    pub symmetric_pair_percentage: f64,

    /// Surveys older than this many days are ignored
    pub survey_lookback_days: i64,
}

impl Default for SorenessConfig {
    fn default() -> Self {
        SorenessConfig {
            acute_chain_max_gap_days: 3,
            acute_min_reports: 3,
            acute_question_silence_days: 4,
            acute_to_persistent_days: 14,
            persistent_2_days: 28,
            pain_acute_severity: 3.0,
            persistent_decay_days: 14,
            dormant_after_days: 28,
            acute_dormant_days: 14,
            almost_acute_dormant_days: 7,
            doms_window_days: 2,
            doms_dormant_days: 2,
            weakness_days: 14,
            dysfunction_days: 28,
            symmetric_pair_percentage: 0.5,
            survey_lookback_days: 2,
        }
    }
}

/// Longitudinal record of one complaint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricSorenessState {
    pub body_part: BodyPartLocation,

    pub side: Side,

    pub pain: bool,

    pub status: HistoricSorenessStatus,

    /// Consecutive reporting days; zero while dormant or DOMS
    pub streak: u32,

    pub streak_start_date: Option<NaiveDate>,

    /// Mean severity over the current streak, two decimals
    pub average_severity: f64,

    pub max_severity: f64,

    pub max_severity_date: Option<NaiveDate>,

    /// Start of the current episode
    pub first_reported_at: Option<DateTime<Utc>>,

    pub last_reported_at: Option<DateTime<Utc>>,

    pub cleared_at: Option<DateTime<Utc>>,

    pub status_changed_at: Option<DateTime<Utc>>,

    /// Session believed to have caused the soreness (DOMS)
    pub causal_session: Option<String>,

    #[serde(default)]
    pub co_occurrences: Vec<CoOccurrence>,

    #[serde(default)]
    pub cause: SorenessCause,

    #[serde(default)]
    pub ask_acute_pain_question: bool,

    #[serde(default)]
    pub ask_persistent_2_question: bool,

    #[serde(default)]
    pub historic_severity: Vec<HistoricSeverity>,
}

impl HistoricSorenessState {
    /// A state that has never been reported
    pub fn new(body_part: BodyPartLocation, side: Side, pain: bool) -> Self {
        HistoricSorenessState {
            body_part,
            side,
            pain,
            status: HistoricSorenessStatus::DormantCleared,
            streak: 0,
            streak_start_date: None,
            average_severity: 0.0,
            max_severity: 0.0,
            max_severity_date: None,
            first_reported_at: None,
            last_reported_at: None,
            cleared_at: None,
            status_changed_at: None,
            causal_session: None,
            co_occurrences: Vec::new(),
            cause: SorenessCause::Unknown,
            ask_acute_pain_question: false,
            ask_persistent_2_question: false,
            historic_severity: Vec::new(),
        }
    }

    pub fn key(&self) -> SorenessKey {
        SorenessKey {
            location: self.body_part,
            side: self.side,
            pain: self.pain,
        }
    }

    pub fn body_part_side(&self) -> BodyPartSide {
        BodyPartSide::new(self.body_part, self.side)
    }

    pub fn is_dormant_cleared(&self) -> bool {
        self.status.is_dormant_cleared()
    }

    /// Reported at least once since it was last cleared
    pub fn in_active_episode(&self) -> bool {
        match (self.last_reported_at, self.cleared_at) {
            (Some(last), Some(cleared)) => last > cleared,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Report days belonging to the current episode, oldest first, deduplicated
    pub fn episode_report_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .historic_severity
            .iter()
            .filter(|entry| self.cleared_at.map_or(true, |cleared| entry.reported_at > cleared))
            .map(HistoricSeverity::date)
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// Whole days from the episode start to `date`
    pub fn days_since_first_report(&self, date: NaiveDate) -> Option<i64> {
        self.first_reported_at
            .map(|first| (date - first.date_naive()).num_days())
    }

    fn days_silent(&self, date: NaiveDate) -> Option<i64> {
        self.last_reported_at
            .map(|last| (date - last.date_naive()).num_days())
    }

    fn set_status(&mut self, status: HistoricSorenessStatus, at: DateTime<Utc>) {
        if self.status != status {
            debug!(
                body_part = %self.body_part,
                side = ?self.side,
                pain = self.pain,
                from = ?self.status,
                to = ?status,
                "historic status transition"
            );
            self.status = status;
            self.status_changed_at = Some(at);
        }
    }

    fn go_dormant(&mut self, at: DateTime<Utc>) {
        self.set_status(HistoricSorenessStatus::DormantCleared, at);
        self.cleared_at = Some(at);
        self.streak = 0;
        self.streak_start_date = None;
        self.ask_acute_pain_question = false;
        self.ask_persistent_2_question = false;
    }

    fn recompute_average(&mut self) {
        let since = self.streak_start_date;
        let episode_start = self.cleared_at;
        let values: Vec<f64> = self
            .historic_severity
            .iter()
            .filter(|entry| episode_start.map_or(true, |cleared| entry.reported_at > cleared))
            .filter(|entry| since.map_or(true, |start| entry.date() >= start))
            .map(|entry| entry.severity)
            .collect();

        if !values.is_empty() {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            self.average_severity = (mean * 100.0).round() / 100.0;
        }
    }

    fn note_severity(&mut self, severity: f64, date: NaiveDate) {
        if severity > self.max_severity || self.max_severity_date.is_none() {
            self.max_severity = severity;
            self.max_severity_date = Some(date);
        }
    }
}

/// Chain statistics over the current episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chain {
    reports: usize,
}

/// Drives [`HistoricSorenessState`] transitions
#[derive(Debug, Clone, Default)]
pub struct HistoricSorenessTracker {
    config: SorenessConfig,
}

impl HistoricSorenessTracker {
    pub fn new() -> Self {
        HistoricSorenessTracker {
            config: SorenessConfig::default(),
        }
    }

    pub fn with_config(config: SorenessConfig) -> Self {
        HistoricSorenessTracker { config }
    }

    pub fn config(&self) -> &SorenessConfig {
        &self.config
    }

    /// Apply one day's merged records, decay the silent states and refresh causes
    pub fn update_daily(
        &self,
        states: &mut Vec<HistoricSorenessState>,
        records: &[SorenessRecord],
        sessions: &[TrainingSession],
        as_of: DateTime<Utc>,
    ) {
        let mut reported = Vec::with_capacity(records.len());

        for record in records {
            let key = record.key();
            reported.push(key);
            match states.iter_mut().find(|state| state.key() == key) {
                Some(state) => self.record_report(state, record, sessions),
                None => {
                    let state = self.create_state(record, sessions);
                    info!(
                        body_part = %record.body_part,
                        side = ?record.side,
                        pain = record.pain,
                        status = ?state.status,
                        "new historic soreness state"
                    );
                    states.push(state);
                }
            }
        }

        for state in states.iter_mut() {
            if !reported.contains(&state.key()) {
                self.clear_stale(state, as_of);
            }
        }

        soreness_cause::refresh_co_occurrences(states);
        for state in states.iter_mut() {
            if state.in_active_episode() {
                state.cause = soreness_cause::get_soreness_cause(state, as_of, &self.config);
            }
        }
    }

    /// Start tracking a complaint from its first report
    pub fn create_state(
        &self,
        record: &SorenessRecord,
        sessions: &[TrainingSession],
    ) -> HistoricSorenessState {
        let mut state = HistoricSorenessState::new(record.body_part, record.side, record.pain);
        self.record_report(&mut state, record, sessions);
        state
    }

    /// Fold one report into an existing state
    pub fn record_report(
        &self,
        state: &mut HistoricSorenessState,
        record: &SorenessRecord,
        sessions: &[TrainingSession],
    ) {
        let today = record.reported_at.date_naive();
        let last_day = state.last_reported_at.map(|last| last.date_naive());

        match last_day {
            Some(last) if last == today => {
                self.merge_same_day(state, record);
                return;
            }
            Some(last) if last > today => {
                debug!(body_part = %state.body_part, "ignoring report older than state");
                return;
            }
            _ => {}
        }

        let new_episode = state.first_reported_at.is_none()
            || (state.status == HistoricSorenessStatus::DormantCleared
                && !state.in_active_episode());
        let consecutive = !new_episode
            && last_day.map_or(false, |last| (today - last).num_days() == 1);

        state.historic_severity.push(HistoricSeverity {
            reported_at: record.reported_at,
            severity: record.severity,
            movement: record.movement,
        });
        state.last_reported_at = Some(record.reported_at);

        if new_episode {
            state.first_reported_at = Some(record.reported_at);
            state.max_severity = record.severity;
            state.max_severity_date = Some(today);
            state.causal_session = None;

            if !record.pain {
                if let Some(session) = self.doms_session(record, sessions) {
                    state.causal_session = Some(session.id.clone());
                    state.set_status(HistoricSorenessStatus::Doms, record.reported_at);
                    state.streak = 0;
                    state.streak_start_date = None;
                    state.recompute_average();
                    return;
                }
            }
        } else {
            state.note_severity(record.severity, today);
        }

        if state.status == HistoricSorenessStatus::Doms {
            let in_window = state
                .days_since_first_report(today)
                .map_or(false, |days| days <= self.config.doms_window_days);
            if in_window {
                state.recompute_average();
                return;
            }
            // outlasted the DOMS window; track it as ordinary soreness
            state.set_status(HistoricSorenessStatus::DormantCleared, record.reported_at);
            state.streak = 1;
            state.streak_start_date = Some(today);
        } else if consecutive {
            state.streak += 1;
        } else {
            state.streak = 1;
            state.streak_start_date = Some(today);
        }

        state.recompute_average();

        if state.pain {
            self.advance_pain(state, record, consecutive);
        } else {
            self.advance_soreness(state, record);
        }
    }

    fn merge_same_day(&self, state: &mut HistoricSorenessState, record: &SorenessRecord) {
        let today = record.reported_at.date_naive();
        if let Some(entry) = state
            .historic_severity
            .iter_mut()
            .rev()
            .find(|entry| entry.date() == today)
        {
            entry.severity = entry.severity.max(record.severity);
            if entry.movement.is_none() {
                entry.movement = record.movement;
            }
        }
        if state.last_reported_at.map_or(true, |last| record.reported_at > last) {
            state.last_reported_at = Some(record.reported_at);
        }
        state.note_severity(record.severity, today);
        state.recompute_average();
    }

    fn chain(&self, state: &HistoricSorenessState) -> Chain {
        let dates = state.episode_report_dates();
        let mut reports = 0;
        let mut next: Option<NaiveDate> = None;

        for date in dates.iter().rev() {
            if let Some(later) = next {
                if (later - *date).num_days() > self.config.acute_chain_max_gap_days {
                    break;
                }
            }
            reports += 1;
            next = Some(*date);
        }

        Chain { reports }
    }

    fn advance_pain(
        &self,
        state: &mut HistoricSorenessState,
        record: &SorenessRecord,
        consecutive: bool,
    ) {
        use HistoricSorenessStatus::*;

        let today = record.reported_at.date_naive();
        let chain = self.chain(state);
        let min_reports = self.config.acute_min_reports;
        let episode_days = state.days_since_first_report(today).unwrap_or(0);

        let next = match state.status {
            DormantCleared | AlmostAcutePain => {
                if chain.reports >= min_reports as usize {
                    AcutePain
                } else if chain.reports == 2 {
                    AlmostAcutePain
                } else {
                    state.status
                }
            }
            AcutePain if episode_days >= self.config.acute_to_persistent_days => PersistentPain,
            PersistentPain if episode_days >= self.config.persistent_2_days => {
                state.ask_persistent_2_question = true;
                AlmostPersistent2Pain
            }
            AlmostPersistentPain if state.streak >= min_reports => PersistentPain,
            AlmostPersistent2Pain
                if !consecutive && record.severity >= self.config.pain_acute_severity =>
            {
                AlmostPersistent2PainAcute
            }
            AlmostPersistent2Pain | AlmostPersistent2PainAcute if state.streak >= min_reports => {
                state.ask_persistent_2_question = false;
                Persistent2Pain
            }
            other => other,
        };

        if next != AcutePain && next != AlmostPersistent2PainAcute {
            state.ask_acute_pain_question = false;
        }
        state.set_status(next, record.reported_at);
    }

    fn advance_soreness(&self, state: &mut HistoricSorenessState, record: &SorenessRecord) {
        use HistoricSorenessStatus::*;

        let today = record.reported_at.date_naive();
        let chain = self.chain(state);
        let min_reports = self.config.acute_min_reports;
        let episode_days = state.days_since_first_report(today).unwrap_or(0);

        let next = match state.status {
            DormantCleared | AlmostPersistentSoreness
                if chain.reports >= min_reports as usize =>
            {
                if state.streak >= min_reports
                    || episode_days >= self.config.acute_to_persistent_days
                {
                    PersistentSoreness
                } else {
                    AlmostPersistentSoreness
                }
            }
            AlmostPersistentSoreness if state.streak >= min_reports => PersistentSoreness,
            PersistentSoreness if episode_days >= self.config.persistent_2_days => {
                state.ask_persistent_2_question = true;
                AlmostPersistent2Soreness
            }
            AlmostPersistent2Soreness if state.streak >= min_reports => {
                state.ask_persistent_2_question = false;
                Persistent2Soreness
            }
            other => other,
        };

        state.set_status(next, record.reported_at);
    }

    fn doms_session<'a>(
        &self,
        record: &SorenessRecord,
        sessions: &'a [TrainingSession],
    ) -> Option<&'a TrainingSession> {
        let report_day = record.reported_at.date_naive();
        sessions
            .iter()
            .filter(|session| session.event_date < record.reported_at)
            .filter(|session| {
                (report_day - session.date()).num_days() <= self.config.doms_window_days
            })
            .max_by_key(|session| session.event_date)
    }

    /// Decay a state that was not reported on `as_of`
    pub fn clear_stale(&self, state: &mut HistoricSorenessState, as_of: DateTime<Utc>) {
        use HistoricSorenessStatus::*;

        let Some(silent) = state.days_silent(as_of.date_naive()) else {
            return;
        };

        match state.status {
            DormantCleared => {}
            AcutePain | AlmostPersistent2PainAcute => {
                if silent > self.config.acute_dormant_days {
                    state.go_dormant(as_of);
                } else if silent >= self.config.acute_question_silence_days {
                    state.ask_acute_pain_question = true;
                }
            }
            AlmostAcutePain => {
                if silent > self.config.almost_acute_dormant_days {
                    state.go_dormant(as_of);
                }
            }
            Doms => {
                if silent > self.config.doms_dormant_days {
                    state.go_dormant(as_of);
                }
            }
            PersistentPain | Persistent2Pain | AlmostPersistent2Pain => {
                if silent > self.config.dormant_after_days {
                    state.go_dormant(as_of);
                } else if silent > self.config.persistent_decay_days {
                    state.ask_persistent_2_question = false;
                    state.set_status(AlmostPersistentPain, as_of);
                }
            }
            PersistentSoreness | Persistent2Soreness | AlmostPersistent2Soreness => {
                if silent > self.config.dormant_after_days {
                    state.go_dormant(as_of);
                } else if silent > self.config.persistent_decay_days {
                    state.ask_persistent_2_question = false;
                    state.set_status(AlmostPersistentSoreness, as_of);
                }
            }
            AlmostPersistentPain | AlmostPersistentSoreness => {
                if silent > self.config.dormant_after_days {
                    state.go_dormant(as_of);
                }
            }
        }

        // streaks only survive consecutive days
        if silent > 1 {
            state.streak = 0;
            state.streak_start_date = None;
        }
    }

    /// "Is this the same pain you had before?" after acute pain went quiet
    pub fn answer_acute_pain_question(
        &self,
        state: &mut HistoricSorenessState,
        same_pain: bool,
        at: DateTime<Utc>,
    ) {
        if !state.ask_acute_pain_question {
            return;
        }
        state.ask_acute_pain_question = false;
        if same_pain {
            state.set_status(HistoricSorenessStatus::Persistent2Pain, at);
        } else {
            state.go_dormant(at);
        }
    }

    /// "Has this persisted?" once a persistent complaint reaches the persistent-2 window
    pub fn answer_persistent_2_question(
        &self,
        state: &mut HistoricSorenessState,
        persisted: bool,
        at: DateTime<Utc>,
    ) {
        if !state.ask_persistent_2_question {
            return;
        }
        state.ask_persistent_2_question = false;
        let next = match (state.pain, persisted) {
            (true, true) => HistoricSorenessStatus::Persistent2Pain,
            (true, false) => HistoricSorenessStatus::PersistentPain,
            (false, true) => HistoricSorenessStatus::Persistent2Soreness,
            (false, false) => HistoricSorenessStatus::PersistentSoreness,
        };
        state.set_status(next, at);
    }
}
