//! Daily soreness records and the merges applied before rule evaluation
//!
//! Raw [`SorenessReport`]s arrive with integer codes. They are translated once,
//! at this boundary, into typed [`SorenessRecord`]s; nothing past this module
//! sees an unvalidated code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::body_parts::{BodyPartLocation, BodyPartSide, Side};
use crate::error::ValidationError;
use crate::historic_soreness::{HistoricSorenessState, HistoricSorenessStatus};

/// Identity of a complaint: one soreness state and one daily record per key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SorenessKey {
    pub location: BodyPartLocation,
    pub side: Side,
    pub pain: bool,
}

/// Qualitative descriptors scored 0..=3
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitativeFlags {
    pub ache: u8,
    pub sharp: u8,
    pub tight: u8,
    pub knots: u8,
}

impl QualitativeFlags {
    pub const MAX: u8 = 3;

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (flag, value) in [
            ("ache", self.ache),
            ("sharp", self.sharp),
            ("tight", self.tight),
            ("knots", self.knots),
        ] {
            if value > Self::MAX {
                return Err(ValidationError::FlagOutOfRange { flag, value });
            }
        }
        Ok(())
    }

    /// Keep the larger score of each flag
    pub fn merge_max(&mut self, other: &QualitativeFlags) {
        self.ache = self.ache.max(other.ache);
        self.sharp = self.sharp.max(other.sharp);
        self.tight = self.tight.max(other.tight);
        self.knots = self.knots.max(other.knots);
    }
}

/// A soreness report as submitted, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SorenessReport {
    /// Body part code
    pub body_part: u8,

    /// Side code, 0 when not reported
    #[serde(default)]
    pub side: u8,

    #[serde(default)]
    pub pain: bool,

    /// Severity on 0..=5
    pub severity: Option<f64>,

    /// Movement limitation on 0..=5
    #[serde(default)]
    pub movement: Option<f64>,

    #[serde(flatten)]
    pub flags: QualitativeFlags,

    pub reported_at: DateTime<Utc>,
}

/// A validated soreness or pain record for one body part on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SorenessRecord {
    pub body_part: BodyPartLocation,

    pub side: Side,

    pub pain: bool,

    /// Combined severity on 0..=5
    pub severity: f64,

    /// Movement score; cleared once folded into `severity`
    pub movement: Option<f64>,

    pub flags: QualitativeFlags,

    pub reported_at: DateTime<Utc>,

    pub status_changed_at: Option<DateTime<Utc>>,

    /// Reported today, as opposed to carried over from history
    pub daily: bool,

    pub historic_status: Option<HistoricSorenessStatus>,

    pub first_reported_at: Option<DateTime<Utc>>,
}

impl SorenessRecord {
    /// A daily record with only the core fields set
    pub fn new(
        body_part: BodyPartLocation,
        side: Side,
        pain: bool,
        severity: f64,
        reported_at: DateTime<Utc>,
    ) -> Self {
        SorenessRecord {
            body_part,
            side,
            pain,
            severity,
            movement: None,
            flags: QualitativeFlags::default(),
            reported_at,
            status_changed_at: None,
            daily: true,
            historic_status: None,
            first_reported_at: None,
        }
    }

    /// Validate and translate a submitted report
    pub fn from_report(report: &SorenessReport) -> Result<Self, ValidationError> {
        let body_part = BodyPartLocation::try_from(report.body_part)?;
        let side = Side::try_from(report.side)?;

        if let Some(severity) = report.severity {
            if !(0.0..=5.0).contains(&severity) {
                return Err(ValidationError::SeverityOutOfRange(severity));
            }
        }
        if let Some(movement) = report.movement {
            if !(0.0..=5.0).contains(&movement) {
                return Err(ValidationError::MovementOutOfRange(movement));
            }
        }
        report.flags.validate()?;

        let severity = get_severity(report.severity, report.movement)
            .ok_or(ValidationError::MissingSeverity(report.body_part))?;

        let mut record = SorenessRecord::new(body_part, side, report.pain, severity, report.reported_at);
        record.flags = report.flags;
        Ok(record)
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

    /// Fold the movement score into `severity` and clear it
    pub fn apply_movement(&mut self) {
        if self.movement.is_some() {
            if let Some(combined) = get_severity(Some(self.severity), self.movement) {
                self.severity = combined;
            }
            self.movement = None;
        }
    }

    /// Whole days from the first historic report to `at`
    pub fn days_since_first_report(&self, at: DateTime<Utc>) -> Option<i64> {
        self.first_reported_at
            .map(|first| (at.date_naive() - first.date_naive()).num_days())
    }

    /// Historic status treated as dormant when absent
    pub fn is_dormant_cleared(&self) -> bool {
        self.historic_status.map_or(true, HistoricSorenessStatus::is_dormant_cleared)
    }

    pub fn is_doms(&self) -> bool {
        self.historic_status == Some(HistoricSorenessStatus::Doms)
    }

    fn status_matches(&self, predicate: fn(HistoricSorenessStatus) -> bool) -> bool {
        self.historic_status.map_or(false, predicate)
    }

    pub fn is_acute_pain(&self) -> bool {
        self.status_matches(HistoricSorenessStatus::is_acute_pain)
    }

    pub fn is_persistent_pain(&self) -> bool {
        self.status_matches(HistoricSorenessStatus::is_persistent_pain)
    }

    pub fn is_persistent_soreness(&self) -> bool {
        self.status_matches(HistoricSorenessStatus::is_persistent_soreness)
    }

    pub fn is_persistent_2_pain(&self) -> bool {
        self.historic_status == Some(HistoricSorenessStatus::Persistent2Pain)
    }

    pub fn is_persistent_2_soreness(&self) -> bool {
        self.historic_status == Some(HistoricSorenessStatus::Persistent2Soreness)
    }

    /// Acute, persistent or persistent-2 pain history
    pub fn has_historic_pain(&self) -> bool {
        self.status_matches(HistoricSorenessStatus::is_historic_pain)
    }
}

impl TryFrom<&SorenessReport> for SorenessRecord {
    type Error = ValidationError;

    fn try_from(report: &SorenessReport) -> Result<Self, Self::Error> {
        SorenessRecord::from_report(report)
    }
}

/// Combine a severity and a movement score into one 0..=5 severity
///
/// Either input alone is enough; neither yields `None`.
pub fn get_severity(severity: Option<f64>, movement: Option<f64>) -> Option<f64> {
    let by_movement = |movement: f64, steps: [f64; 3]| {
        if movement <= 1.0 {
            steps[0]
        } else if movement <= 3.0 {
            steps[1]
        } else {
            steps[2]
        }
    };

    match (severity, movement) {
        (None, None) => None,
        (Some(severity), None) => Some(severity),
        (None, Some(movement)) => Some(by_movement(movement, [1.0, 2.0, 3.0])),
        (Some(severity), Some(movement)) => {
            let steps = if severity <= 0.0 {
                [1.0, 1.0, 2.0]
            } else if severity <= 1.0 {
                [1.0, 2.0, 3.0]
            } else if severity <= 3.0 {
                [2.0, 3.0, 4.0]
            } else {
                [4.0, 5.0, 5.0]
            };
            Some(by_movement(movement, steps))
        }
    }
}

/// Merges same-key records, keeping the most severe reading
#[derive(Debug, Clone, Default)]
pub struct SorenessAccumulator {
    records: Vec<SorenessRecord>,
}

impl SorenessAccumulator {
    pub fn new() -> Self {
        SorenessAccumulator::default()
    }

    /// Merge one record; movement is folded into severity first
    pub fn merge(&mut self, mut record: SorenessRecord) {
        record.apply_movement();
        let key = record.key();

        match self.records.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => {
                existing.severity = existing.severity.max(record.severity);
                existing.flags.merge_max(&record.flags);
                if record.reported_at > existing.reported_at {
                    existing.reported_at = record.reported_at;
                }
            }
            None => self.records.push(record),
        }
    }

    /// Validate and merge raw reports, dropping the ones that fail validation
    pub fn merge_reports<'a>(&mut self, reports: impl IntoIterator<Item = &'a SorenessReport>) -> usize {
        let mut rejected = 0;
        for report in reports {
            match SorenessRecord::from_report(report) {
                Ok(record) => self.merge(record),
                Err(err) => {
                    warn!(error = %err, body_part = report.body_part, "dropping soreness report");
                    rejected += 1;
                }
            }
        }
        rejected
    }

    pub fn records(&self) -> &[SorenessRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SorenessRecord> {
        self.records
    }
}

/// Reports from the last `lookback_days` calendar days, counting `as_of`'s
/// own day, and not after `as_of`
pub fn recent_reports<'a>(
    reports: &'a [SorenessReport],
    as_of: DateTime<Utc>,
    lookback_days: i64,
) -> impl Iterator<Item = &'a SorenessReport> + 'a {
    let today = as_of.date_naive();
    reports.iter().filter(move |report| {
        report.reported_at <= as_of
            && (today - report.reported_at.date_naive()).num_days() < lookback_days
    })
}

/// Attach historic context to today's records and carry live history forward
///
/// Matched records take the state's status and first report. Every other
/// state, dormant ones included, is appended as a non-daily record at its
/// average severity.
pub fn merge_current_historic(
    mut records: Vec<SorenessRecord>,
    states: &[HistoricSorenessState],
    as_of: DateTime<Utc>,
) -> Vec<SorenessRecord> {
    for record in records.iter_mut() {
        if let Some(state) = states.iter().find(|state| state.key() == record.key()) {
            record.historic_status = Some(state.status);
            record.first_reported_at = state.first_reported_at;
            record.status_changed_at = state.status_changed_at;
        }
    }

    for state in states {
        if records.iter().any(|record| record.key() == state.key()) {
            continue;
        }
        records.push(SorenessRecord {
            body_part: state.body_part,
            side: state.side,
            pain: state.pain,
            severity: state.average_severity,
            movement: None,
            flags: QualitativeFlags::default(),
            reported_at: state.last_reported_at.unwrap_or(as_of),
            status_changed_at: state.status_changed_at,
            daily: false,
            historic_status: Some(state.status),
            first_reported_at: state.first_reported_at,
        });
    }

    records
}
