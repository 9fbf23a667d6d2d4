//! Trigger catalogue and trigger records
//!
//! Integer identities are matched on by downstream consumers and must never be
//! renumbered. Codes 201-206 are placeholders raised when a category has no
//! data to evaluate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::body_parts::{BodyPartSide, Side};
use crate::error::ValidationError;
use crate::historic_soreness::HistoricSorenessStatus;
use crate::models::SportName;

/// Which insight category a trigger feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Stress,
    Response,
    Biomechanics,
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightType::Stress => write!(f, "stress"),
            InsightType::Response => write!(f, "response"),
            InsightType::Biomechanics => write!(f, "biomechanics"),
        }
    }
}

/// A typed signal handed to the recommendation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[repr(u16)]
pub enum TriggerType {
    HighVolumeIntensity = 0,
    HistSoreGreater30HighVolumeIntensity = 1,
    HistPainHighVolumeIntensity = 2,
    HistSoreGreater30NoSoreTodayHighVolumeIntensity = 3,
    AcutePainNoPainTodayHighVolumeIntensity = 4,
    PersPers2PainNoPainSoreTodayHighVolumeIntensity = 5,
    HistSoreLess30Sport = 6,
    HistSoreLess30 = 7,
    OverreachingHighMuscularStrain = 8,
    SoreTodayNoSession = 9,
    SoreToday = 10,
    SoreTodayDoms = 11,
    HistSoreLess30SoreToday = 12,
    HistSoreGreater30SoreToday = 13,
    NoHistPainPainTodaySeverity1And2 = 14,
    NoHistPainPainTodayHighSeverity3To5 = 15,
    HistPain = 16,
    HistPainSport = 17,
    PainInjury = 18,
    HistSoreGreater30 = 19,
    HistSoreGreater30Sport = 20,
    PersPers2PainLess30NoPainToday = 21,
    PersPers2PainGreater30NoPainToday = 22,
    HistPainPainTodaySeverity1And2 = 23,
    HistPainPainTodaySeverity3To5 = 24,
    NotEnoughHistoryForHighVolumeIntensity = 25,
    NoStressVolumeData = 201,
    NoResponseSorenessData = 202,
    NoResponsePainData = 203,
    NoBiomechanicsSorenessData = 205,
    NoBiomechanicsPainData = 206,
}

impl TriggerType {
    pub const ALL: [TriggerType; 31] = [
        TriggerType::HighVolumeIntensity,
        TriggerType::HistSoreGreater30HighVolumeIntensity,
        TriggerType::HistPainHighVolumeIntensity,
        TriggerType::HistSoreGreater30NoSoreTodayHighVolumeIntensity,
        TriggerType::AcutePainNoPainTodayHighVolumeIntensity,
        TriggerType::PersPers2PainNoPainSoreTodayHighVolumeIntensity,
        TriggerType::HistSoreLess30Sport,
        TriggerType::HistSoreLess30,
        TriggerType::OverreachingHighMuscularStrain,
        TriggerType::SoreTodayNoSession,
        TriggerType::SoreToday,
        TriggerType::SoreTodayDoms,
        TriggerType::HistSoreLess30SoreToday,
        TriggerType::HistSoreGreater30SoreToday,
        TriggerType::NoHistPainPainTodaySeverity1And2,
        TriggerType::NoHistPainPainTodayHighSeverity3To5,
        TriggerType::HistPain,
        TriggerType::HistPainSport,
        TriggerType::PainInjury,
        TriggerType::HistSoreGreater30,
        TriggerType::HistSoreGreater30Sport,
        TriggerType::PersPers2PainLess30NoPainToday,
        TriggerType::PersPers2PainGreater30NoPainToday,
        TriggerType::HistPainPainTodaySeverity1And2,
        TriggerType::HistPainPainTodaySeverity3To5,
        TriggerType::NotEnoughHistoryForHighVolumeIntensity,
        TriggerType::NoStressVolumeData,
        TriggerType::NoResponseSorenessData,
        TriggerType::NoResponsePainData,
        TriggerType::NoBiomechanicsSorenessData,
        TriggerType::NoBiomechanicsPainData,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        use TriggerType::*;
        match self {
            HighVolumeIntensity => "high_volume_intensity",
            HistSoreGreater30HighVolumeIntensity => "hist_sore_greater_30_high_volume_intensity",
            HistPainHighVolumeIntensity => "hist_pain_high_volume_intensity",
            HistSoreGreater30NoSoreTodayHighVolumeIntensity => {
                "hist_sore_greater_30_no_sore_today_high_volume_intensity"
            }
            AcutePainNoPainTodayHighVolumeIntensity => {
                "acute_pain_no_pain_today_high_volume_intensity"
            }
            PersPers2PainNoPainSoreTodayHighVolumeIntensity => {
                "pers_pers2_pain_no_pain_sore_today_high_volume_intensity"
            }
            HistSoreLess30Sport => "hist_sore_less_30_sport",
            HistSoreLess30 => "hist_sore_less_30",
            OverreachingHighMuscularStrain => "overreaching_high_muscular_strain",
            SoreTodayNoSession => "sore_today_no_session",
            SoreToday => "sore_today",
            SoreTodayDoms => "sore_today_doms",
            HistSoreLess30SoreToday => "hist_sore_less_30_sore_today",
            HistSoreGreater30SoreToday => "hist_sore_greater_30_sore_today",
            NoHistPainPainTodaySeverity1And2 => "no_hist_pain_pain_today_severity_1_2",
            NoHistPainPainTodayHighSeverity3To5 => "no_hist_pain_pain_today_high_severity_3_5",
            HistPain => "hist_pain",
            HistPainSport => "hist_pain_sport",
            PainInjury => "pain_injury",
            HistSoreGreater30 => "hist_sore_greater_30",
            HistSoreGreater30Sport => "hist_sore_greater_30_sport",
            PersPers2PainLess30NoPainToday => "pers_pers2_pain_less_30_no_pain_today",
            PersPers2PainGreater30NoPainToday => "pers_pers2_pain_greater_30_no_pain_today",
            HistPainPainTodaySeverity1And2 => "hist_pain_pain_today_severity_1_2",
            HistPainPainTodaySeverity3To5 => "hist_pain_pain_today_severity_3_5",
            NotEnoughHistoryForHighVolumeIntensity => {
                "not_enough_history_for_high_volume_intensity"
            }
            NoStressVolumeData => "no_stress_volume_data",
            NoResponseSorenessData => "no_response_soreness_data",
            NoResponsePainData => "no_response_pain_data",
            NoBiomechanicsSorenessData => "no_biomechanics_soreness_data",
            NoBiomechanicsPainData => "no_biomechanics_pain_data",
        }
    }

    /// Parent group of near-duplicate types, if this type has one
    pub fn parent_group(self) -> Option<u8> {
        use TriggerType::*;
        match self {
            HistSoreLess30Sport | HistSoreLess30 | OverreachingHighMuscularStrain => Some(0),
            SoreToday | SoreTodayDoms => Some(1),
            NoHistPainPainTodaySeverity1And2 | NoHistPainPainTodayHighSeverity3To5 => Some(2),
            _ => None,
        }
    }

    pub fn is_grouped(self) -> bool {
        self.parent_group().is_some()
    }

    /// Same type, or same parent group for grouped types
    pub fn is_equivalent(self, other: TriggerType) -> bool {
        match self.parent_group() {
            None => self == other,
            Some(group) => other.parent_group() == Some(group),
        }
    }

    /// Whether an equivalent type appears in `types`
    pub fn is_in(self, types: &[TriggerType]) -> bool {
        types.iter().any(|&other| self.is_equivalent(other))
    }

    /// Whether another member of this type's parent group appears in `types`
    pub fn parent_group_exists(self, types: &[TriggerType]) -> bool {
        match self.parent_group() {
            None => false,
            Some(group) => types.iter().any(|other| other.parent_group() == Some(group)),
        }
    }

    pub fn insight_type(self) -> InsightType {
        use TriggerType::*;
        match self {
            HighVolumeIntensity
            | HistSoreGreater30HighVolumeIntensity
            | HistPainHighVolumeIntensity
            | HistSoreGreater30NoSoreTodayHighVolumeIntensity
            | AcutePainNoPainTodayHighVolumeIntensity
            | PersPers2PainNoPainSoreTodayHighVolumeIntensity
            | NotEnoughHistoryForHighVolumeIntensity
            | NoStressVolumeData => InsightType::Stress,
            HistPain | HistPainSport | PainInjury | HistSoreGreater30 | HistSoreGreater30Sport
            | NoBiomechanicsSorenessData | NoBiomechanicsPainData => InsightType::Biomechanics,
            _ => InsightType::Response,
        }
    }
}

impl TryFrom<u16> for TriggerType {
    type Error = ValidationError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        TriggerType::ALL
            .iter()
            .copied()
            .find(|trigger_type| trigger_type.code() == code)
            .ok_or(ValidationError::UnknownTriggerType(code))
    }
}

impl From<TriggerType> for u16 {
    fn from(trigger_type: TriggerType) -> u16 {
        trigger_type.code()
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fired (or retired) trigger in an athlete's rolling set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub trigger_type: TriggerType,

    pub body_part: Option<BodyPartSide>,

    pub sport_name: Option<SportName>,

    pub severity: Option<f64>,

    pub pain: Option<bool>,

    pub historic_status: Option<HistoricSorenessStatus>,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    /// Set when a pass completes without this trigger firing
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the underlying soreness was reported
    pub source_date: Option<DateTime<Utc>>,

    /// First report of the underlying complaint
    pub source_first_reported_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub agonists: Vec<BodyPartSide>,

    #[serde(default)]
    pub antagonists: Vec<BodyPartSide>,

    #[serde(default)]
    pub synergists: Vec<BodyPartSide>,
}

impl Trigger {
    /// A live trigger stamped at `now`
    pub fn new(trigger_type: TriggerType, now: DateTime<Utc>) -> Self {
        Trigger {
            trigger_type,
            body_part: None,
            sport_name: None,
            severity: None,
            pain: None,
            historic_status: None,
            created_at: now,
            modified_at: now,
            deleted_at: None,
            source_date: None,
            source_first_reported_at: None,
            agonists: Vec::new(),
            antagonists: Vec::new(),
            synergists: Vec::new(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn insight_type(&self) -> InsightType {
        self.trigger_type.insight_type()
    }

    pub fn side(&self) -> Option<Side> {
        self.body_part.map(|body_part| body_part.side)
    }
}
