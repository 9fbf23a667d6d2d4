//! Causal attribution for long-running complaints
//!
//! A complaint is attributed to overloading, weakness or dysfunction from how
//! long it has lasted and which other body parts hurt on the same days.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::body_parts::{BodyPartLocation, BodyRegion, Side};
use crate::error::ValidationError;
use crate::historic_soreness::{HistoricSorenessState, HistoricSorenessStatus, SorenessConfig};
use crate::soreness::SorenessKey;

/// Likely cause of a complaint, serialized as its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SorenessCause {
    #[default]
    Unknown = 0,
    Overloading = 1,
    Weakness = 2,
    Dysfunction = 3,
}

impl SorenessCause {
    pub fn description(&self) -> &'static str {
        match self {
            SorenessCause::Unknown => "Pattern does not point to a single cause",
            SorenessCause::Overloading => "Recent load exceeded what the tissue was ready for",
            SorenessCause::Weakness => "Recurring complaint suggesting a strength deficit",
            SorenessCause::Dysfunction => "Long-standing complaint suggesting a movement dysfunction",
        }
    }
}

impl TryFrom<u8> for SorenessCause {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SorenessCause::Unknown),
            1 => Ok(SorenessCause::Overloading),
            2 => Ok(SorenessCause::Weakness),
            3 => Ok(SorenessCause::Dysfunction),
            other => Err(ValidationError::UnknownCause(other)),
        }
    }
}

impl From<SorenessCause> for u8 {
    fn from(cause: SorenessCause) -> u8 {
        cause as u8
    }
}

impl fmt::Display for SorenessCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SorenessCause::Unknown => "unknown",
            SorenessCause::Overloading => "overloading",
            SorenessCause::Weakness => "weakness",
            SorenessCause::Dysfunction => "dysfunction",
        };
        write!(f, "{}", name)
    }
}

/// Another complaint reported on some of the same days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrence {
    pub body_part: BodyPartLocation,
    pub side: Side,
    pub pain: bool,
    pub status: HistoricSorenessStatus,
    pub first_reported_at: Option<DateTime<Utc>>,

    /// Days both complaints were reported
    pub count: u32,

    /// `count` over the owning state's report days
    pub percentage: f64,

    /// Same body part on the opposite side
    pub symmetric_pair: bool,
}

struct Snapshot {
    key: SorenessKey,
    status: HistoricSorenessStatus,
    first_reported_at: Option<DateTime<Utc>>,
    dates: BTreeSet<NaiveDate>,
}

/// Recompute every state's co-occurrence list from the episode report days
pub fn refresh_co_occurrences(states: &mut [HistoricSorenessState]) {
    let snapshots: Vec<Snapshot> = states
        .iter()
        .filter(|state| state.in_active_episode())
        .map(|state| Snapshot {
            key: state.key(),
            status: state.status,
            first_reported_at: state.first_reported_at,
            dates: state.episode_report_dates().into_iter().collect(),
        })
        .collect();

    for state in states.iter_mut() {
        if !state.in_active_episode() {
            continue;
        }
        let own_key = state.key();
        let own_dates: BTreeSet<NaiveDate> = state.episode_report_dates().into_iter().collect();
        if own_dates.is_empty() {
            state.co_occurrences.clear();
            continue;
        }

        let mut co_occurrences: Vec<CoOccurrence> = snapshots
            .iter()
            .filter(|other| other.key != own_key)
            .filter_map(|other| {
                let count = own_dates.intersection(&other.dates).count() as u32;
                if count == 0 {
                    return None;
                }
                Some(CoOccurrence {
                    body_part: other.key.location,
                    side: other.key.side,
                    pain: other.key.pain,
                    status: other.status,
                    first_reported_at: other.first_reported_at,
                    count,
                    percentage: count as f64 / own_dates.len() as f64,
                    symmetric_pair: other.key.location == own_key.location
                        && own_key.side.opposite() == Some(other.key.side),
                })
            })
            .collect();

        co_occurrences.sort_by_key(|co| (co.body_part, co.side, co.pain));
        state.co_occurrences = co_occurrences;
    }
}

/// Classify a state's cause as of `as_of`
///
/// Dysfunction is sticky. A weakness that reaches the dysfunction window is
/// promoted. Co-occurrence patterns take precedence over plain duration.
pub fn get_soreness_cause(
    state: &HistoricSorenessState,
    as_of: DateTime<Utc>,
    config: &SorenessConfig,
) -> SorenessCause {
    if state.cause == SorenessCause::Dysfunction {
        return SorenessCause::Dysfunction;
    }

    let today = as_of.date_naive();
    // inclusive of the first and current day
    let days = state
        .days_since_first_report(today)
        .map(|days| days + 1)
        .unwrap_or(1);

    if state.cause == SorenessCause::Weakness && days >= config.dysfunction_days {
        return SorenessCause::Dysfunction;
    }
    if days > config.dysfunction_days {
        return SorenessCause::Dysfunction;
    }

    let recent = |co: &&CoOccurrence| {
        co.first_reported_at.map_or(false, |first| {
            (today - first.date_naive()).num_days() <= config.dysfunction_days
        })
    };

    let symmetric_weakness = state
        .co_occurrences
        .iter()
        .filter(recent)
        .any(|co| co.symmetric_pair && co.percentage > config.symmetric_pair_percentage);
    if symmetric_weakness {
        return SorenessCause::Weakness;
    }

    let asymmetric: Vec<&CoOccurrence> = state
        .co_occurrences
        .iter()
        .filter(|co| !co.symmetric_pair)
        .collect();
    if asymmetric.len() > 1 {
        let mut per_region: HashMap<BodyRegion, usize> = HashMap::new();
        for co in &asymmetric {
            *per_region.entry(co.body_part.region()).or_insert(0) += 1;
        }
        // several complaints in one region suggest compensation
        return if per_region.values().any(|&count| count > 1) {
            SorenessCause::Weakness
        } else {
            SorenessCause::Unknown
        };
    }

    if days >= config.weakness_days {
        SorenessCause::Weakness
    } else {
        SorenessCause::Overloading
    }
}
