//! Training sessions, sports and dated athlete values fed into a daily pass

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Sports an athlete can log, serialized as integer codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SportName {
    Basketball = 0,
    Baseball = 1,
    Softball = 2,
    Cycling = 3,
    FieldHockey = 4,
    Football = 5,
    GeneralFitness = 6,
    Golf = 7,
    Gymnastics = 8,
    IceHockey = 9,
    Lacrosse = 10,
    Rowing = 11,
    Rugby = 12,
    Diving = 13,
    Soccer = 14,
    Swimming = 15,
    Tennis = 16,
    DistanceRunning = 17,
    Sprints = 18,
    Jumps = 19,
    Throws = 20,
    Volleyball = 21,
    Wrestling = 22,
    Weightlifting = 23,
}

impl SportName {
    pub const ALL: [SportName; 24] = [
        SportName::Basketball,
        SportName::Baseball,
        SportName::Softball,
        SportName::Cycling,
        SportName::FieldHockey,
        SportName::Football,
        SportName::GeneralFitness,
        SportName::Golf,
        SportName::Gymnastics,
        SportName::IceHockey,
        SportName::Lacrosse,
        SportName::Rowing,
        SportName::Rugby,
        SportName::Diving,
        SportName::Soccer,
        SportName::Swimming,
        SportName::Tennis,
        SportName::DistanceRunning,
        SportName::Sprints,
        SportName::Jumps,
        SportName::Throws,
        SportName::Volleyball,
        SportName::Wrestling,
        SportName::Weightlifting,
    ];
}

impl TryFrom<u8> for SportName {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        SportName::ALL
            .get(code as usize)
            .copied()
            .ok_or(ValidationError::UnknownSport(code))
    }
}

impl From<SportName> for u8 {
    fn from(sport: SportName) -> u8 {
        sport as u8
    }
}

/// What kind of session was logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Practice,
    StrengthAndConditioning,
    Game,
    Tournament,
    BumpUp,
    Corrective,
    SportTraining,
}

impl SessionKind {
    /// Games and tournaments
    pub fn is_competition(self) -> bool {
        matches!(self, SessionKind::Game | SessionKind::Tournament)
    }

    /// Sessions that count toward sport training load
    pub fn counts_toward_load(self) -> bool {
        !matches!(self, SessionKind::Corrective)
    }
}

/// A completed training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Caller-assigned identifier
    pub id: String,

    pub kind: SessionKind,

    pub sport_name: SportName,

    /// When the session took place
    pub event_date: DateTime<Utc>,

    /// Duration in minutes
    pub duration_minutes: Option<f64>,

    /// Session RPE on a 0-10 scale
    pub session_rpe: Option<f64>,

    /// Power-derived load, if a device recorded one
    pub power_load: Option<f64>,
}

impl TrainingSession {
    /// RPE x duration
    pub fn rpe_load(&self) -> Option<f64> {
        match (self.session_rpe, self.duration_minutes) {
            (Some(rpe), Some(duration)) => Some(rpe * duration),
            _ => None,
        }
    }

    /// Load used for high-load detection: power when recorded, RPE load otherwise
    pub fn training_load(&self) -> Option<f64> {
        if !self.kind.counts_toward_load() {
            return None;
        }
        self.power_load.or_else(|| self.rpe_load())
    }

    /// A session logged at or above the given RPE
    pub fn high_intensity(&self, rpe_threshold: f64) -> bool {
        self.session_rpe.map_or(false, |rpe| rpe >= rpe_threshold)
    }

    pub fn date(&self) -> NaiveDate {
        self.event_date.date_naive()
    }
}

/// A session flagged as unusually heavy relative to the athlete's recent load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighLoadSession {
    pub date: NaiveDate,

    pub sport_name: SportName,

    /// Load as a percentage of the heaviest session of this sport in the window
    pub percent_of_max: Option<u32>,
}

/// A dated scalar measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_session(kind: SessionKind, rpe: Option<f64>, power: Option<f64>) -> TrainingSession {
        TrainingSession {
            id: "session-1".to_string(),
            kind,
            sport_name: SportName::Soccer,
            event_date: Utc.with_ymd_and_hms(2024, 3, 4, 17, 0, 0).unwrap(),
            duration_minutes: Some(60.0),
            session_rpe: rpe,
            power_load: power,
        }
    }

    #[test]
    fn test_training_load_prefers_power() {
        let session = create_test_session(SessionKind::Practice, Some(5.0), None);
        assert_eq!(session.training_load(), Some(300.0));

        let session = create_test_session(SessionKind::Practice, Some(5.0), Some(210.0));
        assert_eq!(session.training_load(), Some(210.0));

        let session = create_test_session(SessionKind::Corrective, Some(5.0), None);
        assert_eq!(session.training_load(), None);
    }

    #[test]
    fn test_high_intensity() {
        let session = create_test_session(SessionKind::Game, Some(8.0), None);
        assert!(session.high_intensity(7.0));
        assert!(session.kind.is_competition());

        let session = create_test_session(SessionKind::Practice, None, None);
        assert!(!session.high_intensity(7.0));
    }

    #[test]
    fn test_sport_codes() {
        assert_eq!(SportName::try_from(14).unwrap(), SportName::Soccer);
        assert_eq!(SportName::try_from(24), Err(ValidationError::UnknownSport(24)));
        assert_eq!(serde_json::to_string(&SportName::Cycling).unwrap(), "3");
    }
}
