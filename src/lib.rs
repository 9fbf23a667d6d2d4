// Library interface for the soreness risk engine
// The CLI and the integration tests both go through these modules

pub mod body_parts;
pub mod config;
pub mod error;
pub mod high_load;
pub mod historic_soreness;
pub mod logging;
pub mod models;
pub mod processing;
pub mod soreness;
pub mod soreness_cause;
pub mod training_load;
pub mod trigger;
pub mod trigger_engine;
pub mod uncertainty;

// Re-export commonly used types for convenience
pub use body_parts::{BodyPartLocation, BodyPartSide, Side};
pub use config::EngineConfig;
pub use error::{Result, RiskEngineError, ValidationError};
pub use high_load::{HighLoadAnalysis, HighLoadDetector};
pub use historic_soreness::{HistoricSorenessState, HistoricSorenessStatus, HistoricSorenessTracker};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use processing::{AthleteDayInput, AthleteDayOutput, DailyRiskProcessor};
pub use soreness::{SorenessAccumulator, SorenessRecord, SorenessReport};
pub use soreness_cause::SorenessCause;
pub use training_load::{LoadHistory, LoadType, TrainingLoadCalculator, WeeklyLoadBucket};
pub use trigger::{Trigger, TriggerType};
pub use trigger_engine::{TriggerRuleEngine, TriggerSet};
pub use uncertainty::UncertaintyRange;
