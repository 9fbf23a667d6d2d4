//! Body part vocabulary and muscle relationships
//!
//! Integer codes are part of the stored data format and must not change.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reported body part, serialized as its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BodyPartLocation {
    Head = 0,
    Shoulder = 1,
    Chest = 2,
    Abdominals = 3,
    Hip = 4,
    Groin = 5,
    Quads = 6,
    Knee = 7,
    Shin = 8,
    Ankle = 9,
    Foot = 10,
    ItBand = 11,
    LowerBack = 12,
    General = 13,
    Glutes = 14,
    Hamstrings = 15,
    Calves = 16,
    Achilles = 17,
    UpperBackNeck = 18,
    Elbow = 19,
    Wrist = 20,
    Lats = 21,
    Biceps = 22,
    Triceps = 23,
    Forearm = 24,
    CoreStabilizers = 25,
    ErectorSpinae = 26,
    ItBandLateralKnee = 27,
    HipFlexor = 28,
    Deltoid = 29,
    DeepRotatorsHip = 30,
    Obliques = 31,
    ForearmIntrinsicMuscles = 32,
    ForearmExtrinsicMuscles = 33,
    IntrinsicMusclesOfSpine = 34,
    Diaphragm = 35,
    PelvicFloor = 36,
    LatissimusDorsi = 37,
}

impl BodyPartLocation {
    pub const ALL: [BodyPartLocation; 38] = [
        BodyPartLocation::Head,
        BodyPartLocation::Shoulder,
        BodyPartLocation::Chest,
        BodyPartLocation::Abdominals,
        BodyPartLocation::Hip,
        BodyPartLocation::Groin,
        BodyPartLocation::Quads,
        BodyPartLocation::Knee,
        BodyPartLocation::Shin,
        BodyPartLocation::Ankle,
        BodyPartLocation::Foot,
        BodyPartLocation::ItBand,
        BodyPartLocation::LowerBack,
        BodyPartLocation::General,
        BodyPartLocation::Glutes,
        BodyPartLocation::Hamstrings,
        BodyPartLocation::Calves,
        BodyPartLocation::Achilles,
        BodyPartLocation::UpperBackNeck,
        BodyPartLocation::Elbow,
        BodyPartLocation::Wrist,
        BodyPartLocation::Lats,
        BodyPartLocation::Biceps,
        BodyPartLocation::Triceps,
        BodyPartLocation::Forearm,
        BodyPartLocation::CoreStabilizers,
        BodyPartLocation::ErectorSpinae,
        BodyPartLocation::ItBandLateralKnee,
        BodyPartLocation::HipFlexor,
        BodyPartLocation::Deltoid,
        BodyPartLocation::DeepRotatorsHip,
        BodyPartLocation::Obliques,
        BodyPartLocation::ForearmIntrinsicMuscles,
        BodyPartLocation::ForearmExtrinsicMuscles,
        BodyPartLocation::IntrinsicMusclesOfSpine,
        BodyPartLocation::Diaphragm,
        BodyPartLocation::PelvicFloor,
        BodyPartLocation::LatissimusDorsi,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Joints and connective tissue rather than muscle bellies
    pub fn is_joint(self) -> bool {
        matches!(
            self,
            BodyPartLocation::Hip
                | BodyPartLocation::Knee
                | BodyPartLocation::Ankle
                | BodyPartLocation::Foot
                | BodyPartLocation::Achilles
                | BodyPartLocation::Elbow
                | BodyPartLocation::Wrist
        )
    }

    pub fn is_muscle(self) -> bool {
        !self.is_joint() && !matches!(self, BodyPartLocation::Head | BodyPartLocation::General)
    }

    /// Whether the part exists on both sides of the body
    pub fn is_bilateral(self) -> bool {
        !matches!(
            self,
            BodyPartLocation::Head
                | BodyPartLocation::Abdominals
                | BodyPartLocation::LowerBack
                | BodyPartLocation::General
                | BodyPartLocation::UpperBackNeck
                | BodyPartLocation::CoreStabilizers
                | BodyPartLocation::ErectorSpinae
                | BodyPartLocation::IntrinsicMusclesOfSpine
                | BodyPartLocation::Diaphragm
                | BodyPartLocation::PelvicFloor
        )
    }

    pub fn region(self) -> BodyRegion {
        use BodyPartLocation::*;
        match self {
            Shoulder | Chest | UpperBackNeck | Elbow | Wrist | Lats | Biceps | Triceps
            | Forearm | Deltoid | ForearmIntrinsicMuscles | ForearmExtrinsicMuscles
            | LatissimusDorsi | Head => BodyRegion::Upper,
            Hip | Groin | Quads | Knee | Shin | Ankle | Foot | ItBand | Glutes | Hamstrings
            | Calves | Achilles | ItBandLateralKnee | HipFlexor | DeepRotatorsHip => {
                BodyRegion::Lower
            }
            Abdominals | LowerBack | CoreStabilizers | ErectorSpinae | Obliques
            | IntrinsicMusclesOfSpine | Diaphragm | PelvicFloor | General => BodyRegion::Core,
        }
    }

    /// Muscles that share, oppose or assist this part's work
    pub fn relations(self) -> BodyPartRelations {
        use BodyPartLocation::*;
        let (agonists, antagonists, synergists): (
            &'static [BodyPartLocation],
            &'static [BodyPartLocation],
            &'static [BodyPartLocation],
        ) = match self {
            Head | General => (&[], &[], &[]),
            Shoulder => (&[Deltoid], &[Lats], &[Chest, UpperBackNeck]),
            Chest => (&[], &[UpperBackNeck], &[Shoulder, Triceps]),
            Abdominals => (&[Obliques], &[LowerBack], &[HipFlexor, CoreStabilizers]),
            Hip => (&[HipFlexor], &[Glutes], &[Groin, DeepRotatorsHip]),
            Groin => (&[], &[ItBand], &[HipFlexor, Quads]),
            Quads => (&[HipFlexor], &[Hamstrings], &[Groin, ItBand]),
            Knee => (&[Quads], &[Hamstrings], &[Calves, ItBandLateralKnee]),
            Shin => (&[], &[Calves], &[Foot]),
            Ankle => (&[Shin], &[Calves], &[Foot]),
            Foot => (&[], &[Shin], &[Calves]),
            ItBand => (&[Glutes], &[Groin], &[Quads, Hip]),
            LowerBack => (&[ErectorSpinae], &[Abdominals], &[Glutes, Hamstrings]),
            Glutes => (&[Hamstrings], &[HipFlexor], &[LowerBack, ItBand]),
            Hamstrings => (&[Glutes], &[Quads], &[Calves, LowerBack]),
            Calves => (&[Achilles], &[Shin], &[Hamstrings, Foot]),
            Achilles => (&[Calves], &[Shin], &[Foot]),
            UpperBackNeck => (&[], &[Chest], &[Shoulder, Lats]),
            Elbow => (&[Biceps], &[Triceps], &[Forearm]),
            Wrist => (&[Forearm], &[], &[Elbow]),
            Lats => (&[LatissimusDorsi], &[Deltoid], &[UpperBackNeck, Biceps]),
            Biceps => (&[Forearm], &[Triceps], &[Shoulder]),
            Triceps => (&[], &[Biceps], &[Chest, Shoulder]),
            Forearm => (&[Biceps], &[], &[Wrist]),
            CoreStabilizers => (&[Abdominals], &[], &[Obliques, LowerBack]),
            ErectorSpinae => (&[LowerBack], &[Abdominals], &[Glutes]),
            ItBandLateralKnee => (&[ItBand], &[Groin], &[Knee]),
            HipFlexor => (&[Quads], &[Glutes], &[Abdominals, Groin]),
            Deltoid => (&[Shoulder], &[Lats], &[Chest, Triceps]),
            DeepRotatorsHip => (&[Glutes], &[Groin], &[Hip]),
            Obliques => (&[Abdominals], &[], &[CoreStabilizers]),
            ForearmIntrinsicMuscles => (&[ForearmExtrinsicMuscles], &[], &[Wrist]),
            ForearmExtrinsicMuscles => (&[ForearmIntrinsicMuscles], &[], &[Elbow, Wrist]),
            IntrinsicMusclesOfSpine => (&[ErectorSpinae], &[], &[CoreStabilizers]),
            Diaphragm | PelvicFloor => (&[], &[], &[CoreStabilizers]),
            LatissimusDorsi => (&[Lats], &[Deltoid], &[UpperBackNeck]),
        };

        BodyPartRelations {
            agonists,
            antagonists,
            synergists,
        }
    }
}

impl TryFrom<u8> for BodyPartLocation {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        BodyPartLocation::ALL
            .get(code as usize)
            .copied()
            .ok_or(ValidationError::UnknownBodyPart(code))
    }
}

impl From<BodyPartLocation> for u8 {
    fn from(location: BodyPartLocation) -> u8 {
        location.code()
    }
}

impl fmt::Display for BodyPartLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Coarse grouping used when judging co-occurrence patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyRegion {
    Upper,
    Lower,
    Core,
}

/// Side of the body; `Bilateral` also stands for "not reported"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    #[default]
    Bilateral = 0,
    Left = 1,
    Right = 2,
}

impl Side {
    /// Left for right and right for left
    pub fn opposite(self) -> Option<Side> {
        match self {
            Side::Left => Some(Side::Right),
            Side::Right => Some(Side::Left),
            Side::Bilateral => None,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Side::Bilateral),
            1 => Ok(Side::Left),
            2 => Ok(Side::Right),
            other => Err(ValidationError::UnknownSide(other)),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        side as u8
    }
}

/// A body part pinned to one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyPartSide {
    pub location: BodyPartLocation,
    pub side: Side,
}

impl BodyPartSide {
    pub fn new(location: BodyPartLocation, side: Side) -> Self {
        BodyPartSide { location, side }
    }
}

impl fmt::Display for BodyPartSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            Side::Bilateral => write!(f, "{}", self.location),
            Side::Left => write!(f, "{} (left)", self.location),
            Side::Right => write!(f, "{} (right)", self.location),
        }
    }
}

/// Static relationship lists for one body part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyPartRelations {
    pub agonists: &'static [BodyPartLocation],
    pub antagonists: &'static [BodyPartLocation],
    pub synergists: &'static [BodyPartLocation],
}

/// Expand relation locations into sided entries
///
/// Bilateral relations become both sides when `side` is unreported, or the
/// reported side otherwise. Midline relations always get side 0.
pub fn expand_relations(locations: &[BodyPartLocation], side: Side) -> Vec<BodyPartSide> {
    let mut expanded = Vec::with_capacity(locations.len() * 2);
    for &location in locations {
        if !location.is_bilateral() {
            expanded.push(BodyPartSide::new(location, Side::Bilateral));
        } else if side == Side::Bilateral {
            expanded.push(BodyPartSide::new(location, Side::Left));
            expanded.push(BodyPartSide::new(location, Side::Right));
        } else {
            expanded.push(BodyPartSide::new(location, side));
        }
    }
    expanded
}
