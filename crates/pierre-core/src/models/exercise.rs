// ABOUTME: Exercise record hierarchy: record, per-segment units, and gait phase samples
// ABOUTME: Gait phases own per-body-part left/right measurement rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::body_part::{BodyPart, Side};
use super::profile::RecordRef;
use crate::errors::{AppError, AppResult};

/// Kind of logged exercise session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Running session
    Run,
    /// Walking session
    Walk,
    /// Jump test
    Jump,
    /// Squat set
    Squat,
    /// Landing test
    Land,
    /// Lunge set
    Lunge,
}

impl ActivityKind {
    /// Lowercase identifier used in serialized output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Walk => "walk",
            Self::Jump => "jump",
            Self::Squat => "squat",
            Self::Land => "land",
            Self::Lunge => "lunge",
        }
    }
}

impl Display for ActivityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "run" => Ok(Self::Run),
            "walk" => Ok(Self::Walk),
            "jump" => Ok(Self::Jump),
            "squat" => Ok(Self::Squat),
            "land" => Ok(Self::Land),
            "lunge" => Ok(Self::Lunge),
            other => Err(AppError::invalid_input(format!(
                "unknown activity kind '{other}'"
            ))),
        }
    }
}

/// Named metric values recorded for one side of one body part
pub type Measurements = BTreeMap<String, f64>;

/// Left and right measurement rows of a single body part within a gait phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyPartMeasurement {
    /// Left-side measurements
    #[serde(default)]
    pub left: Measurements,
    /// Right-side measurements
    #[serde(default)]
    pub right: Measurements,
}

impl BodyPartMeasurement {
    /// Measurements for one side
    #[must_use]
    pub const fn side(&self, side: Side) -> &Measurements {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Mutable measurements for one side
    pub fn side_mut(&mut self, side: Side) -> &mut Measurements {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// One sampled position within a movement cycle
///
/// The phase owns its body-part rows; dropping or removing a phase removes
/// every measurement recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitPhase {
    /// Position within the cycle, `0.0..=1.0`
    pub phase: f64,
    /// Measurements keyed by body part
    #[serde(default)]
    pub body_parts: BTreeMap<BodyPart, BodyPartMeasurement>,
}

impl GaitPhase {
    /// Create an empty gait phase sample
    ///
    /// # Errors
    ///
    /// Returns an error if `phase` lies outside `0.0..=1.0`.
    pub fn new(phase: f64) -> AppResult<Self> {
        if !(0.0..=1.0).contains(&phase) {
            return Err(AppError::invalid_input(format!(
                "gait phase position {phase} must be within 0..=1"
            )));
        }
        Ok(Self {
            phase,
            body_parts: BTreeMap::new(),
        })
    }

    /// Add a measurement, returning the updated phase
    #[must_use]
    pub fn with_measurement(
        mut self,
        part: BodyPart,
        side: Side,
        metric: impl Into<String>,
        value: f64,
    ) -> Self {
        self.body_parts
            .entry(part)
            .or_default()
            .side_mut(side)
            .insert(metric.into(), value);
        self
    }

    /// Look up one measurement
    #[must_use]
    pub fn measurement(&self, part: BodyPart, side: Side, metric: &str) -> Option<f64> {
        self.body_parts
            .get(&part)
            .and_then(|row| row.side(side).get(metric))
            .copied()
    }

    /// Remove every measurement of a body part from this phase
    pub fn remove_body_part(&mut self, part: BodyPart) -> Option<BodyPartMeasurement> {
        self.body_parts.remove(&part)
    }
}

/// One segment of an exercise (for runs, one kilometer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseUnit {
    /// Average speed over the segment
    pub speed: f64,
    /// Ordered gait phase samples
    #[serde(default)]
    pub gait_phases: Vec<GaitPhase>,
}

impl ExerciseUnit {
    /// Create a unit with the given speed and phases
    #[must_use]
    pub const fn new(speed: f64, gait_phases: Vec<GaitPhase>) -> Self {
        Self { speed, gait_phases }
    }

    /// Every value recorded for `metric` on one side of `part`, in phase order
    #[must_use]
    pub fn series(&self, part: BodyPart, side: Side, metric: &str) -> Vec<f64> {
        self.gait_phases
            .iter()
            .filter_map(|phase| phase.measurement(part, side, metric))
            .collect()
    }

    /// Whether any phase carries a row for `part`
    #[must_use]
    pub fn has_body_part(&self, part: BodyPart) -> bool {
        self.gait_phases
            .iter()
            .any(|phase| phase.body_parts.contains_key(&part))
    }
}

/// One completed activity instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    /// Record identifier
    pub id: u64,
    /// Owning user identifier
    pub user_id: u64,
    /// Kind of activity
    pub kind: ActivityKind,
    /// Day the activity took place
    pub date: NaiveDate,
    /// Ordered segments
    #[serde(default)]
    pub units: Vec<ExerciseUnit>,
}

impl ExerciseRecord {
    /// Lightweight reference used in profiles and prompts
    #[must_use]
    pub const fn reference(&self) -> RecordRef {
        RecordRef {
            id: self.id,
            kind: self.kind,
            date: self.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gait_phase_rejects_out_of_range() {
        assert!(GaitPhase::new(1.5).is_err());
        assert!(GaitPhase::new(-0.1).is_err());
        assert!(GaitPhase::new(0.0).is_ok());
    }

    #[test]
    fn test_series_collects_in_phase_order() {
        let phases = vec![
            GaitPhase::new(0.0)
                .unwrap()
                .with_measurement(BodyPart::Knee, Side::Left, "angle_avg", 10.0),
            GaitPhase::new(0.5).unwrap(),
            GaitPhase::new(1.0)
                .unwrap()
                .with_measurement(BodyPart::Knee, Side::Left, "angle_avg", 12.0),
        ];
        let unit = ExerciseUnit::new(3.2, phases);

        assert_eq!(unit.series(BodyPart::Knee, Side::Left, "angle_avg"), vec![10.0, 12.0]);
        assert!(unit.series(BodyPart::Knee, Side::Right, "angle_avg").is_empty());
        assert!(unit.has_body_part(BodyPart::Knee));
        assert!(!unit.has_body_part(BodyPart::Hip));
    }

    #[test]
    fn test_removing_body_part_drops_both_sides() {
        let mut phase = GaitPhase::new(0.2)
            .unwrap()
            .with_measurement(BodyPart::Hip, Side::Left, "flexion_avg", 30.0)
            .with_measurement(BodyPart::Hip, Side::Right, "flexion_avg", 31.0);

        assert!(phase.remove_body_part(BodyPart::Hip).is_some());
        assert_eq!(phase.measurement(BodyPart::Hip, Side::Right, "flexion_avg"), None);
    }

    #[test]
    fn test_activity_kind_parsing() {
        assert_eq!("Run".parse::<ActivityKind>().unwrap(), ActivityKind::Run);
        assert!("swim".parse::<ActivityKind>().is_err());
    }
}
