// ABOUTME: Body-part descriptor table for biomechanical measurements
// ABOUTME: Each body part statically carries its metric list and a left/right side split
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Body side of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left side of the body
    Left,
    /// Right side of the body
    Right,
}

impl Side {
    /// Both sides in summary order
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// Lowercase name used in serialized output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

const HIP_METRICS: &[&str] = &[
    "flexion_avg",
    "adduction_avg",
    "rotation_avg",
    "flexion_std",
    "adduction_std",
    "rotation_std",
];
const KNEE_METRICS: &[&str] = &["angle_avg", "angle_std"];
const ANKLE_METRICS: &[&str] = &[
    "subtalar_angle_avg",
    "angle_avg",
    "subtalar_angle_std",
    "angle_std",
];
const PELVIS_METRICS: &[&str] = &[
    "tilt_angle_avg",
    "list_angle_avg",
    "rotation_angle_avg",
    "tilt_angle_std",
    "list_angle_std",
    "rotation_angle_std",
];
const MUSCLE_METRICS: &[&str] = &["force_avg", "force_std"];

/// Joints and muscle groups measured in every gait phase
///
/// Variants are declared in summary order; `Ord` follows declaration order so
/// maps keyed by `BodyPart` iterate joints first, then muscles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BodyPart {
    /// Hip joint
    Hip,
    /// Knee joint
    Knee,
    /// Ankle joint (including subtalar)
    Ankle,
    /// Pelvis orientation
    Pelvis,
    /// Soleus muscle
    Soleus,
    /// Tibialis anterior muscle
    TibialisAnterior,
    /// Medial gastrocnemius muscle
    MedialGastrocnemius,
    /// Lateral gastrocnemius muscle
    LateralGastrocnemius,
}

impl BodyPart {
    /// Every measured body part
    pub const ALL: [Self; 8] = [
        Self::Hip,
        Self::Knee,
        Self::Ankle,
        Self::Pelvis,
        Self::Soleus,
        Self::TibialisAnterior,
        Self::MedialGastrocnemius,
        Self::LateralGastrocnemius,
    ];

    /// Body parts included in exercise summaries (joint kinematics only)
    pub const SUMMARIZED: [Self; 4] = [Self::Hip, Self::Knee, Self::Ankle, Self::Pelvis];

    /// Display name used as the summary key
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hip => "Hip",
            Self::Knee => "Knee",
            Self::Ankle => "Ankle",
            Self::Pelvis => "Pelvis",
            Self::Soleus => "Soleus",
            Self::TibialisAnterior => "TibialisAnterior",
            Self::MedialGastrocnemius => "MedialGastrocnemius",
            Self::LateralGastrocnemius => "LateralGastrocnemius",
        }
    }

    /// Metric columns recorded for each side, in summary order
    #[must_use]
    pub const fn metrics(&self) -> &'static [&'static str] {
        match self {
            Self::Hip => HIP_METRICS,
            Self::Knee => KNEE_METRICS,
            Self::Ankle => ANKLE_METRICS,
            Self::Pelvis => PELVIS_METRICS,
            Self::Soleus
            | Self::TibialisAnterior
            | Self::MedialGastrocnemius
            | Self::LateralGastrocnemius => MUSCLE_METRICS,
        }
    }

    /// Whether this body part is a muscle group rather than a joint
    #[must_use]
    pub const fn is_muscle(&self) -> bool {
        matches!(
            self,
            Self::Soleus
                | Self::TibialisAnterior
                | Self::MedialGastrocnemius
                | Self::LateralGastrocnemius
        )
    }

    /// Whether `metric` is one of this body part's declared columns
    #[must_use]
    pub fn has_metric(&self, metric: &str) -> bool {
        self.metrics().contains(&metric)
    }
}

impl Display for BodyPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarized_parts_are_joints() {
        assert!(BodyPart::SUMMARIZED.iter().all(|part| !part.is_muscle()));
        assert_eq!(BodyPart::ALL.iter().filter(|part| part.is_muscle()).count(), 4);
    }

    #[test]
    fn test_ordering_follows_declaration() {
        let mut parts = vec![BodyPart::Pelvis, BodyPart::Soleus, BodyPart::Hip, BodyPart::Knee];
        parts.sort();
        assert_eq!(
            parts,
            vec![BodyPart::Hip, BodyPart::Knee, BodyPart::Pelvis, BodyPart::Soleus]
        );
    }

    #[test]
    fn test_metric_tables() {
        assert_eq!(BodyPart::Hip.metrics().len(), 6);
        assert!(BodyPart::Ankle.has_metric("subtalar_angle_avg"));
        assert!(!BodyPart::Knee.has_metric("force_avg"));
        assert_eq!(BodyPart::LateralGastrocnemius.metrics(), &["force_avg", "force_std"]);
    }
}
