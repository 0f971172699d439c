use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{joint_angle, vertical_gap},
    landmarks::{Joint, LandmarkFrame},
};

const KNEE_IDEAL_MIN: f64 = 170.0;
const KNEE_IDEAL_MAX: f64 = 180.0;
const KNEE_DEVIATION_GAIN: f64 = 2.0;
const HIP_TOLERANCE: f64 = 0.05;
const HIP_GAIN: f64 = 500.0;
const BACK_TOLERANCE: f64 = 0.3;
const BACK_GAIN: f64 = 200.0;
const SHOULDER_TOLERANCE: f64 = 0.03;
const SHOULDER_GAIN: f64 = 1000.0;
const RISK_SCORE_THRESHOLD: f64 = 70.0;

/// Joint groups scored on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoredJoint {
    LeftKnee,
    RightKnee,
    Hip,
    Back,
    Shoulder,
}

impl ScoredJoint {
    pub fn name(self) -> &'static str {
        match self {
            ScoredJoint::LeftKnee => "left_knee",
            ScoredJoint::RightKnee => "right_knee",
            ScoredJoint::Hip => "hip",
            ScoredJoint::Back => "back",
            ScoredJoint::Shoulder => "shoulder",
        }
    }
}

/// Per-frame 0-100 scores keyed by joint group.
pub type JointScores = BTreeMap<ScoredJoint, f64>;

/// Category of a form problem detected on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskKind {
    #[serde(rename = "Knee Valgus")]
    KneeValgus,
    #[serde(rename = "Back Rounding")]
    BackRounding,
}

impl fmt::Display for RiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskKind::KneeValgus => f.write_str("Knee Valgus"),
            RiskKind::BackRounding => f.write_str("Back Rounding"),
        }
    }
}

/// Body site a risk is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSite {
    LeftKnee,
    RightKnee,
    Spine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(rename = "type")]
    pub kind: RiskKind,
    pub joint: RiskSite,
}

impl Risk {
    pub fn new(kind: RiskKind, joint: RiskSite) -> Self {
        Self { kind, joint }
    }
}

/// Posture assessment of a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostureResult {
    /// Rounded mean of the joint scores, 0 to 100.
    pub total: u32,
    pub risks: Vec<Risk>,
    pub joint_scores: JointScores,
}

impl PostureResult {
    /// Result reported for frames that cannot be scored.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_risk(&self, kind: RiskKind) -> bool {
        self.risks.iter().any(|risk| risk.kind == kind)
    }
}

/// Scores posture quality frame by frame and keeps the results for the
/// session.
#[derive(Debug, Default)]
pub struct PostureScorer {
    history: Vec<PostureResult>,
    history_limit: Option<usize>,
}

impl PostureScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `limit` results in the history, discarding the oldest.
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            history: Vec::new(),
            history_limit: limit,
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[PostureResult] {
        &self.history
    }

    /// Scores `frame`. Incomplete frames produce an empty result that is not
    /// recorded.
    pub fn update(&mut self, frame: &LandmarkFrame) -> PostureResult {
        if !frame.is_complete() {
            return PostureResult::empty();
        }

        let mut scores = JointScores::new();
        let mut risks = Vec::new();

        let left_knee = knee_score(joint_angle(
            frame,
            Joint::LeftHip,
            Joint::LeftKnee,
            Joint::LeftAnkle,
        ));
        let right_knee = knee_score(joint_angle(
            frame,
            Joint::RightHip,
            Joint::RightKnee,
            Joint::RightAnkle,
        ));
        scores.insert(ScoredJoint::LeftKnee, left_knee);
        scores.insert(ScoredJoint::RightKnee, right_knee);

        if left_knee < RISK_SCORE_THRESHOLD {
            risks.push(Risk::new(RiskKind::KneeValgus, RiskSite::LeftKnee));
        }
        if right_knee < RISK_SCORE_THRESHOLD {
            risks.push(Risk::new(RiskKind::KneeValgus, RiskSite::RightKnee));
        }

        let hip_gap = vertical_gap(frame, Joint::LeftHip, Joint::RightHip);
        scores.insert(ScoredJoint::Hip, hip_score(hip_gap));

        let back = back_score(torso_drop(frame));
        scores.insert(ScoredJoint::Back, back);
        if back < RISK_SCORE_THRESHOLD {
            risks.push(Risk::new(RiskKind::BackRounding, RiskSite::Spine));
        }

        let shoulder_gap = vertical_gap(frame, Joint::LeftShoulder, Joint::RightShoulder);
        scores.insert(ScoredJoint::Shoulder, shoulder_score(shoulder_gap));

        let mean = scores.values().sum::<f64>() / scores.len() as f64;
        let result = PostureResult {
            total: mean.round().clamp(0.0, 100.0) as u32,
            risks,
            joint_scores: scores,
        };

        self.record(result.clone());
        result
    }

    fn record(&mut self, result: PostureResult) {
        self.history.push(result);
        if let Some(limit) = self.history_limit {
            if self.history.len() > limit {
                let overflow = self.history.len() - limit;
                self.history.drain(0..overflow);
            }
        }
    }
}

/// Vertical distance between the shoulder midpoint and the hip midpoint.
fn torso_drop(frame: &LandmarkFrame) -> f64 {
    let mid_y = |a: Joint, b: Joint| match (frame.get(a), frame.get(b)) {
        (Some(a), Some(b)) => (a.y + b.y) / 2.0,
        _ => 0.0,
    };
    let shoulders = mid_y(Joint::LeftShoulder, Joint::RightShoulder);
    let hips = mid_y(Joint::LeftHip, Joint::RightHip);
    (shoulders - hips).abs()
}

fn knee_score(angle: f64) -> f64 {
    score_in_range(angle, KNEE_IDEAL_MIN, KNEE_IDEAL_MAX)
}

/// 100 inside `[min, max]`, otherwise reduced by twice the distance to the
/// nearest bound.
fn score_in_range(angle: f64, min: f64, max: f64) -> f64 {
    if (min..=max).contains(&angle) {
        return 100.0;
    }
    let deviation = (angle - min).abs().min((angle - max).abs());
    (100.0 - deviation * KNEE_DEVIATION_GAIN).max(0.0)
}

fn hip_score(gap: f64) -> f64 {
    if gap < HIP_TOLERANCE {
        100.0
    } else {
        (100.0 - gap * HIP_GAIN).max(0.0)
    }
}

fn back_score(drop: f64) -> f64 {
    if drop > BACK_TOLERANCE {
        (100.0 - (drop - BACK_TOLERANCE) * BACK_GAIN).max(0.0)
    } else {
        100.0
    }
}

fn shoulder_score(gap: f64) -> f64 {
    if gap < SHOULDER_TOLERANCE {
        100.0
    } else {
        (100.0 - gap * SHOULDER_GAIN).max(0.0)
    }
}
