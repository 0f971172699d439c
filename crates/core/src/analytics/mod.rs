//! Post-workout analytics over a session's posture history.

use serde::{Deserialize, Serialize};

use crate::posture::{PostureResult, ScoredJoint};

const FATIGUE_WINDOW: usize = 5;
const HIGH_FATIGUE_DROP: f64 = 15.0;
const MODERATE_FATIGUE_DROP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FatigueRisk {
    Low,
    Moderate,
    High,
}

/// Worst observed strain per body region, as `100 - score`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointStress {
    pub knee: f64,
    pub hip: f64,
    pub back: f64,
    pub shoulder: f64,
}

/// One point of the score-over-time chart. `x` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: usize,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub best: u32,
    pub worst: u32,
}

/// Everything the summary screen needs, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutAnalytics {
    pub samples: usize,
    pub average_stability: u32,
    pub range: ScoreRange,
    pub fatigue_risk: FatigueRisk,
    pub joint_stress: JointStress,
}

pub fn summarize(history: &[PostureResult]) -> WorkoutAnalytics {
    let totals = totals(history);
    WorkoutAnalytics {
        samples: history.len(),
        average_stability: average_stability(history),
        range: score_range(&totals),
        fatigue_risk: fatigue_risk(history),
        joint_stress: joint_stress(history),
    }
}

pub fn fatigue_curve(history: &[PostureResult]) -> Vec<CurvePoint> {
    history
        .iter()
        .enumerate()
        .map(|(index, result)| CurvePoint {
            x: index + 1,
            y: result.total,
        })
        .collect()
}

pub fn joint_stress(history: &[PostureResult]) -> JointStress {
    let mut stress = JointStress::default();
    for (joint, score) in history.iter().flat_map(|result| result.joint_scores.iter()) {
        let strain = 100.0 - score;
        let slot = match joint {
            ScoredJoint::LeftKnee | ScoredJoint::RightKnee => &mut stress.knee,
            ScoredJoint::Hip => &mut stress.hip,
            ScoredJoint::Back => &mut stress.back,
            ScoredJoint::Shoulder => &mut stress.shoulder,
        };
        *slot = f64::max(*slot, strain);
    }
    stress
}

pub fn score_range(scores: &[u32]) -> ScoreRange {
    match (scores.iter().max(), scores.iter().min()) {
        (Some(best), Some(worst)) => ScoreRange {
            best: *best,
            worst: *worst,
        },
        _ => ScoreRange::default(),
    }
}

/// Compares the last five scores with the session mean.
pub fn fatigue_risk(history: &[PostureResult]) -> FatigueRisk {
    if history.len() < FATIGUE_WINDOW {
        return FatigueRisk::Low;
    }

    let totals = totals(history);
    let recent = mean(&totals[totals.len() - FATIGUE_WINDOW..]);
    let overall = mean(&totals);

    if recent < overall - HIGH_FATIGUE_DROP {
        FatigueRisk::High
    } else if recent < overall - MODERATE_FATIGUE_DROP {
        FatigueRisk::Moderate
    } else {
        FatigueRisk::Low
    }
}

pub fn average_stability(history: &[PostureResult]) -> u32 {
    if history.is_empty() {
        return 0;
    }
    mean(&totals(history)).round() as u32
}

fn totals(history: &[PostureResult]) -> Vec<u32> {
    history.iter().map(|result| result.total).collect()
}

fn mean(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|value| f64::from(*value)).sum::<f64>() / values.len() as f64
}
