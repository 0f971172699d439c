use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    clock::SharedClock,
    geometry::joint_angle,
    landmarks::{Joint, Landmark, LandmarkFrame},
    PoseCoachError,
};

const ARM_LEVEL_TOLERANCE: f64 = 0.15;
const MIN_STANCE_WIDTH: f64 = 0.3;
const FRONT_KNEE_BENT_MAX: f64 = 130.0;
const FRONT_KNEE_DEEP_MAX: f64 = 110.0;
const STRAIGHT_LEG_MIN: f64 = 160.0;
const TREE_BENT_MAX: f64 = 120.0;
const SHOULDER_LEVEL_TOLERANCE: f64 = 0.05;

pub(crate) const NO_PERSON: &str = "No person detected";

/// Yoga poses with a correctness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YogaPose {
    #[serde(rename = "Warrior II")]
    WarriorII,
    #[serde(rename = "Tree Pose")]
    TreePose,
}

impl YogaPose {
    pub const ALL: [YogaPose; 2] = [YogaPose::WarriorII, YogaPose::TreePose];

    pub fn name(self) -> &'static str {
        match self {
            YogaPose::WarriorII => "Warrior II",
            YogaPose::TreePose => "Tree Pose",
        }
    }

    /// Judges a complete frame against the pose.
    pub fn check(self, frame: &LandmarkFrame) -> PoseCheck {
        match self {
            YogaPose::WarriorII => check_warrior_ii(frame),
            YogaPose::TreePose => check_tree_pose(frame),
        }
    }
}

impl FromStr for YogaPose {
    type Err = PoseCoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "warriorii" | "warrior2" => Ok(YogaPose::WarriorII),
            "treepose" | "tree" => Ok(YogaPose::TreePose),
            _ => Err(PoseCoachError::UnknownPose(s.to_string())),
        }
    }
}

impl fmt::Display for YogaPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Verdict of a single pose check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseCheck {
    pub is_correct: bool,
    pub feedback: &'static str,
    pub score: u32,
}

impl PoseCheck {
    fn correct(feedback: &'static str) -> Self {
        Self {
            is_correct: true,
            feedback,
            score: 100,
        }
    }

    fn incorrect(feedback: &'static str, score: u32) -> Self {
        Self {
            is_correct: false,
            feedback,
            score,
        }
    }
}

fn point(frame: &LandmarkFrame, joint: Joint) -> Landmark {
    frame.get(joint).copied().unwrap_or_default()
}

/// Arms level with the shoulders, wide stance, one knee bent and the other
/// straight.
pub fn check_warrior_ii(frame: &LandmarkFrame) -> PoseCheck {
    let arm_offset = (point(frame, Joint::LeftWrist).y - point(frame, Joint::LeftShoulder).y).abs()
        + (point(frame, Joint::RightWrist).y - point(frame, Joint::RightShoulder).y).abs();
    if arm_offset > ARM_LEVEL_TOLERANCE {
        return PoseCheck::incorrect("Raise arms to shoulder height", 50);
    }

    let stance = (point(frame, Joint::LeftAnkle).x - point(frame, Joint::RightAnkle).x).abs();
    if stance < MIN_STANCE_WIDTH {
        return PoseCheck::incorrect("Widen your stance", 60);
    }

    let left = joint_angle(frame, Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle);
    let right = joint_angle(frame, Joint::RightHip, Joint::RightKnee, Joint::RightAnkle);
    let front = if left < FRONT_KNEE_BENT_MAX && right > STRAIGHT_LEG_MIN {
        left
    } else if right < FRONT_KNEE_BENT_MAX && left > STRAIGHT_LEG_MIN {
        right
    } else {
        return PoseCheck::incorrect("Bend one knee, keep other straight", 60);
    };

    if front > FRONT_KNEE_DEEP_MAX {
        return PoseCheck::incorrect("Bend front knee more", 70);
    }

    PoseCheck::correct("Perfect Warrior II!")
}

/// One leg straight, the other folded high, shoulders level.
pub fn check_tree_pose(frame: &LandmarkFrame) -> PoseCheck {
    let left = joint_angle(frame, Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle);
    let right = joint_angle(frame, Joint::RightHip, Joint::RightKnee, Joint::RightAnkle);

    let standing_left = left > STRAIGHT_LEG_MIN && right < TREE_BENT_MAX;
    let standing_right = right > STRAIGHT_LEG_MIN && left < TREE_BENT_MAX;
    if !(standing_left || standing_right) {
        return PoseCheck::incorrect("Place foot on inner thigh/calf", 60);
    }

    let shoulder_gap =
        (point(frame, Joint::LeftShoulder).y - point(frame, Joint::RightShoulder).y).abs();
    if shoulder_gap > SHOULDER_LEVEL_TOLERANCE {
        return PoseCheck::incorrect("Level your shoulders", 80);
    }

    PoseCheck::correct("Great balance!")
}

/// Result of one [`YogaPoseEvaluator::update`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YogaUpdate {
    pub feedback: String,
    pub is_correct: bool,
    /// Whole seconds accumulated in the correct pose since the last reset.
    pub hold_seconds: u64,
    /// Length of the latest unbroken hold, kept after a break until the next
    /// hold starts.
    pub current_hold_seconds: f64,
    /// Rounded mean score of the correct frames.
    pub score: u32,
}

/// Times how long a yoga pose is held.
///
/// Hold time accumulates across breaks: every correct frame adds the time
/// elapsed since the previous update, and only [`YogaPoseEvaluator::reset`]
/// or a pose change clears the total.
#[derive(Debug)]
pub struct YogaPoseEvaluator {
    pose: YogaPose,
    clock: SharedClock,
    total_hold: Duration,
    hold_started: Option<Duration>,
    /// Length of the latest continuous hold. Kept through a break.
    current_hold: Duration,
    last_update: Option<Duration>,
    score_sum: u64,
    score_count: u64,
    feedback: String,
}

impl YogaPoseEvaluator {
    pub fn new(pose: YogaPose, clock: SharedClock) -> Self {
        Self {
            pose,
            clock,
            total_hold: Duration::ZERO,
            hold_started: None,
            current_hold: Duration::ZERO,
            last_update: None,
            score_sum: 0,
            score_count: 0,
            feedback: "Get ready...".to_string(),
        }
    }

    pub fn pose(&self) -> YogaPose {
        self.pose
    }

    pub fn set_pose(&mut self, pose: YogaPose) {
        self.pose = pose;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.total_hold = Duration::ZERO;
        self.hold_started = None;
        self.current_hold = Duration::ZERO;
        self.last_update = None;
        self.score_sum = 0;
        self.score_count = 0;
        self.feedback = "Get ready...".to_string();
    }

    /// Accumulated hold time since the last reset.
    pub fn total_hold(&self) -> Duration {
        self.total_hold
    }

    pub fn update(&mut self, frame: &LandmarkFrame) -> YogaUpdate {
        if !frame.is_complete() {
            return YogaUpdate {
                feedback: NO_PERSON.to_string(),
                is_correct: false,
                ..self.snapshot(false)
            };
        }

        let now = self.clock.now();
        let check = self.pose.check(frame);

        if check.is_correct {
            let started = *self.hold_started.get_or_insert_with(|| {
                tracing::info!(pose = %self.pose, "pose hold started");
                now
            });
            self.current_hold = now.saturating_sub(started);
            if let Some(last) = self.last_update {
                self.total_hold += now.saturating_sub(last);
            }
            self.score_sum += u64::from(check.score);
            self.score_count += 1;
        } else if self.hold_started.take().is_some() {
            tracing::info!(pose = %self.pose, feedback = check.feedback, "pose hold broken");
        }
        self.last_update = Some(now);
        self.feedback = check.feedback.to_string();

        self.snapshot(check.is_correct)
    }

    fn snapshot(&self, is_correct: bool) -> YogaUpdate {
        let score = if self.score_count == 0 {
            0
        } else {
            (self.score_sum as f64 / self.score_count as f64).round() as u32
        };

        YogaUpdate {
            feedback: self.feedback.clone(),
            is_correct,
            hold_seconds: self.total_hold.as_secs(),
            current_hold_seconds: self.current_hold.as_secs_f64(),
            score,
        }
    }
}
