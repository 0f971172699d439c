//! Repetition counting and hold timing for the supported exercises.
//!
//! Rep exercises run a two-phase machine over a smoothed limb angle: the
//! machine enters [`ExercisePhase::Down`] once the smoothed angle drops under
//! the exercise's down threshold and counts a repetition when it climbs back
//! above the up threshold. Hold exercises time the current unbroken streak of
//! frames that satisfy the exercise's pose predicate; any invalid frame
//! restarts the streak from zero.

use std::{collections::VecDeque, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    clock::SharedClock,
    config::ExerciseConfig,
    geometry::joint_angle,
    landmarks::{Joint, LandmarkFrame},
    PoseCoachError,
};

const LEG_JOINTS: [Joint; 6] = [
    Joint::LeftHip,
    Joint::LeftKnee,
    Joint::LeftAnkle,
    Joint::RightHip,
    Joint::RightKnee,
    Joint::RightAnkle,
];
const ARM_JOINTS: [Joint; 6] = [
    Joint::LeftShoulder,
    Joint::LeftElbow,
    Joint::LeftWrist,
    Joint::RightShoulder,
    Joint::RightElbow,
    Joint::RightWrist,
];
const PLANK_JOINTS: [Joint; 4] = [
    Joint::LeftShoulder,
    Joint::LeftHip,
    Joint::LeftKnee,
    Joint::LeftAnkle,
];
const CHAIR_JOINTS: [Joint; 3] = [Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle];

const PLANK_MAX_DEVIATION: f64 = 20.0;
const TREE_STRAIGHT_MIN: f64 = 160.0;
const TREE_BENT_MAX: f64 = 130.0;
const CHAIR_KNEE_MIN: f64 = 90.0;
const CHAIR_KNEE_MAX: f64 = 120.0;

/// Exercises the state machine knows how to track.
///
/// Deserialization resolves names leniently through
/// [`Exercise::from_name_or_default`], so aliases and mixed case are accepted
/// and unknown names fall back to squat tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Exercise {
    Squat,
    Pushup,
    Lunge,
    Plank,
    Tree,
    Chair,
}

/// Angle thresholds of a repetition exercise, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepThresholds {
    pub down: f64,
    pub up: f64,
}

/// How progress is measured for an exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExerciseMode {
    Reps(RepThresholds),
    Hold,
}

impl Exercise {
    pub const ALL: [Exercise; 6] = [
        Exercise::Squat,
        Exercise::Pushup,
        Exercise::Lunge,
        Exercise::Plank,
        Exercise::Tree,
        Exercise::Chair,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Exercise::Squat => "squat",
            Exercise::Pushup => "pushup",
            Exercise::Lunge => "lunge",
            Exercise::Plank => "plank",
            Exercise::Tree => "tree",
            Exercise::Chair => "chair",
        }
    }

    pub fn mode(self) -> ExerciseMode {
        match self {
            Exercise::Squat | Exercise::Lunge => ExerciseMode::Reps(RepThresholds {
                down: 110.0,
                up: 150.0,
            }),
            Exercise::Pushup => ExerciseMode::Reps(RepThresholds {
                down: 100.0,
                up: 140.0,
            }),
            Exercise::Plank | Exercise::Tree | Exercise::Chair => ExerciseMode::Hold,
        }
    }

    /// Landmarks that must be trusted before a frame may drive the machine.
    pub fn required_joints(self) -> &'static [Joint] {
        match self {
            Exercise::Squat | Exercise::Lunge | Exercise::Tree => &LEG_JOINTS,
            Exercise::Pushup => &ARM_JOINTS,
            Exercise::Plank => &PLANK_JOINTS,
            Exercise::Chair => &CHAIR_JOINTS,
        }
    }

    pub fn is_hold(self) -> bool {
        matches!(self.mode(), ExerciseMode::Hold)
    }

    /// Resolves `name`, falling back to [`Exercise::Squat`] for anything
    /// unrecognised.
    ///
    /// The squat fallback reuses the knee-angle rep counter for every unknown
    /// exercise. That is only a reasonable guess for leg-driven movements, so
    /// callers adding new exercises should register them explicitly.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(name, "unrecognised exercise, falling back to squat tracking");
            Exercise::Squat
        })
    }
}

impl FromStr for Exercise {
    type Err = PoseCoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "squat" | "squats" => Ok(Exercise::Squat),
            "pushup" | "pushups" => Ok(Exercise::Pushup),
            "lunge" => Ok(Exercise::Lunge),
            "plank" => Ok(Exercise::Plank),
            "tree" => Ok(Exercise::Tree),
            "chair" => Ok(Exercise::Chair),
            _ => Err(PoseCoachError::UnknownExercise(s.to_string())),
        }
    }
}

impl From<String> for Exercise {
    fn from(name: String) -> Self {
        Self::from_name_or_default(&name)
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Phase reported alongside every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExercisePhase {
    Start,
    Down,
    Holding,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepPhase {
    Start,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExerciseState {
    Reps { phase: RepPhase, count: u32 },
    Hold { started_at: Option<Duration> },
}

impl ExerciseState {
    fn initial(exercise: Exercise) -> Self {
        match exercise.mode() {
            ExerciseMode::Reps(_) => ExerciseState::Reps {
                phase: RepPhase::Start,
                count: 0,
            },
            ExerciseMode::Hold => ExerciseState::Hold { started_at: None },
        }
    }
}

/// Outcome of feeding one frame to an [`ExerciseStateMachine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseUpdate {
    /// Repetitions so far, or whole seconds of the current hold.
    pub count: u32,
    pub phase: ExercisePhase,
    pub rep_detected: bool,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_joints: Vec<Joint>,
    /// Rounded smoothed limb angle for rep exercises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Fixed-size moving average used to de-jitter limb angles.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    samples: VecDeque<f64>,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// Adds a sample and returns the mean of the retained samples.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Per-session repetition counter / hold timer for one exercise.
#[derive(Debug)]
pub struct ExerciseStateMachine {
    exercise: Exercise,
    state: ExerciseState,
    smoother: MovingAverage,
    confidence_threshold: f64,
    clock: SharedClock,
}

impl ExerciseStateMachine {
    /// Creates a machine with the default thresholds.
    pub fn new(exercise: Exercise, clock: SharedClock) -> Self {
        Self::with_config(exercise, &ExerciseConfig::default(), clock)
    }

    pub fn with_config(exercise: Exercise, config: &ExerciseConfig, clock: SharedClock) -> Self {
        Self {
            exercise,
            state: ExerciseState::initial(exercise),
            smoother: MovingAverage::new(config.smoothing_window),
            confidence_threshold: config.confidence_threshold,
            clock,
        }
    }

    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    /// Clears counters, smoothing history and any running hold timer.
    pub fn reset(&mut self) {
        self.state = ExerciseState::initial(self.exercise);
        self.smoother.clear();
    }

    /// Switches to `exercise` and starts from a clean state.
    pub fn reset_to(&mut self, exercise: Exercise) {
        self.exercise = exercise;
        self.reset();
    }

    /// Current repetition count, or whole seconds held.
    pub fn count(&self) -> u32 {
        match self.state {
            ExerciseState::Reps { count, .. } => count,
            ExerciseState::Hold { started_at } => self.held_seconds(started_at),
        }
    }

    pub fn update(&mut self, frame: &LandmarkFrame) -> ExerciseUpdate {
        if !frame.is_complete() {
            return self.rejected(Vec::new(), None);
        }

        let invalid_joints: Vec<Joint> = self
            .exercise
            .required_joints()
            .iter()
            .copied()
            .filter(|joint| {
                let confidence = frame.confidence(*joint);
                confidence.is_nan() || confidence < self.confidence_threshold
            })
            .collect();

        if !invalid_joints.is_empty() {
            if let ExerciseState::Hold { started_at } = &mut self.state {
                *started_at = None;
            }
            tracing::debug!(exercise = %self.exercise, ?invalid_joints, "low confidence frame");
            let message = format!(
                "Adjust camera - joints low confidence: {}",
                invalid_joints
                    .iter()
                    .map(|joint| joint.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return self.rejected(invalid_joints, Some(message));
        }

        match self.exercise.mode() {
            ExerciseMode::Reps(thresholds) => self.update_reps(frame, thresholds),
            ExerciseMode::Hold => self.update_hold(frame),
        }
    }

    fn rejected(&self, invalid_joints: Vec<Joint>, message: Option<String>) -> ExerciseUpdate {
        ExerciseUpdate {
            count: self.count(),
            phase: self.current_phase(),
            rep_detected: false,
            is_valid: false,
            invalid_joints,
            angle: None,
            message,
        }
    }

    fn current_phase(&self) -> ExercisePhase {
        match self.state {
            ExerciseState::Reps {
                phase: RepPhase::Start,
                ..
            } => ExercisePhase::Start,
            ExerciseState::Reps {
                phase: RepPhase::Down,
                ..
            } => ExercisePhase::Down,
            ExerciseState::Hold {
                started_at: Some(_),
            } => ExercisePhase::Holding,
            ExerciseState::Hold { started_at: None } => ExercisePhase::Break,
        }
    }

    fn update_reps(&mut self, frame: &LandmarkFrame, thresholds: RepThresholds) -> ExerciseUpdate {
        let angle = self.limb_angle(frame);
        let smoothed = self.smoother.push(angle);
        let mut rep_detected = false;

        if let ExerciseState::Reps { phase, count } = &mut self.state {
            if smoothed < thresholds.down {
                if *phase == RepPhase::Start {
                    *phase = RepPhase::Down;
                    tracing::debug!(exercise = %self.exercise, angle = smoothed, "phase down");
                }
            } else if smoothed > thresholds.up && *phase == RepPhase::Down {
                *phase = RepPhase::Start;
                *count += 1;
                rep_detected = true;
                tracing::debug!(
                    exercise = %self.exercise,
                    reps = *count,
                    angle = smoothed,
                    "repetition counted"
                );
            }
        }

        ExerciseUpdate {
            count: self.count(),
            phase: self.current_phase(),
            rep_detected,
            is_valid: true,
            invalid_joints: Vec::new(),
            angle: Some(smoothed.round()),
            message: None,
        }
    }

    /// Tracked limb angle: the tighter of the two sides.
    fn limb_angle(&self, frame: &LandmarkFrame) -> f64 {
        let (left, right) = match self.exercise {
            Exercise::Pushup => (
                joint_angle(frame, Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist),
                joint_angle(frame, Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist),
            ),
            _ => knee_angles(frame),
        };
        left.min(right)
    }

    fn update_hold(&mut self, frame: &LandmarkFrame) -> ExerciseUpdate {
        let now = self.clock.now();
        let is_valid = self.hold_pose_valid(frame);

        if let ExerciseState::Hold { started_at } = &mut self.state {
            match (is_valid, *started_at) {
                (true, None) => {
                    *started_at = Some(now);
                    tracing::info!(exercise = %self.exercise, "hold started");
                }
                (false, Some(_)) => {
                    *started_at = None;
                    tracing::info!(exercise = %self.exercise, "form broken, hold timer reset");
                }
                _ => {}
            }
        }

        ExerciseUpdate {
            count: self.count(),
            phase: if is_valid {
                ExercisePhase::Holding
            } else {
                ExercisePhase::Break
            },
            rep_detected: false,
            is_valid,
            invalid_joints: Vec::new(),
            angle: None,
            message: None,
        }
    }

    fn hold_pose_valid(&self, frame: &LandmarkFrame) -> bool {
        match self.exercise {
            Exercise::Plank => {
                let hip = joint_angle(frame, Joint::LeftShoulder, Joint::LeftHip, Joint::LeftKnee);
                let knee = joint_angle(frame, Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle);
                (180.0 - hip).abs() < PLANK_MAX_DEVIATION
                    && (180.0 - knee).abs() < PLANK_MAX_DEVIATION
            }
            Exercise::Tree => {
                let (left, right) = knee_angles(frame);
                let one_straight = left > TREE_STRAIGHT_MIN || right > TREE_STRAIGHT_MIN;
                let one_bent = left < TREE_BENT_MAX || right < TREE_BENT_MAX;
                one_straight && one_bent
            }
            Exercise::Chair => {
                let knee = joint_angle(frame, Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle);
                (CHAIR_KNEE_MIN..=CHAIR_KNEE_MAX).contains(&knee)
            }
            Exercise::Squat | Exercise::Pushup | Exercise::Lunge => false,
        }
    }

    fn held_seconds(&self, started_at: Option<Duration>) -> u32 {
        started_at
            .map(|start| {
                let held = self.clock.now().saturating_sub(start).as_secs();
                u32::try_from(held).unwrap_or(u32::MAX)
            })
            .unwrap_or(0)
    }
}

fn knee_angles(frame: &LandmarkFrame) -> (f64, f64) {
    (
        joint_angle(frame, Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle),
        joint_angle(frame, Joint::RightHip, Joint::RightKnee, Joint::RightAnkle),
    )
}
