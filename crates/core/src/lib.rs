//! Core library for the Pose Coach engine.
//!
//! Every module consumes 33-point body landmark frames produced by an
//! external pose estimator. Posture scoring, repetition and hold tracking,
//! coaching feedback and the mindfulness evaluators are independent engines
//! that share an injected [`Clock`] so that whole sessions can be replayed
//! deterministically. [`WorkoutSession`] wires them together per activity.

pub mod analytics;
pub mod clock;
pub mod coach;
pub mod config;
pub mod error;
pub mod exercise;
pub mod geometry;
pub mod landmarks;
pub mod mindfulness;
pub mod posture;
pub mod session;

#[cfg(test)]
mod fixtures;

pub use analytics::{FatigueRisk, JointStress, WorkoutAnalytics};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use coach::{CoachAdvisor, Persona, PhrasePicker, RandomPicker, SessionStats};
pub use config::{Activity, CoachConfig, ExerciseConfig, PostureConfig, SessionConfig};
pub use error::{PoseCoachError, Result};
pub use exercise::{Exercise, ExercisePhase, ExerciseStateMachine, ExerciseUpdate};
pub use geometry::angle_degrees;
pub use landmarks::{Joint, Landmark, LandmarkFrame, LANDMARK_COUNT};
pub use mindfulness::{
    MeditationEngine, MeditationUpdate, YogaPose, YogaPoseEvaluator, YogaUpdate,
};
pub use posture::{PostureResult, PostureScorer, Risk, RiskKind};
pub use session::{ExerciseTick, SessionOutput, SessionSummary, WorkoutSession};
