//! Static-hold and breathing activities that replace repetition tracking.

mod meditation;
mod yoga;

pub use meditation::{MeditationEngine, MeditationUpdate};
pub use yoga::{
    check_tree_pose, check_warrior_ii, PoseCheck, YogaPose, YogaPoseEvaluator, YogaUpdate,
};
