use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Exercise, Persona, PoseCoachError, Result, YogaPose};

/// Top-level configuration for one workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub activity: Activity,
    pub persona: Persona,
    pub exercise: ExerciseConfig,
    pub coach: CoachConfig,
    pub posture: PostureConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            activity: Activity::Exercise {
                name: Exercise::Squat,
            },
            persona: Persona::default(),
            exercise: ExerciseConfig::default(),
            coach: CoachConfig::default(),
            posture: PostureConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.exercise.confidence_threshold) {
            return Err(PoseCoachError::InvalidConfig(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.exercise.confidence_threshold
            )));
        }
        if self.exercise.smoothing_window == 0 {
            return Err(PoseCoachError::InvalidConfig(
                "smoothing_window must be at least 1".to_string(),
            ));
        }
        if self.coach.risk_cooldown_ms == 0 || self.coach.advice_cooldown_ms == 0 {
            return Err(PoseCoachError::InvalidConfig(
                "coach cooldowns must be positive".to_string(),
            ));
        }
        if self.posture.history_limit == Some(0) {
            return Err(PoseCoachError::InvalidConfig(
                "posture history_limit must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which engine drives the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Activity {
    Exercise { name: Exercise },
    Yoga { pose: YogaPose },
    Meditation,
}

/// Settings for the repetition counter and hold timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseConfig {
    /// Joints below this confidence invalidate the frame.
    pub confidence_threshold: f64,
    /// Number of samples in the angle moving average.
    pub smoothing_window: usize,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            smoothing_window: 5,
        }
    }
}

/// Cooldowns applied by the coach between emissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub risk_cooldown_ms: u64,
    pub advice_cooldown_ms: u64,
}

impl CoachConfig {
    pub fn risk_cooldown(&self) -> Duration {
        Duration::from_millis(self.risk_cooldown_ms)
    }

    pub fn advice_cooldown(&self) -> Duration {
        Duration::from_millis(self.advice_cooldown_ms)
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            risk_cooldown_ms: 5_000,
            advice_cooldown_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Maximum number of posture results kept per session. `None` keeps all.
    pub history_limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.exercise.confidence_threshold, 0.3);
        assert_eq!(config.exercise.smoothing_window, 5);
        assert_eq!(config.coach.risk_cooldown(), Duration::from_secs(5));
        assert_eq!(config.coach.advice_cooldown(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_json() {
        let config: SessionConfig = serde_json::from_str(
            r#"{
                "activity": {"kind": "yoga", "pose": "Tree Pose"},
                "persona": "zen_coach",
                "coach": {"risk_cooldown_ms": 2000}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.activity,
            Activity::Yoga {
                pose: YogaPose::TreePose
            }
        );
        assert_eq!(config.persona, Persona::ZenCoach);
        assert_eq!(config.coach.risk_cooldown_ms, 2000);
        assert_eq!(config.coach.advice_cooldown_ms, 10_000);
    }

    #[test]
    fn names_resolve_case_insensitively_with_fallbacks() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"activity": {"kind": "exercise", "name": "Squat"}, "persona": "Drill-Sergeant"}"#,
        )
        .unwrap();
        assert_eq!(
            config.activity,
            Activity::Exercise {
                name: Exercise::Squat
            }
        );
        assert_eq!(config.persona, Persona::DrillSergeant);

        let config: SessionConfig = serde_json::from_str(
            r#"{"activity": {"kind": "exercise", "name": "burpee"}, "persona": "pirate"}"#,
        )
        .unwrap();
        assert_eq!(
            config.activity,
            Activity::Exercise {
                name: Exercise::Squat
            }
        );
        assert_eq!(config.persona, Persona::Supportive);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = SessionConfig::default();
        config.exercise.confidence_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(PoseCoachError::InvalidConfig(_))
        ));

        let mut config = SessionConfig::default();
        config.exercise.smoothing_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "pose-coach-config-{}.json",
            std::process::id()
        ));
        fs::write(
            &path,
            r#"{"activity": {"kind": "exercise", "name": "pushups"}}"#,
        )
        .unwrap();

        let config = SessionConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(
            config.activity,
            Activity::Exercise {
                name: Exercise::Pushup
            }
        );
    }
}
