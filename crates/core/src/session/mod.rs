//! Per-session façade that routes landmark frames to the engines of the
//! active activity.

use serde::{Deserialize, Serialize};

use crate::{
    analytics::{self, WorkoutAnalytics},
    clock::SharedClock,
    coach::{CoachAdvisor, Persona, PhrasePicker, SessionStats},
    config::{Activity, SessionConfig},
    exercise::{Exercise, ExerciseStateMachine, ExerciseUpdate},
    landmarks::LandmarkFrame,
    mindfulness::{MeditationEngine, MeditationUpdate, YogaPose, YogaPoseEvaluator, YogaUpdate},
    posture::{PostureResult, PostureScorer},
    PoseCoachError, Result,
};

/// Everything produced for one frame of a repetition or hold exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTick {
    pub posture: PostureResult,
    pub exercise: ExerciseUpdate,
    /// Advice to surface to the user, if any is due.
    pub advice: Option<String>,
}

/// Output of [`WorkoutSession::process`], tagged by activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "activity", rename_all = "lowercase")]
pub enum SessionOutput {
    Exercise(ExerciseTick),
    Yoga(YogaUpdate),
    Meditation(MeditationUpdate),
}

/// End-of-session report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub activity: Activity,
    pub frames: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<WorkoutAnalytics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breath_count: Option<u32>,
}

#[derive(Debug)]
enum Engines {
    Exercise {
        scorer: PostureScorer,
        machine: ExerciseStateMachine,
        coach: CoachAdvisor,
    },
    Yoga(YogaPoseEvaluator),
    Meditation(MeditationEngine),
}

/// Owns the engines of one workout session.
#[derive(Debug)]
pub struct WorkoutSession {
    config: SessionConfig,
    engines: Engines,
    frames: u64,
}

impl WorkoutSession {
    pub fn new(
        config: SessionConfig,
        clock: SharedClock,
        picker: Box<dyn PhrasePicker>,
    ) -> Result<Self> {
        config.validate()?;

        let engines = match config.activity {
            Activity::Exercise { name } => Engines::Exercise {
                scorer: PostureScorer::with_history_limit(config.posture.history_limit),
                machine: ExerciseStateMachine::with_config(name, &config.exercise, clock.clone()),
                coach: CoachAdvisor::with_config(config.persona, &config.coach, clock, picker),
            },
            Activity::Yoga { pose } => Engines::Yoga(YogaPoseEvaluator::new(pose, clock)),
            Activity::Meditation => Engines::Meditation(MeditationEngine::new(clock)),
        };
        tracing::info!(activity = ?config.activity, persona = %config.persona, "session started");

        Ok(Self {
            config,
            engines,
            frames: 0,
        })
    }

    pub fn activity(&self) -> Activity {
        self.config.activity
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn process(&mut self, frame: &LandmarkFrame) -> SessionOutput {
        self.frames += 1;
        match &mut self.engines {
            Engines::Exercise {
                scorer,
                machine,
                coach,
            } => {
                let posture = scorer.update(frame);
                let exercise = machine.update(frame);
                let advice = if frame.is_complete() {
                    coach.update(&posture)
                } else {
                    None
                };
                SessionOutput::Exercise(ExerciseTick {
                    posture,
                    exercise,
                    advice,
                })
            }
            Engines::Yoga(yoga) => SessionOutput::Yoga(yoga.update(frame)),
            Engines::Meditation(meditation) => SessionOutput::Meditation(meditation.update(frame)),
        }
    }

    /// Restarts counters, histories and timers for a replay of the same
    /// activity.
    pub fn reset(&mut self) {
        self.frames = 0;
        match &mut self.engines {
            Engines::Exercise {
                scorer,
                machine,
                coach,
            } => {
                scorer.reset();
                machine.reset();
                coach.reset();
            }
            Engines::Yoga(yoga) => yoga.reset(),
            Engines::Meditation(meditation) => meditation.reset(),
        }
        tracing::info!(activity = ?self.config.activity, "session reset");
    }

    /// Moves an exercise session to a different exercise, starting over.
    pub fn switch_exercise(&mut self, exercise: Exercise) -> Result<()> {
        let Engines::Exercise { machine, .. } = &mut self.engines else {
            return Err(PoseCoachError::msg("session is not tracking an exercise"));
        };
        machine.reset_to(exercise);
        self.config.activity = Activity::Exercise { name: exercise };
        self.reset();
        Ok(())
    }

    /// Moves a yoga session to a different pose, clearing accumulated time.
    pub fn switch_pose(&mut self, pose: YogaPose) -> Result<()> {
        let Engines::Yoga(yoga) = &mut self.engines else {
            return Err(PoseCoachError::msg("session is not evaluating a yoga pose"));
        };
        yoga.set_pose(pose);
        self.config.activity = Activity::Yoga { pose };
        self.frames = 0;
        Ok(())
    }

    pub fn set_persona(&mut self, persona: Persona) {
        self.config.persona = persona;
        if let Engines::Exercise { coach, .. } = &mut self.engines {
            coach.set_persona(persona);
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            activity: self.config.activity,
            frames: self.frames,
            count: None,
            analytics: None,
            stats: None,
            hold_seconds: None,
            breath_count: None,
        };

        match &self.engines {
            Engines::Exercise {
                scorer,
                machine,
                coach,
            } => {
                summary.count = Some(machine.count());
                summary.analytics =
                    (!scorer.history().is_empty()).then(|| analytics::summarize(scorer.history()));
                summary.stats = coach.session_stats();
            }
            Engines::Yoga(yoga) => summary.hold_seconds = Some(yoga.total_hold().as_secs()),
            Engines::Meditation(meditation) => {
                summary.breath_count = Some(meditation.breath_count());
            }
        }

        summary
    }
}
