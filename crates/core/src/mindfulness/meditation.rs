use std::{collections::VecDeque, time::Duration};

use serde::{Deserialize, Serialize};

use super::yoga::NO_PERSON;
use crate::{
    clock::SharedClock,
    landmarks::{Joint, Landmark, LandmarkFrame},
};

const SHOULDER_LEVEL_TOLERANCE: f64 = 0.05;
const NOSE_HISTORY: usize = 30;
const STILLNESS_THRESHOLD: f64 = 0.005;
/// About five seconds of shoulder samples at 30 fps.
const BREATH_WINDOW: usize = 150;
const MIN_BREATH_SAMPLES: usize = 30;
const MIN_BREATH_AMPLITUDE: f64 = 0.002;
const BREATH_REFRACTORY: Duration = Duration::from_secs(3);

const STRAIGHTEN: &str = "Straighten your posture.";
const BE_STILL: &str = "Try to remain still.";
const STILL: &str = "Good stillness. Focus on breath.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeditationUpdate {
    pub feedback: String,
    pub breath_count: u32,
    pub duration_seconds: u64,
    pub is_meditating: bool,
}

/// Tracks posture, stillness and breathing during a seated meditation.
#[derive(Debug)]
pub struct MeditationEngine {
    clock: SharedClock,
    started_at: Option<Duration>,
    last_breath: Duration,
    nose_history: VecDeque<Landmark>,
    shoulder_history: VecDeque<f64>,
    breath_count: u32,
    feedback: &'static str,
}

impl MeditationEngine {
    pub fn new(clock: SharedClock) -> Self {
        let last_breath = clock.now();
        Self {
            clock,
            started_at: None,
            last_breath,
            nose_history: VecDeque::with_capacity(NOSE_HISTORY),
            shoulder_history: VecDeque::with_capacity(BREATH_WINDOW),
            breath_count: 0,
            feedback: "Sit comfortably.",
        }
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.last_breath = self.clock.now();
        self.nose_history.clear();
        self.shoulder_history.clear();
        self.breath_count = 0;
        self.feedback = "Sit comfortably.";
    }

    pub fn breath_count(&self) -> u32 {
        self.breath_count
    }

    pub fn update(&mut self, frame: &LandmarkFrame) -> MeditationUpdate {
        if !frame.is_complete() {
            return MeditationUpdate {
                feedback: NO_PERSON.to_string(),
                is_meditating: false,
                ..self.snapshot()
            };
        }

        let now = self.clock.now();
        self.started_at.get_or_insert(now);

        let point = |joint| frame.get(joint).copied().unwrap_or_default();
        let left_shoulder = point(Joint::LeftShoulder);
        let right_shoulder = point(Joint::RightShoulder);

        if (left_shoulder.y - right_shoulder.y).abs() > SHOULDER_LEVEL_TOLERANCE {
            self.feedback = STRAIGHTEN;
            return self.snapshot();
        }

        if self.nose_history.len() == NOSE_HISTORY {
            self.nose_history.pop_front();
        }
        self.nose_history.push_back(point(Joint::Nose));
        let movement = match (
            self.nose_history.iter().nth_back(1),
            self.nose_history.back(),
        ) {
            (Some(previous), Some(latest)) => latest.distance_to(previous),
            _ => 0.0,
        };
        self.feedback = if movement > STILLNESS_THRESHOLD {
            BE_STILL
        } else {
            STILL
        };

        if self.shoulder_history.len() == BREATH_WINDOW {
            self.shoulder_history.pop_front();
        }
        self.shoulder_history
            .push_back((left_shoulder.y + right_shoulder.y) / 2.0);
        self.detect_breath(now);

        self.snapshot()
    }

    /// Counts a breath when the shoulders moved enough within the window and
    /// the refractory period since the previous breath has passed.
    fn detect_breath(&mut self, now: Duration) {
        if self.shoulder_history.len() < MIN_BREATH_SAMPLES {
            return;
        }
        if now.saturating_sub(self.last_breath) < BREATH_REFRACTORY {
            return;
        }

        let (min, max) = self
            .shoulder_history
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), y| {
                (min.min(*y), max.max(*y))
            });
        if max - min > MIN_BREATH_AMPLITUDE {
            self.breath_count += 1;
            self.last_breath = now;
            tracing::debug!(breaths = self.breath_count, "breath counted");
        }
    }

    fn snapshot(&self) -> MeditationUpdate {
        let duration = self
            .started_at
            .map(|start| self.clock.now().saturating_sub(start).as_secs())
            .unwrap_or(0);
        MeditationUpdate {
            feedback: self.feedback.to_string(),
            breath_count: self.breath_count,
            duration_seconds: duration,
            is_meditating: true,
        }
    }
}
