//! Rate-limited, persona-flavoured coaching advice.

mod persona;

use std::{collections::VecDeque, fmt, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub use persona::Persona;

use crate::{
    clock::SharedClock,
    config::CoachConfig,
    posture::{PostureResult, RiskKind},
};

const OPENING_SAMPLES: usize = 5;
const RECENT_SAMPLES: usize = 3;
const RECENT_RISKS: usize = 5;
const RISK_REPEAT_THRESHOLD: usize = 2;
const FATIGUE_MIN_SAMPLES: usize = 10;
const FATIGUE_DROP: f64 = 15.0;
const EXCELLENT_SCORE: f64 = 92.0;
const PROGRESS_INTERVAL: usize = 10;
const MIN_ADVICE_SAMPLES: usize = 2;

/// Chooses an index into a list of interchangeable phrases.
pub trait PhrasePicker: Send + fmt::Debug {
    /// Returns an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Uniformly random phrase selection.
#[derive(Debug, Clone)]
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible picker for replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PhrasePicker for RandomPicker {
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.rng.gen_range(0..len)
        }
    }
}

/// Summary of posture totals and risk events seen during a session.
///
/// Only the aggregates the coach consults are retained: the opening scores,
/// the most recent scores, running totals, and the latest risk events. Every
/// value derived from them matches what a full score log would produce.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    opening: Vec<u32>,
    recent: VecDeque<u32>,
    count: usize,
    sum: u64,
    best: Option<u32>,
    worst: Option<u32>,
    recent_risks: VecDeque<RiskKind>,
    total_risks: usize,
}

impl SessionHistory {
    pub fn record(&mut self, result: &PostureResult) {
        let score = result.total;
        if self.opening.len() < OPENING_SAMPLES {
            self.opening.push(score);
        }
        if self.recent.len() == RECENT_SAMPLES {
            self.recent.pop_front();
        }
        self.recent.push_back(score);
        self.count += 1;
        self.sum += u64::from(score);
        self.best = Some(self.best.map_or(score, |best| best.max(score)));
        self.worst = Some(self.worst.map_or(score, |worst| worst.min(score)));

        for risk in &result.risks {
            if self.recent_risks.len() == RECENT_RISKS {
                self.recent_risks.pop_front();
            }
            self.recent_risks.push_back(risk.kind);
            self.total_risks += 1;
        }
    }

    /// Number of scores recorded.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn total_risks(&self) -> usize {
        self.total_risks
    }

    fn recent_mean(&self) -> f64 {
        mean(self.recent.iter().copied())
    }

    fn opening_mean(&self) -> f64 {
        self.opening.iter().map(|score| f64::from(*score)).sum::<f64>() / OPENING_SAMPLES as f64
    }

    fn overall_mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }

    fn recent_risk_count(&self, kind: RiskKind) -> usize {
        self.recent_risks.iter().filter(|risk| **risk == kind).count()
    }
}

/// Aggregate figures for the session so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub average: u32,
    pub best: u32,
    pub worst: u32,
    pub total_risks: usize,
}

/// Turns posture results into occasional spoken/displayed advice.
///
/// Risk feedback and general advice are gated by independent cooldowns. Risk
/// feedback takes priority and also restarts the general advice cooldown.
#[derive(Debug)]
pub struct CoachAdvisor {
    persona: Persona,
    history: SessionHistory,
    clock: SharedClock,
    picker: Box<dyn PhrasePicker>,
    risk_cooldown: Duration,
    advice_cooldown: Duration,
    last_risk: Option<Duration>,
    last_advice: Duration,
}

impl CoachAdvisor {
    pub fn new(persona: Persona, clock: SharedClock, picker: Box<dyn PhrasePicker>) -> Self {
        Self::with_config(persona, &CoachConfig::default(), clock, picker)
    }

    pub fn with_config(
        persona: Persona,
        config: &CoachConfig,
        clock: SharedClock,
        picker: Box<dyn PhrasePicker>,
    ) -> Self {
        let last_advice = clock.now();
        Self {
            persona,
            history: SessionHistory::default(),
            clock,
            picker,
            risk_cooldown: config.risk_cooldown(),
            advice_cooldown: config.advice_cooldown(),
            last_risk: None,
            last_advice,
        }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Changes the wording of future advice. History and cooldowns are kept.
    pub fn set_persona(&mut self, persona: Persona) {
        self.persona = persona;
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Forgets the session and restarts both cooldowns.
    pub fn reset(&mut self) {
        self.history = SessionHistory::default();
        self.last_risk = None;
        self.last_advice = self.clock.now();
    }

    /// Records `result` and returns advice when a cooldown allows it.
    pub fn update(&mut self, result: &PostureResult) -> Option<String> {
        self.history.record(result);
        let now = self.clock.now();

        let risk_ready = self
            .last_risk
            .map_or(true, |last| now.saturating_sub(last) >= self.risk_cooldown);
        if risk_ready {
            if let Some(advice) = self.risk_advice() {
                self.last_risk = Some(now);
                self.last_advice = now;
                tracing::debug!(persona = %self.persona, advice, "risk feedback");
                return Some(advice.to_string());
            }
        }

        if now.saturating_sub(self.last_advice) >= self.advice_cooldown {
            self.last_advice = now;
            let advice = self.general_advice();
            if let Some(advice) = &advice {
                tracing::debug!(
                    persona = %self.persona,
                    advice = advice.as_str(),
                    "general advice"
                );
            }
            return advice;
        }

        None
    }

    pub fn session_stats(&self) -> Option<SessionStats> {
        let average = self.history.overall_mean()?;
        Some(SessionStats {
            average: average.round() as u32,
            best: self.history.best.unwrap_or_default(),
            worst: self.history.worst.unwrap_or_default(),
            total_risks: self.history.total_risks,
        })
    }

    fn risk_advice(&self) -> Option<&'static str> {
        if self.history.recent_risk_count(RiskKind::KneeValgus) >= RISK_REPEAT_THRESHOLD {
            Some(self.persona.valgus())
        } else if self.history.recent_risk_count(RiskKind::BackRounding) >= RISK_REPEAT_THRESHOLD
        {
            Some(self.persona.rounding())
        } else {
            None
        }
    }

    fn general_advice(&mut self) -> Option<String> {
        let count = self.history.len();
        if count < MIN_ADVICE_SAMPLES {
            return None;
        }

        let recent = self.history.recent_mean();
        if count >= FATIGUE_MIN_SAMPLES && recent < self.history.opening_mean() - FATIGUE_DROP {
            return Some(self.persona.fatigue().to_string());
        }

        if recent > EXCELLENT_SCORE {
            let phrases = self.persona.excellent();
            let index = self.picker.pick(phrases.len()).min(phrases.len() - 1);
            return Some(phrases[index].to_string());
        }

        if count % PROGRESS_INTERVAL == 0 {
            let average = self.history.overall_mean()?.round() as u32;
            return Some(self.persona.progress(average));
        }

        None
    }
}

fn mean(values: impl Iterator<Item = u32>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| {
        (sum + f64::from(value), count + 1)
    });
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        posture::{Risk, RiskSite},
    };

    #[derive(Debug)]
    struct FixedPicker(usize);

    impl PhrasePicker for FixedPicker {
        fn pick(&mut self, _len: usize) -> usize {
            self.0
        }
    }

    fn advisor(persona: Persona, clock: &ManualClock) -> CoachAdvisor {
        CoachAdvisor::new(persona, clock.shared(), Box::new(FixedPicker(1)))
    }

    fn score(total: u32) -> PostureResult {
        PostureResult {
            total,
            ..Default::default()
        }
    }

    fn valgus(total: u32) -> PostureResult {
        PostureResult {
            total,
            risks: vec![
                Risk::new(RiskKind::KneeValgus, RiskSite::LeftKnee),
                Risk::new(RiskKind::KneeValgus, RiskSite::RightKnee),
            ],
            ..Default::default()
        }
    }

    fn rounding(total: u32) -> PostureResult {
        PostureResult {
            total,
            risks: vec![Risk::new(RiskKind::BackRounding, RiskSite::Spine)],
            ..Default::default()
        }
    }

    #[test]
    fn risk_feedback_respects_cooldown() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::Supportive, &clock);

        let first = coach.update(&valgus(60));
        assert_eq!(first.as_deref(), Some(Persona::Supportive.valgus()));

        clock.advance_millis(4_000);
        assert_eq!(coach.update(&valgus(60)), None);

        clock.advance_millis(1_000);
        assert_eq!(
            coach.update(&valgus(60)).as_deref(),
            Some(Persona::Supportive.valgus())
        );
    }

    #[test]
    fn single_risk_event_is_not_enough() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::Supportive, &clock);

        assert_eq!(coach.update(&rounding(65)), None);
        assert_eq!(
            coach.update(&rounding(65)).as_deref(),
            Some(Persona::Supportive.rounding())
        );
    }

    #[test]
    fn valgus_outranks_rounding() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::DrillSergeant, &clock);
        coach.update(&rounding(60));
        coach.update(&rounding(60));
        clock.advance_millis(5_000);

        let advice = coach.update(&valgus(60));
        assert_eq!(advice.as_deref(), Some(Persona::DrillSergeant.valgus()));
    }

    #[test]
    fn risk_feedback_delays_general_advice() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::Supportive, &clock);
        coach.update(&score(95));

        clock.advance_millis(9_000);
        assert!(coach.update(&valgus(95)).is_some());

        // Eleven seconds after construction, but only two since the risk.
        clock.advance_millis(2_000);
        assert_eq!(coach.update(&score(95)), None);
    }

    #[test]
    fn fatigue_needs_ten_samples() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::Supportive, &clock);
        for _ in 0..5 {
            coach.update(&score(95));
        }
        for _ in 0..3 {
            coach.update(&score(60));
        }

        // Nine samples: the decay holds but fatigue is not judged yet.
        clock.advance_millis(10_000);
        assert_ne!(
            coach.update(&score(60)).as_deref(),
            Some(Persona::Supportive.fatigue())
        );

        clock.advance_millis(10_000);
        assert_eq!(
            coach.update(&score(60)).as_deref(),
            Some(Persona::Supportive.fatigue())
        );
    }

    #[test]
    fn excellent_form_is_encouraged() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::ZenCoach, &clock);
        for _ in 0..3 {
            coach.update(&score(97));
        }
        clock.advance_millis(10_000);

        let advice = coach.update(&score(97));
        assert_eq!(advice.as_deref(), Some(Persona::ZenCoach.excellent()[1]));
    }

    #[test]
    fn progress_reported_on_multiples_of_ten() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::Supportive, &clock);
        for _ in 0..9 {
            coach.update(&score(80));
        }
        clock.advance_millis(10_000);

        let advice = coach.update(&score(80));
        assert_eq!(advice, Some(Persona::Supportive.progress(80)));
        assert_eq!(advice.as_deref(), Some("Session average: 80%. Stay strong!"));
    }

    #[test]
    fn cooldown_is_consumed_without_advice() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::Supportive, &clock);
        for _ in 0..8 {
            coach.update(&score(80));
        }
        clock.advance_millis(10_000);
        assert_eq!(coach.update(&score(80)), None);

        // The tenth sample lands inside the restarted cooldown.
        assert_eq!(coach.update(&score(80)), None);
    }

    #[test]
    fn personas_change_wording_only() {
        let mut outputs = Vec::new();
        for persona in Persona::ALL {
            let clock = ManualClock::new();
            let mut coach = advisor(persona, &clock);
            coach.update(&valgus(50));
            outputs.push(coach.update(&valgus(50)));
        }

        // The first call already fires, so the second is suppressed everywhere.
        assert!(outputs.iter().all(Option::is_none));

        let mut outputs = Vec::new();
        for persona in Persona::ALL {
            let clock = ManualClock::new();
            let mut coach = advisor(persona, &clock);
            outputs.push(coach.update(&valgus(50)).unwrap());
        }
        assert_eq!(outputs[0], Persona::Supportive.valgus());
        assert_eq!(outputs[1], Persona::DrillSergeant.valgus());
        assert_eq!(outputs[2], Persona::ZenCoach.valgus());
    }

    #[test]
    fn switching_persona_keeps_history() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::Supportive, &clock);
        for _ in 0..9 {
            coach.update(&score(70));
        }
        coach.set_persona(Persona::DrillSergeant);
        clock.advance_millis(10_000);

        assert_eq!(
            coach.update(&score(70)),
            Some(Persona::DrillSergeant.progress(70))
        );
    }

    #[test]
    fn stats_and_reset() {
        let clock = ManualClock::new();
        let mut coach = advisor(Persona::Supportive, &clock);
        assert_eq!(coach.session_stats(), None);

        coach.update(&score(90));
        coach.update(&valgus(60));
        coach.update(&score(75));

        assert_eq!(
            coach.session_stats(),
            Some(SessionStats {
                average: 75,
                best: 90,
                worst: 60,
                total_risks: 2,
            })
        );

        coach.reset();
        assert_eq!(coach.session_stats(), None);
        assert!(coach.history().is_empty());
    }

    #[test]
    fn seeded_picker_is_reproducible() {
        let mut a = RandomPicker::seeded(7);
        let mut b = RandomPicker::seeded(7);
        let left: Vec<_> = (0..10).map(|_| a.pick(3)).collect();
        let right: Vec<_> = (0..10).map(|_| b.pick(3)).collect();
        assert_eq!(left, right);
        assert!(left.iter().all(|index| *index < 3));
    }
}
