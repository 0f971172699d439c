use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::PoseCoachError;

/// Coaching voice. Only the wording differs between personas; the decision of
/// which message category to emit is shared.
///
/// Deserialization resolves names leniently through
/// [`Persona::from_name_or_default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Persona {
    #[default]
    Supportive,
    DrillSergeant,
    ZenCoach,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Supportive, Persona::DrillSergeant, Persona::ZenCoach];

    pub fn name(self) -> &'static str {
        match self {
            Persona::Supportive => "supportive",
            Persona::DrillSergeant => "drill_sergeant",
            Persona::ZenCoach => "zen_coach",
        }
    }

    /// Resolves `name`, falling back to [`Persona::Supportive`].
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(name, "unrecognised persona, using supportive");
            Persona::Supportive
        })
    }

    pub fn fatigue(self) -> &'static str {
        match self {
            Persona::Supportive => "Fatigue detected. Focus on controlled movements, don't rush.",
            Persona::DrillSergeant => "YOUR FORM IS SLIPPING! DON'T YOU DARE QUIT NOW! FIX IT!",
            Persona::ZenCoach => {
                "Your body is speaking to you. Breathe deep and find your center again."
            }
        }
    }

    pub fn valgus(self) -> &'static str {
        match self {
            Persona::Supportive => "Your knees are consistently caving. Push them OUT!",
            Persona::DrillSergeant => "KNEES OUT! STOP WEAKENING YOUR STANCE, SOLDIER!",
            Persona::ZenCoach => "Mindfully guide your knees outward. Find your balance.",
        }
    }

    pub fn rounding(self) -> &'static str {
        match self {
            Persona::Supportive => "Watch your lower back. Keep that chest proud!",
            Persona::DrillSergeant => "EYES UP! CHEST OUT! STOP SLUMPING LIKE A COWARD!",
            Persona::ZenCoach => "Lengthen your spine. Let your breath support your posture.",
        }
    }

    /// Encouragements offered when recent form is excellent.
    pub fn excellent(self) -> &'static [&'static str] {
        match self {
            Persona::Supportive => &[
                "Perfect form! You're crushing this set.",
                "Incredible consistency. Keep it up!",
                "Your technique is elite level. Stay focused.",
            ],
            Persona::DrillSergeant => &[
                "THAT'S WHAT I'M TALKING ABOUT! EMBRACE THE PAIN!",
                "UNSTOPPABLE! KEEP THAT INTENSITY!",
                "EXCELLENT WORK! NOW DO IT AGAIN, FASTER!",
            ],
            Persona::ZenCoach => &[
                "Beautiful alignment. You are in perfect harmony with your movement.",
                "Steady and mindful. Your focus is inspiring.",
                "Feel the strength in your stillness and flow. Well done.",
            ],
        }
    }

    pub fn progress(self, average: u32) -> String {
        match self {
            Persona::Supportive => format!("Session average: {average}%. Stay strong!"),
            Persona::DrillSergeant => {
                format!("{average}% AVERAGE? YOU CAN DO BETTER THAN THAT! MOVE!")
            }
            Persona::ZenCoach => {
                format!("Your average stability is {average}%. You are blossoming.")
            }
        }
    }
}

impl FromStr for Persona {
    type Err = PoseCoachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "supportive" => Ok(Persona::Supportive),
            "drill_sergeant" => Ok(Persona::DrillSergeant),
            "zen_coach" => Ok(Persona::ZenCoach),
            _ => Err(PoseCoachError::UnknownPersona(s.to_string())),
        }
    }
}

impl From<String> for Persona {
    fn from(name: String) -> Self {
        Self::from_name_or_default(&name)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
