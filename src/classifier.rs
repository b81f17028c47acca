// Voice season classification.
//
// A fixed decision tree over (pitch, tempo, energy). Rules are evaluated in
// order and the first match wins; later rules rely on earlier ones failing.
//
//   pitch > 180 && tempo > 100 && energy < 0.01  → Spring
//   pitch > 180 && tempo <= 100                  → Summer
//   pitch <= 180 && energy > 0.02                → Winter
//   otherwise                                    → Autumn

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::FeatureVector;

/// Pitch boundary (Hz) between the bright and the low branches
pub const PITCH_SPLIT_HZ: f64 = 180.0;

/// Tempo boundary (BPM) between Spring and Summer
pub const TEMPO_SPLIT_BPM: f64 = 100.0;

/// Spring requires energy strictly below this
pub const SPRING_MAX_ENERGY: f64 = 0.01;

/// Winter requires energy strictly above this
pub const WINTER_MIN_ENERGY: f64 = 0.02;

/// Follow-up note shown under every result
pub const EXPERT_DIAGNOSIS_NOTE: &str =
    "🔍 Need a more precise analysis? We recommend a **Speech Code expert diagnosis**.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceCategory {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl VoiceCategory {
    pub const ALL: [VoiceCategory; 4] = [
        VoiceCategory::Spring,
        VoiceCategory::Summer,
        VoiceCategory::Autumn,
        VoiceCategory::Winter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VoiceCategory::Spring => "Spring",
            VoiceCategory::Summer => "Summer",
            VoiceCategory::Autumn => "Autumn",
            VoiceCategory::Winter => "Winter",
        }
    }

    /// Headline shown for the result
    pub fn title(self) -> &'static str {
        match self {
            VoiceCategory::Spring => "☀️ Your Voice Type is [Spring].",
            VoiceCategory::Summer => "🌊 Your Voice Type is [Summer].",
            VoiceCategory::Autumn => "🍂 Your Voice Type is [Autumn].",
            VoiceCategory::Winter => "❄️ Your Voice Type is [Winter].",
        }
    }

    /// Speaking style and representative figures
    pub fn description(self) -> &'static str {
        match self {
            VoiceCategory::Spring => {
                "A bright, upbeat way of speaking that lights up the room.\n\
                 Representative figures: Yoo In-na, Park Na-rae, Haha"
            }
            VoiceCategory::Summer => {
                "A natural, sensory way of speaking that sets a relaxed mood.\n\
                 Representative figures: Yoo Jae-suk, Jang Do-yeon, Lee Yi-kyung"
            }
            VoiceCategory::Autumn => {
                "A warm, steady way of speaking that earns trust.\n\
                 Representative figures: IU, Jun Hyun-moo, Lee Seo-jin"
            }
            VoiceCategory::Winter => {
                "A clear, firm way of speaking that carries charisma.\n\
                 Representative figures: Kim Yuna, Kim Hye-soo"
            }
        }
    }
}

impl fmt::Display for VoiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a feature vector to its voice category.
pub fn classify_voice(features: &FeatureVector) -> VoiceCategory {
    classify_metrics(features.pitch, features.tempo, features.energy)
}

pub fn classify_metrics(pitch: f64, tempo: f64, energy: f64) -> VoiceCategory {
    if pitch > PITCH_SPLIT_HZ && tempo > TEMPO_SPLIT_BPM && energy < SPRING_MAX_ENERGY {
        VoiceCategory::Spring
    } else if pitch > PITCH_SPLIT_HZ && tempo <= TEMPO_SPLIT_BPM {
        VoiceCategory::Summer
    } else if pitch <= PITCH_SPLIT_HZ && energy > WINTER_MIN_ENERGY {
        VoiceCategory::Winter
    } else {
        VoiceCategory::Autumn
    }
}
