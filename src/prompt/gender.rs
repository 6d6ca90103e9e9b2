//! Model-Gender Arbiter (§4.6): resolves position-8 of the fixed prompt
//! component order from a user's `ModelGenderPreference`.

use crate::types::{DetectedGender, GenderSetting, ModelGenderPreference};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedGender {
    Female,
    Male,
    Diverse,
}

impl ResolvedGender {
    pub fn phrase(self) -> &'static str {
        match self {
            ResolvedGender::Female => "stunning female model, elegant pose, feminine silhouette",
            ResolvedGender::Male => "stunning male model, strong presence, masculine bearing",
            ResolvedGender::Diverse => "diverse models, mixed gender representation, inclusive casting",
        }
    }
}

/// `generation_index` only matters in `both`-alternation (explicit `setting
/// = both`, or `auto` with a detected `Both` split): even indices draw
/// female, odd draw male.
pub fn resolve(preference: &ModelGenderPreference, generation_index: i64) -> ResolvedGender {
    match preference.setting {
        GenderSetting::Female => ResolvedGender::Female,
        GenderSetting::Male => ResolvedGender::Male,
        GenderSetting::Both => alternate(generation_index),
        GenderSetting::Auto => match preference.detected_gender {
            Some(DetectedGender::Feminine) => ResolvedGender::Female,
            Some(DetectedGender::Masculine) => ResolvedGender::Male,
            Some(DetectedGender::Androgynous) => ResolvedGender::Diverse,
            Some(DetectedGender::Both) => alternate(generation_index),
            None => ResolvedGender::Diverse,
        },
    }
}

fn alternate(generation_index: i64) -> ResolvedGender {
    if generation_index.rem_euclid(2) == 0 {
        ResolvedGender::Female
    } else {
        ResolvedGender::Male
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preference(setting: GenderSetting, detected: Option<DetectedGender>) -> ModelGenderPreference {
        ModelGenderPreference {
            setting,
            detected_gender: detected,
            confidence: 0.8,
            manual_override: false,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn auto_uses_detected_gender() {
        let pref = preference(GenderSetting::Auto, Some(DetectedGender::Feminine));
        assert_eq!(resolve(&pref, 0), ResolvedGender::Female);
    }

    #[test]
    fn auto_with_no_detection_falls_back_to_diverse() {
        let pref = preference(GenderSetting::Auto, None);
        assert_eq!(resolve(&pref, 0), ResolvedGender::Diverse);
    }

    #[test]
    fn both_alternates_by_generation_index_parity() {
        let pref = preference(GenderSetting::Both, None);
        assert_eq!(resolve(&pref, 0), ResolvedGender::Female);
        assert_eq!(resolve(&pref, 1), ResolvedGender::Male);
        assert_eq!(resolve(&pref, 2), ResolvedGender::Female);
    }

    #[test]
    fn explicit_setting_overrides_detected_gender() {
        let pref = preference(GenderSetting::Male, Some(DetectedGender::Feminine));
        assert_eq!(resolve(&pref, 0), ResolvedGender::Male);
    }
}
