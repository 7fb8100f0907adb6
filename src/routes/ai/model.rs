use serde::{Deserialize, Serialize};

use crate::{
    ai::{
        ItineraryContext, ItineraryPreferences, RecommendationContext, TravelTipsContext,
        TravelTipsPreferences,
    },
    validation::{Checker, FieldError, Validate},
};

const MAX_PREFERENCE_LEN: usize = 100;
const MAX_PROMPT_LEN: usize = 4000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationBody {
    budget: Option<String>,
    duration: Option<String>,
    interests: Option<Vec<String>>,
    travel_style: Option<String>,
    season: Option<String>,
}

impl Validate for RecommendationContext {
    type Raw = RecommendationBody;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>> {
        let mut c = Checker::new();
        let ctx = RecommendationContext {
            budget: c.text("budget", raw.budget, 1, MAX_PREFERENCE_LEN),
            duration: c.text("duration", raw.duration, 1, MAX_PREFERENCE_LEN),
            interests: c.list("interests", raw.interests, 1),
            travel_style: c.text("travelStyle", raw.travel_style, 1, MAX_PREFERENCE_LEN),
            season: c.text("season", raw.season, 1, MAX_PREFERENCE_LEN),
        };
        c.finish(ctx)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesBody {
    travel_style: Option<String>,
    interests: Option<Vec<String>>,
    budget: Option<String>,
    season: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItineraryBody {
    destination: Option<String>,
    duration: Option<String>,
    preferences: Option<PreferencesBody>,
}

impl Validate for ItineraryContext {
    type Raw = ItineraryBody;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>> {
        let mut c = Checker::new();
        let destination = c.text("destination", raw.destination, 1, MAX_PREFERENCE_LEN);
        let duration = c.text("duration", raw.duration, 1, MAX_PREFERENCE_LEN);
        let preferences = match raw.preferences {
            Some(prefs) => ItineraryPreferences {
                travel_style: c.text(
                    "preferences.travelStyle",
                    prefs.travel_style,
                    1,
                    MAX_PREFERENCE_LEN,
                ),
                interests: c.list("preferences.interests", prefs.interests, 1),
                budget: c.text("preferences.budget", prefs.budget, 1, MAX_PREFERENCE_LEN),
            },
            None => {
                c.push("preferences", "Required");
                ItineraryPreferences::default()
            }
        };
        c.finish(ItineraryContext {
            destination,
            duration,
            preferences,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TravelTipsBody {
    destination: Option<String>,
    preferences: Option<PreferencesBody>,
}

impl Validate for TravelTipsContext {
    type Raw = TravelTipsBody;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>> {
        let mut c = Checker::new();
        let destination = c.text("destination", raw.destination, 1, MAX_PREFERENCE_LEN);
        let preferences = match raw.preferences {
            Some(prefs) => TravelTipsPreferences {
                travel_style: c.text(
                    "preferences.travelStyle",
                    prefs.travel_style,
                    1,
                    MAX_PREFERENCE_LEN,
                ),
                budget: c.text("preferences.budget", prefs.budget, 1, MAX_PREFERENCE_LEN),
                season: c.text("preferences.season", prefs.season, 1, MAX_PREFERENCE_LEN),
            },
            None => {
                c.push("preferences", "Required");
                TravelTipsPreferences::default()
            }
        };
        c.finish(TravelTipsContext {
            destination,
            preferences,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PromptBody {
    prompt: Option<String>,
}

/// Free-form prompt for the uncached generation endpoint.
#[derive(Debug)]
pub struct PromptRequest {
    pub prompt: String,
}

impl Validate for PromptRequest {
    type Raw = PromptBody;

    fn validate(raw: Self::Raw) -> Result<Self, Vec<FieldError>> {
        let mut c = Checker::new();
        let prompt = c.text("prompt", raw.prompt, 1, MAX_PROMPT_LEN);
        c.finish(PromptRequest { prompt })
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: String,
}

#[derive(Debug, Serialize)]
pub struct ItineraryResponse {
    pub itinerary: String,
}

#[derive(Debug, Serialize)]
pub struct TravelTipsResponse {
    pub tips: String,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: Validate>(json: &str) -> Result<T, Vec<FieldError>> {
        T::validate(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn missing_travel_style_is_reported_by_field() {
        let errors = parse::<RecommendationContext>(
            r#"{"budget":"moderate","duration":"week","interests":["beach"],"season":"summer"}"#,
        )
        .unwrap_err();
        assert_eq!(errors, vec![FieldError::new("travelStyle", "Required")]);
    }

    #[test]
    fn valid_recommendation_body_is_trimmed() {
        let ctx = parse::<RecommendationContext>(
            r#"{"budget":" moderate ","duration":"week","interests":["beach"],"travelStyle":"relaxation","season":"summer"}"#,
        )
        .unwrap();
        assert_eq!(ctx.budget, "moderate");
        assert_eq!(ctx.interests, vec!["beach"]);
    }

    #[test]
    fn nested_preference_errors_use_dotted_paths() {
        let errors = parse::<ItineraryContext>(
            r#"{"destination":"Kyoto","duration":"5 days","preferences":{"interests":[],"budget":"luxury"}}"#,
        )
        .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["preferences.travelStyle", "preferences.interests"]);
    }

    #[test]
    fn missing_preferences_object_is_a_single_error() {
        let errors = parse::<TravelTipsContext>(r#"{"destination":"Oslo"}"#).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("preferences", "Required")]);
    }
}
