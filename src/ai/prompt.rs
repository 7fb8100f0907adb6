use serde::Serialize;

/// Preferences that identify one generation: serialized for the cache key,
/// rendered for the prompt.
pub trait PromptContext: Serialize {
    /// Cache key namespace, also used in log lines.
    const KIND: &'static str;

    fn prompt(&self) -> String;

    /// `<kind>:<json>`, with JSON fields in declaration order.
    fn cache_key(&self) -> String {
        // Serializing plain strings and string lists into a String cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("{}:{}", Self::KIND, json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationContext {
    pub budget: String,
    pub duration: String,
    pub interests: Vec<String>,
    pub travel_style: String,
    pub season: String,
}

impl PromptContext for RecommendationContext {
    const KIND: &'static str = "recommendations";

    fn prompt(&self) -> String {
        format!(
            "As a travel expert, recommend 5 destinations based on these preferences:
Budget: {}
Duration: {}
Interests: {}
Travel Style: {}
Season: {}

For each destination, provide:
1. Name
2. Brief description
3. Estimated budget range
4. Best time to visit
5. Top 3 attractions",
            self.budget,
            self.duration,
            self.interests.join(", "),
            self.travel_style,
            self.season,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryPreferences {
    pub travel_style: String,
    pub interests: Vec<String>,
    pub budget: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItineraryContext {
    pub destination: String,
    pub duration: String,
    pub preferences: ItineraryPreferences,
}

impl PromptContext for ItineraryContext {
    const KIND: &'static str = "itinerary";

    fn prompt(&self) -> String {
        format!(
            "Create a detailed {} itinerary for {} considering:
Travel Style: {}
Interests: {}
Budget Level: {}

Include:
1. Day-by-day schedule
2. Recommended activities
3. Estimated timing
4. Travel tips
5. Estimated costs",
            self.duration,
            self.destination,
            self.preferences.travel_style,
            self.preferences.interests.join(", "),
            self.preferences.budget,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelTipsPreferences {
    pub travel_style: String,
    pub budget: String,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TravelTipsContext {
    pub destination: String,
    pub preferences: TravelTipsPreferences,
}

impl PromptContext for TravelTipsContext {
    const KIND: &'static str = "travel-tips";

    fn prompt(&self) -> String {
        format!(
            "Provide personalized travel tips for {} considering:
Travel Style: {}
Budget: {}
Season: {}

Include:
1. Local customs and etiquette
2. Safety tips
3. Money-saving advice
4. Transportation recommendations
5. Must-try local experiences",
            self.destination,
            self.preferences.travel_style,
            self.preferences.budget,
            self.preferences.season,
        )
    }
}
