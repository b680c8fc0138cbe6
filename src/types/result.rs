use serde::Serialize;

use super::itinerary::ItinerarySpec;

/// Outcome of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationResult {
    /// Chat mode output, passed through as prose.
    Chat(String),
    /// Form and surprise mode output.
    Itinerary(ItinerarySpec),
}

impl GenerationResult {
    pub fn as_chat(&self) -> Option<&str> {
        match self {
            GenerationResult::Chat(text) => Some(text),
            GenerationResult::Itinerary(_) => None,
        }
    }

    pub fn as_itinerary(&self) -> Option<&ItinerarySpec> {
        match self {
            GenerationResult::Itinerary(spec) => Some(spec),
            GenerationResult::Chat(_) => None,
        }
    }

    pub fn into_chat(self) -> Option<String> {
        match self {
            GenerationResult::Chat(text) => Some(text),
            GenerationResult::Itinerary(_) => None,
        }
    }

    pub fn into_itinerary(self) -> Option<ItinerarySpec> {
        match self {
            GenerationResult::Itinerary(spec) => Some(spec),
            GenerationResult::Chat(_) => None,
        }
    }

    /// Body shape the HTTP layer returns for this result.
    pub fn to_response_body(&self) -> serde_json::Value {
        match self {
            GenerationResult::Chat(text) => serde_json::json!({ "response": text }),
            GenerationResult::Itinerary(spec) => serde_json::json!({ "itinerary": spec }),
        }
    }

    /// Human-readable rendering used by the CLI.
    pub fn render(&self) -> String {
        match self {
            GenerationResult::Chat(text) => text.clone(),
            GenerationResult::Itinerary(spec) => render_itinerary(spec),
        }
    }
}

fn render_itinerary(spec: &ItinerarySpec) -> String {
    let mut lines = Vec::new();

    lines.push(format!("=== {} ===", spec.destination));
    if let Some(origin) = &spec.origin_city {
        lines.push(format!("From: {}", origin));
    }
    lines.push(format!(
        "Days: {}  Estimated total: ${:.2}",
        spec.total_days, spec.total_estimated_cost
    ));

    for day in &spec.days {
        lines.push(String::new());
        lines.push(format!("Day {}: {}", day.day_number, day.title));
        for activity in &day.activities {
            lines.push(format!(
                "  - {} {} ({}) ${:.2} [{}]",
                activity.time_slot,
                activity.activity_name,
                activity.location,
                activity.estimated_cost,
                activity.category
            ));
        }
    }

    lines.join("\n")
}
