use crate::types::{Budget, ChatRequest, FormRequest, GenerationRequest, SurpriseRequest};

const CHAT_INSTRUCTIONS: &str = r#"You are WanderAI, an AI travel planner.

The user will tell you:
- where they are traveling FROM and TO,
- how many days,
- their budget,
- and their interests.

Your job is to reply in natural language (NOT JSON, NOT code) with a clear,
day-by-day trip plan that includes for EACH DAY:

- a short title for the day
- a list of 3-6 activities
- for every activity, you MUST include:
  * a specific time (e.g., "9:00 AM", "2:30 PM")
  * the location (neighborhood / area / place name)
  * a short description
  * an estimated cost (with a number, e.g., "$15" or "¥2000")

Always follow this structure:

1) Start with a 1-2 sentence overview of the entire trip.

2) Then give the detailed plan, like:

Day 1: Shibuya & Shinjuku Nightlife
- 9:00 AM - Breakfast at a local cafe in Shibuya (Shibuya, Tokyo) - Try a simple Japanese breakfast set. Approx. cost: $12.
- 11:00 AM - Visit Meiji Shrine (Harajuku, Tokyo) - Walk through the forested approach and shrine grounds. Approx. cost: $0-5.
- 7:00 PM - Dinner in Shinjuku (Omoide Yokocho, Shinjuku) - Enjoy yakitori and small izakaya dishes. Approx. cost: $25-35.

3) At the end, add:
- A short summary of how the plan fits the budget and time.
- 1-2 practical tips (e.g., transit pass, reservations, local etiquette).

Formatting rules:
- Use headings like "Day 1:", "Day 2:".
- Use simple bullet lines starting with a dash (-) for each activity.
- DO NOT use JSON, DO NOT use curly braces, DO NOT use backticks or code blocks.
- Keep the tone friendly, but focus on clear times, places, and costs."#;

const TRAVEL_AGENT_INSTRUCTIONS: &str = r#"You are WanderAI, a friendly and knowledgeable travel planning assistant. Your job is to create detailed, practical travel itineraries.

When generating itineraries, always:
1. Provide specific times for each activity (e.g., "9:00 AM")
2. Include estimated costs in USD
3. Suggest local restaurants and specific dishes to try
4. Consider travel time between locations
5. Mix popular attractions with hidden gems
6. Be mindful of the user's budget"#;

const ITINERARY_JSON_SHAPE: &str = r#"Use this exact JSON format:
{
  "destination": "City, Country",
  "originCity": "City the traveler departs from (omit if not given)",
  "totalDays": 3,
  "totalEstimatedCost": 500,
  "days": [
    {
      "dayNumber": 1,
      "title": "Day theme",
      "activities": [
        {
          "timeSlot": "9:00 AM",
          "activityName": "Activity name",
          "description": "Brief description",
          "estimatedCost": 25,
          "location": "Specific location",
          "category": "meal|attraction|transport|accommodation"
        }
      ]
    }
  ]
}"#;

const JSON_ONLY_RULES: &str = r#"CRITICAL INSTRUCTIONS:
- Return ONLY valid JSON in the exact format specified above
- Do NOT include any introductory text or explanations before or after the JSON
- Do NOT wrap the JSON in markdown code blocks (no ```json)
- Start your response with { and end with }
- "category" must be exactly one of: meal, attraction, transport, accommodation
- Set totalEstimatedCost to the sum of all activity estimatedCost values"#;

const LOW_BUDGET_CEILING: f64 = 500.0;
const HIGH_BUDGET_FLOOR: f64 = 2000.0;

/// Renders the prompt text for each generation mode.
///
/// The model has no structured-output mode here, so every constraint on the
/// answer is spelled out in the prompt itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, request: &GenerationRequest) -> String {
        match request {
            GenerationRequest::Chat(chat) => self.chat(chat),
            GenerationRequest::Form(form) => self.form(form),
            GenerationRequest::Surprise(surprise) => self.surprise(surprise),
        }
    }

    pub fn chat(&self, request: &ChatRequest) -> String {
        format!("{}\n\nUser: {}", CHAT_INSTRUCTIONS, request.message.trim())
    }

    pub fn form(&self, request: &FormRequest) -> String {
        let mut sections = vec![
            TRAVEL_AGENT_INSTRUCTIONS.to_string(),
            ITINERARY_JSON_SHAPE.to_string(),
        ];

        let mut details = vec![
            format!(
                "Generate a detailed {}-day travel itinerary for {}.",
                request.days,
                request.destination.trim()
            ),
            budget_line(&request.budget),
            format!("Travel styles: {}", request.styles.trim()),
        ];
        if let Some(start_date) = request.start_date {
            details.push(format!("Starting date: {}", start_date.format("%Y-%m-%d")));
        }
        sections.push(details.join("\n"));

        if let Some(origin) = non_blank(request.origin_city.as_deref()) {
            sections.push(round_trip_requirement(origin, request.days));
        }

        sections.push(JSON_ONLY_RULES.to_string());
        sections.join("\n\n")
    }

    pub fn surprise(&self, request: &SurpriseRequest) -> String {
        let mut sections = vec![
            TRAVEL_AGENT_INSTRUCTIONS.to_string(),
            ITINERARY_JSON_SHAPE.to_string(),
            [
                "The user wants a SURPRISE trip! They haven't picked a destination.".to_string(),
                budget_line(&request.budget),
                format!("Vibe they want: {}", request.vibe.trim()),
                format!("Number of days: {}", request.days),
            ]
            .join("\n"),
            format!(
                "Pick an exciting destination that matches their vibe and budget, then create a full itinerary.\n\
                 The budget of {} is a STRICT ceiling: totalEstimatedCost must be close to but never above it.\n\
                 {}",
                budget_display(&request.budget),
                budget_tier_guidance(&request.budget)
            ),
        ];

        if let Some(origin) = non_blank(request.origin_city.as_deref()) {
            sections.push(round_trip_requirement(origin, request.days));
        }

        sections.push(format!(
            "{}\n- Put the destination you chose in the \"destination\" field as \"City, Country\"",
            JSON_ONLY_RULES
        ));
        sections.join("\n\n")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Dollar-prefix anything that reads as an amount, including numeric labels.
fn budget_display(budget: &Budget) -> String {
    match budget {
        Budget::Label(label) if budget.amount().is_none() || label.trim().starts_with('$') => {
            label.trim().to_string()
        }
        _ => format!("${}", budget),
    }
}

fn budget_line(budget: &Budget) -> String {
    match budget.amount() {
        Some(_) => format!(
            "Budget: {} total (hard ceiling - the full trip, including transport, must not exceed it)",
            budget_display(budget)
        ),
        None => format!("Budget: {}", budget_display(budget)),
    }
}

fn budget_tier_guidance(budget: &Budget) -> String {
    let tiers = [
        format!(
            "- Under ${}: choose somewhere nearby or domestic, reachable cheaply by ground transport",
            LOW_BUDGET_CEILING
        ),
        format!(
            "- ${} to ${}: a regional destination or a short flight is reasonable",
            LOW_BUDGET_CEILING, HIGH_BUDGET_FLOOR
        ),
        format!(
            "- Over ${}: an international destination is a good fit",
            HIGH_BUDGET_FLOOR
        ),
    ];

    let selected = match budget.amount() {
        Some(amount) if amount < LOW_BUDGET_CEILING => &tiers[0..1],
        Some(amount) if amount <= HIGH_BUDGET_FLOOR => &tiers[1..2],
        Some(_) => &tiers[2..3],
        None => &tiers[..],
    };

    format!("Budget guidance:\n{}", selected.join("\n"))
}

fn round_trip_requirement(origin: &str, days: u32) -> String {
    format!(
        "The traveler departs from {origin} and returns there.\n\
         - Set \"originCity\" to \"{origin}\"\n\
         - Day 1 MUST start with a transport activity from {origin} to the destination\n\
         - Day {days} MUST end with a transport activity back to {origin}\n\
         - Include round-trip transportation costs in the activities and in totalEstimatedCost"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationTurn;
    use chrono::NaiveDate;

    #[test]
    fn test_form_prompt_embeds_request_fields() {
        let request = FormRequest::new("Lisbon, Portugal", 3)
            .with_budget(600u32)
            .with_styles("foodie")
            .with_origin_city("Boston");

        let prompt = PromptBuilder::new().form(&request);

        assert!(prompt.contains("Lisbon, Portugal"));
        assert!(prompt.contains("600"));
        assert!(prompt.contains("Boston"));
        assert!(prompt.contains("foodie"));
        assert!(prompt.contains("Return ONLY valid JSON"));
        assert!(prompt.contains("Start your response with {"));
        assert!(prompt.contains("Day 3 MUST end with a transport activity back to Boston"));
    }

    #[test]
    fn test_form_prompt_without_origin_has_no_round_trip() {
        let request = FormRequest::new("Rome, Italy", 2)
            .with_start_date(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        let prompt = PromptBuilder::new().form(&request);

        assert!(prompt.contains("Starting date: 2026-05-01"));
        assert!(prompt.contains("Budget: flexible"));
        assert!(!prompt.contains("departs from"));
    }

    #[test]
    fn test_surprise_prompt_states_ceiling_and_tier() {
        let cheap = PromptBuilder::new().surprise(&SurpriseRequest::new(300u32).with_vibe("beach"));
        assert!(cheap.contains("STRICT ceiling"));
        assert!(cheap.contains("$300"));
        assert!(cheap.contains("nearby or domestic"));
        assert!(!cheap.contains("international destination"));
        assert!(cheap.contains("\"destination\" field"));

        let lavish = PromptBuilder::new().surprise(&SurpriseRequest::new(5000u32));
        assert!(lavish.contains("international destination"));
    }

    #[test]
    fn test_surprise_label_budget_lists_all_tiers() {
        let prompt = PromptBuilder::new()
            .surprise(&SurpriseRequest::new("mid-range").with_origin_city("Denver"));
        assert!(prompt.contains("nearby or domestic"));
        assert!(prompt.contains("international destination"));
        assert!(prompt.contains("departs from Denver"));
    }

    #[test]
    fn test_numeric_label_budgets_render_as_dollars() {
        assert_eq!(budget_display(&Budget::from("600")), "$600");
        assert_eq!(budget_display(&Budget::from("$1,200")), "$1,200");
        assert_eq!(budget_display(&Budget::Amount(750.0)), "$750");
        assert_eq!(budget_display(&Budget::from("flexible")), "flexible");

        let prompt = PromptBuilder::new().form(&FormRequest::new("Rome", 2).with_budget("600"));
        assert!(prompt.contains("Budget: $600 total"), "{prompt}");
    }

    #[test]
    fn test_chat_prompt_forbids_json() {
        let request = ChatRequest {
            message: "4 days in Tokyo".to_string(),
            history: vec![ConversationTurn::assistant("hi")],
        };
        let prompt = PromptBuilder::new().build(&GenerationRequest::Chat(request));

        assert!(prompt.contains("DO NOT use JSON"));
        assert!(prompt.contains("backticks or code blocks"));
        assert!(prompt.ends_with("User: 4 days in Tokyo"));
    }
}
