use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Structured itinerary returned by the form and surprise modes.
///
/// The camelCase wire shape is shared with trip storage and the presentation
/// layer, so field names must not drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItinerarySpec {
    /// Destination city and country (e.g., "Kyoto, Japan")
    pub destination: String,
    /// City the traveller departs from and returns to, when one was given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_city: Option<String>,
    /// Number of days the itinerary covers
    pub total_days: u32,
    /// Total estimated spend across every activity, in USD
    pub total_estimated_cost: f64,
    /// Day-by-day plan
    pub days: Vec<DayPlan>,
}

/// One day of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    /// 1-based day counter within the itinerary
    pub day_number: u32,
    /// Short theme for the day
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "Option<String>")]
    pub title: String,
    /// Activities in chronological order
    pub activities: Vec<Activity>,
}

/// A single scheduled activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Start time, e.g. "9:00 AM"
    pub time_slot: String,
    pub activity_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "Option<String>")]
    pub description: String,
    /// Estimated cost in USD; `null` reads as free
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "Option<f64>")]
    pub estimated_cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "Option<String>")]
    pub location: String,
    /// One of meal, attraction, transport, accommodation; other labels are kept as-is
    #[schemars(with = "String")]
    pub category: ActivityCategory,
}

/// Activity kind. Matching is case-insensitive and unrecognised labels survive
/// as [`ActivityCategory::Other`] so a single odd activity cannot sink an itinerary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityCategory {
    Meal,
    Attraction,
    Transport,
    Accommodation,
    Other(String),
}

impl ActivityCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityCategory::Meal => "meal",
            ActivityCategory::Attraction => "attraction",
            ActivityCategory::Transport => "transport",
            ActivityCategory::Accommodation => "accommodation",
            ActivityCategory::Other(label) => label,
        }
    }
}

impl From<&str> for ActivityCategory {
    fn from(label: &str) -> Self {
        let label = label.trim();
        match label.to_ascii_lowercase().as_str() {
            "meal" => ActivityCategory::Meal,
            "attraction" => ActivityCategory::Attraction,
            "transport" => ActivityCategory::Transport,
            "accommodation" => ActivityCategory::Accommodation,
            _ => ActivityCategory::Other(label.to_string()),
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActivityCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(ActivityCategory::from(label.as_str()))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ItinerarySpec {
    /// Number of activities across all days.
    pub fn activity_count(&self) -> usize {
        self.days.iter().map(|day| day.activities.len()).sum()
    }

    /// Sum of every activity's `estimated_cost`. The gateway never reconciles this
    /// with `total_estimated_cost`; callers that care can compare the two.
    pub fn summed_activity_cost(&self) -> f64 {
        self.days
            .iter()
            .flat_map(|day| day.activities.iter())
            .map(|activity| activity.estimated_cost)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "destination": "Lisbon, Portugal",
            "originCity": "Boston",
            "totalDays": 1,
            "totalEstimatedCost": 145.5,
            "days": [{
                "dayNumber": 1,
                "title": "Alfama",
                "activities": [
                    {
                        "timeSlot": "8:00 AM",
                        "activityName": "Flight from Boston",
                        "description": "Overnight arrival",
                        "estimatedCost": 120.0,
                        "location": "Humberto Delgado Airport",
                        "category": "transport"
                    },
                    {
                        "timeSlot": "1:00 PM",
                        "activityName": "Pasteis de nata",
                        "estimatedCost": 25.5,
                        "category": "meal"
                    }
                ]
            }]
        })
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let spec: ItinerarySpec = serde_json::from_value(sample()).unwrap();
        assert_eq!(spec.origin_city.as_deref(), Some("Boston"));
        assert_eq!(spec.days[0].activities[1].category, ActivityCategory::Meal);
        assert_eq!(spec.days[0].activities[1].location, "");

        let back = serde_json::to_value(&spec).unwrap();
        assert!(back.get("totalEstimatedCost").is_some());
        assert!(back["days"][0].get("dayNumber").is_some());
    }

    #[test]
    fn test_missing_origin_city_is_omitted_on_output() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("originCity");
        let spec: ItinerarySpec = serde_json::from_value(value).unwrap();
        let back = serde_json::to_value(&spec).unwrap();
        assert!(back.get("originCity").is_none());
    }

    #[test]
    fn test_helpers_do_not_reconcile_totals() {
        let mut spec: ItinerarySpec = serde_json::from_value(sample()).unwrap();
        spec.total_estimated_cost = 9999.0;
        assert_eq!(spec.activity_count(), 2);
        assert_eq!(spec.summed_activity_cost(), 145.5);
        assert_eq!(spec.total_estimated_cost, 9999.0);
    }

    #[test]
    fn test_category_matching_is_case_insensitive() {
        let mut value = sample();
        value["days"][0]["activities"][0]["category"] = json!("Transport");
        value["days"][0]["activities"][1]["category"] = json!(" MEAL ");

        let spec: ItinerarySpec = serde_json::from_value(value).unwrap();
        assert_eq!(spec.days[0].activities[0].category, ActivityCategory::Transport);
        assert_eq!(spec.days[0].activities[1].category, ActivityCategory::Meal);
    }

    #[test]
    fn test_unknown_category_is_kept() {
        let mut value = sample();
        value["days"][0]["activities"][0]["category"] = json!("shopping");

        let spec: ItinerarySpec = serde_json::from_value(value).unwrap();
        let category = &spec.days[0].activities[0].category;
        assert_eq!(category, &ActivityCategory::Other("shopping".to_string()));

        let back = serde_json::to_value(&spec).unwrap();
        assert_eq!(back["days"][0]["activities"][0]["category"], "shopping");
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let mut value = sample();
        value["days"][0]["title"] = json!(null);
        value["days"][0]["activities"][0]["estimatedCost"] = json!(null);
        value["days"][0]["activities"][0]["location"] = json!(null);

        let spec: ItinerarySpec = serde_json::from_value(value).unwrap();
        assert_eq!(spec.days[0].title, "");
        assert_eq!(spec.days[0].activities[0].estimated_cost, 0.0);
        assert_eq!(spec.days[0].activities[0].location, "");
        assert_eq!(spec.summed_activity_cost(), 25.5);
    }
}
