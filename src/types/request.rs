use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{GatewayError, Result};

const DEFAULT_FORM_BUDGET: &str = "flexible";
const DEFAULT_FORM_STYLES: &str = "general";
const DEFAULT_SURPRISE_VIBE: &str = "adventurous";
const DEFAULT_SURPRISE_DAYS: u32 = 3;

/// Author of a conversation turn, as the chat UI records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a prior conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Trip budget: either a dollar amount or a free-form label such as "flexible".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Budget {
    Amount(f64),
    Label(String),
}

impl Budget {
    /// A budget is empty when it is a blank label or a non-positive amount.
    pub fn is_empty(&self) -> bool {
        match self {
            Budget::Amount(amount) => !amount.is_finite() || *amount <= 0.0,
            Budget::Label(label) => label.trim().is_empty(),
        }
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            Budget::Amount(amount) => Some(*amount),
            Budget::Label(label) => label
                .trim()
                .trim_start_matches('$')
                .replace(',', "")
                .parse::<f64>()
                .ok(),
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Budget::Label(String::new())
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Budget::Amount(amount) => write!(f, "{}", amount),
            Budget::Label(label) => f.write_str(label.trim()),
        }
    }
}

impl std::str::FromStr for Budget {
    type Err = std::convert::Infallible;

    /// Numbers become amounts, anything else is kept as a label.
    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = value.trim();
        Ok(match trimmed.parse::<f64>() {
            Ok(amount) if amount.is_finite() => Budget::Amount(amount),
            _ => Budget::Label(trimmed.to_string()),
        })
    }
}

impl From<f64> for Budget {
    fn from(amount: f64) -> Self {
        Budget::Amount(amount)
    }
}

impl From<u32> for Budget {
    fn from(amount: u32) -> Self {
        Budget::Amount(f64::from(amount))
    }
}

impl From<&str> for Budget {
    fn from(label: &str) -> Self {
        Budget::Label(label.to_string())
    }
}

impl From<String> for Budget {
    fn from(label: String) -> Self {
        Budget::Label(label)
    }
}

/// Free-form conversation with the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, rename = "conversationHistory")]
    pub history: Vec<ConversationTurn>,
}

/// Structured planning form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub destination: String,
    #[serde(default, deserialize_with = "lenient_days")]
    pub days: u32,
    #[serde(default = "default_form_budget", deserialize_with = "form_budget")]
    pub budget: Budget,
    #[serde(default = "default_form_styles", deserialize_with = "form_styles")]
    pub styles: String,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub origin_city: Option<String>,
}

impl FormRequest {
    pub fn new(destination: impl Into<String>, days: u32) -> Self {
        Self {
            destination: destination.into(),
            days,
            budget: default_form_budget(),
            styles: default_form_styles(),
            start_date: None,
            origin_city: None,
        }
    }

    /// A blank budget keeps the "flexible" default.
    pub fn with_budget(mut self, budget: impl Into<Budget>) -> Self {
        self.budget = or_form_budget(budget.into());
        self
    }

    pub fn with_styles(mut self, styles: impl Into<String>) -> Self {
        self.styles = or_default(styles.into(), DEFAULT_FORM_STYLES);
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_origin_city(mut self, origin_city: impl Into<String>) -> Self {
        self.origin_city = Some(origin_city.into());
        self
    }
}

/// "Surprise me": the model picks the destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurpriseRequest {
    #[serde(default, deserialize_with = "nullable_budget")]
    pub budget: Budget,
    #[serde(default = "default_surprise_vibe", deserialize_with = "surprise_vibe")]
    pub vibe: String,
    #[serde(default = "default_surprise_days", deserialize_with = "surprise_days")]
    pub days: u32,
    #[serde(default)]
    pub origin_city: Option<String>,
}

impl SurpriseRequest {
    pub fn new(budget: impl Into<Budget>) -> Self {
        Self {
            budget: budget.into(),
            vibe: default_surprise_vibe(),
            days: default_surprise_days(),
            origin_city: None,
        }
    }

    pub fn with_vibe(mut self, vibe: impl Into<String>) -> Self {
        self.vibe = or_default(vibe.into(), DEFAULT_SURPRISE_VIBE);
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_origin_city(mut self, origin_city: impl Into<String>) -> Self {
        self.origin_city = Some(origin_city.into());
        self
    }
}

/// Planner forms post `""` when no date was picked.
fn blank_date_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// Planner forms send `""` and `null` for untouched inputs and stringly numbers
// for typed ones; these treat them the way the form itself would.

fn or_default(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn or_form_budget(budget: Budget) -> Budget {
    if budget.is_empty() {
        default_form_budget()
    } else {
        budget
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_budget<'de, D>(deserializer: D) -> std::result::Result<Budget, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Budget>::deserialize(deserializer)?.unwrap_or_default())
}

fn form_budget<'de, D>(deserializer: D) -> std::result::Result<Budget, D::Error>
where
    D: Deserializer<'de>,
{
    nullable_budget(deserializer).map(or_form_budget)
}

fn form_styles<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    null_as_empty(deserializer).map(|styles| or_default(styles, DEFAULT_FORM_STYLES))
}

fn surprise_vibe<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    null_as_empty(deserializer).map(|vibe| or_default(vibe, DEFAULT_SURPRISE_VIBE))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DayCount {
    Whole(i64),
    Fractional(f64),
    Text(String),
}

impl DayCount {
    /// `None` for a blank string; unparseable text reads as 0.
    fn value(self) -> Option<i64> {
        match self {
            DayCount::Whole(days) => Some(days),
            DayCount::Fractional(days) if days.is_finite() => Some(days.trunc() as i64),
            DayCount::Fractional(_) => Some(0),
            DayCount::Text(text) if text.trim().is_empty() => None,
            DayCount::Text(text) => Some(text.trim().parse::<i64>().unwrap_or(0)),
        }
    }
}

/// Non-positive counts collapse to 0, which validation rejects.
fn clamp_days(days: i64) -> u32 {
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

fn lenient_days<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let days = Option::<DayCount>::deserialize(deserializer)?.and_then(DayCount::value);
    Ok(clamp_days(days.unwrap_or(0)))
}

/// Missing, blank or zero means the default trip length; negatives stay invalid.
fn surprise_days<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let days = Option::<DayCount>::deserialize(deserializer)?.and_then(DayCount::value);
    Ok(match days {
        None | Some(0) => DEFAULT_SURPRISE_DAYS,
        Some(days) => clamp_days(days),
    })
}

fn default_form_budget() -> Budget {
    Budget::Label(DEFAULT_FORM_BUDGET.to_string())
}

fn default_form_styles() -> String {
    DEFAULT_FORM_STYLES.to_string()
}

fn default_surprise_vibe() -> String {
    DEFAULT_SURPRISE_VIBE.to_string()
}

fn default_surprise_days() -> u32 {
    DEFAULT_SURPRISE_DAYS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Chat,
    Form,
    Surprise,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Chat => "chat",
            GenerationMode::Form => "form",
            GenerationMode::Surprise => "surprise",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generation call, discarded once the response is produced.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    Chat(ChatRequest),
    Form(FormRequest),
    Surprise(SurpriseRequest),
}

impl GenerationRequest {
    pub fn mode(&self) -> GenerationMode {
        match self {
            GenerationRequest::Chat(_) => GenerationMode::Chat,
            GenerationRequest::Form(_) => GenerationMode::Form,
            GenerationRequest::Surprise(_) => GenerationMode::Surprise,
        }
    }

    /// Reject requests that must never reach the model.
    pub fn validate(&self) -> Result<()> {
        match self {
            GenerationRequest::Chat(chat) => {
                if chat.message.trim().is_empty() {
                    return Err(GatewayError::Validation("Message is required".to_string()));
                }
            }
            GenerationRequest::Form(form) => {
                if form.destination.trim().is_empty() || form.days == 0 {
                    return Err(GatewayError::Validation(
                        "Destination and days are required".to_string(),
                    ));
                }
            }
            GenerationRequest::Surprise(surprise) => {
                if surprise.budget.is_empty() {
                    return Err(GatewayError::Validation("Budget is required".to_string()));
                }
                if surprise.days == 0 {
                    return Err(GatewayError::Validation(
                        "Days must be a positive number".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl From<ChatRequest> for GenerationRequest {
    fn from(request: ChatRequest) -> Self {
        GenerationRequest::Chat(request)
    }
}

impl From<FormRequest> for GenerationRequest {
    fn from(request: FormRequest) -> Self {
        GenerationRequest::Form(request)
    }
}

impl From<SurpriseRequest> for GenerationRequest {
    fn from(request: SurpriseRequest) -> Self {
        GenerationRequest::Surprise(request)
    }
}
