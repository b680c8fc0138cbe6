use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{snippet_of, GatewayError, Result},
    schemas::{ResponseSchema, Validator},
    types::ItinerarySpec,
};

/// One way of locating a JSON object inside model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// The whole response is JSON.
    WholeText,
    /// Contents of the first ```json fenced block.
    JsonFence,
    /// Contents of the first fenced block, whatever its tag.
    AnyFence,
    /// From the first `{` to the last `}`.
    BraceSpan,
}

impl ExtractionStrategy {
    /// Precedence order. Tighter strategies run first so a stray `{}` in prose
    /// cannot shadow a properly fenced payload.
    pub const ORDERED: [ExtractionStrategy; 4] = [
        ExtractionStrategy::WholeText,
        ExtractionStrategy::JsonFence,
        ExtractionStrategy::AnyFence,
        ExtractionStrategy::BraceSpan,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::WholeText => "whole_text",
            ExtractionStrategy::JsonFence => "json_fence",
            ExtractionStrategy::AnyFence => "any_fence",
            ExtractionStrategy::BraceSpan => "brace_span",
        }
    }

    /// The slice of `raw` this strategy would try to parse, if it finds one.
    pub fn candidate<'a>(&self, raw: &'a str) -> Option<&'a str> {
        match self {
            ExtractionStrategy::WholeText => Some(raw),
            ExtractionStrategy::JsonFence => capture(json_fence(), raw),
            ExtractionStrategy::AnyFence => capture(any_fence(), raw),
            ExtractionStrategy::BraceSpan => {
                let start = raw.find('{')?;
                let end = raw.rfind('}')?;
                (start < end).then(|| &raw[start..=end])
            }
        }
    }

    /// Parse this strategy's candidate as JSON.
    pub fn apply(&self, raw: &str) -> Option<Value> {
        serde_json::from_str(self.candidate(raw)?).ok()
    }
}

fn json_fence() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)```json\s*([\s\S]*?)\s*```").expect("valid regex"))
}

fn any_fence() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"```\s*([\s\S]*?)\s*```").expect("valid regex"))
}

fn capture<'a>(pattern: &Regex, raw: &'a str) -> Option<&'a str> {
    pattern
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|matched| matched.as_str())
}

/// Recovers structured itineraries from model text that may mix prose, fenced
/// blocks and bare JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser {
    validator: Validator,
}

impl ResponseParser {
    pub fn new(validator: Validator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> Validator {
        self.validator
    }

    /// Run the strategies in order and return the first JSON value found.
    pub fn extract_value(&self, raw: &str) -> Result<(ExtractionStrategy, Value)> {
        ExtractionStrategy::ORDERED
            .iter()
            .find_map(|strategy| strategy.apply(raw).map(|value| (*strategy, value)))
            .ok_or_else(|| {
                warn!(
                    target: "wanderai::extract",
                    snippet = %snippet_of(raw),
                    "no extraction strategy produced JSON"
                );
                GatewayError::parse(raw, "no valid JSON found in response")
            })
    }

    pub fn extract(&self, raw: &str) -> Result<ItinerarySpec> {
        self.extract_as::<ItinerarySpec>(raw)
    }

    /// Extract and decode any response type with a schema.
    pub fn extract_as<T: ResponseSchema>(&self, raw: &str) -> Result<T> {
        let (strategy, value) = self.extract_value(raw)?;
        debug!(target: "wanderai::extract", strategy = strategy.name(), "located JSON payload");

        self.validator.decode::<T>(&value).map_err(|reason| {
            warn!(
                target: "wanderai::extract",
                strategy = strategy.name(),
                reason = %reason,
                snippet = %snippet_of(raw)
            );
            GatewayError::parse(raw, reason)
        })
    }
}
