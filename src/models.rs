use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ExtractionError;

/// Sentinel the model is told to use for unknown string fields.
pub const NOT_SPECIFIED: &str = "Not specified";
pub const DEFAULT_TRAVEL_MODE: &str = "Flight";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
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

    pub(crate) fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Body accepted by the completion endpoint and sent by the relay client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub messages: Vec<ChatTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatTurn>) -> Self {
        Self {
            messages,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Token accounting as reported by the provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletionResult {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Error body returned by the endpoint for every failure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}

// Provider (OpenAI-compatible) chat completion wire format
#[derive(Debug, Serialize, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct ProviderResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ProviderMessage,
}

#[derive(Debug, Deserialize)]
pub struct ProviderMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorEnvelope {
    pub error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorDetail {
    pub message: Option<String>,
}

/// Flexible traveler count: models emit `4`, `4.0` or `"4"` interchangeably.
fn deserialize_flexible_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(i64),
        Float(f64),
        String(String),
    }

    let value = Option::<FlexibleInt>::deserialize(deserializer)?;
    let n = match value {
        None => return Ok(None),
        Some(FlexibleInt::Int(i)) => i,
        Some(FlexibleInt::Float(f)) if f.fract() == 0.0 => f as i64,
        Some(FlexibleInt::Float(f)) => {
            return Err(serde::de::Error::custom(format!("{f} is not a whole number")));
        }
        Some(FlexibleInt::String(s)) => s.trim().parse::<i64>().map_err(serde::de::Error::custom)?,
    };
    if n <= 0 {
        return Err(serde::de::Error::custom(format!("{n} is not a positive count")));
    }
    u32::try_from(n).map(Some).map_err(serde::de::Error::custom)
}

/// Structured trip description consumed by downstream screens.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    pub destination: String,
    pub origin: String,
    pub travelers: u32,
    pub duration: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: String,
    pub interests: Vec<String>,
    pub travel_mode: String,
}

/// Read one field of a reply object; absent and `null` both mean `None`.
fn read_field<T: DeserializeOwned>(
    obj: &serde_json::Map<String, serde_json::Value>,
    name: &'static str,
) -> Result<Option<T>, ExtractionError> {
    match obj.get(name) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ExtractionError::InvalidField {
                field: name,
                reason: e.to_string(),
            }),
    }
}

impl TripRecord {
    /// Parse a model reply strictly as a JSON object and validate it.
    pub fn from_reply(raw: &str) -> Result<Self, ExtractionError> {
        let value: serde_json::Value = serde_json::from_str(raw.trim())
            .map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
        let serde_json::Value::Object(obj) = value else {
            return Err(ExtractionError::NotAnObject);
        };

        let travelers = match obj.get("travelers") {
            None => None,
            Some(value) => deserialize_flexible_count(value.clone()).map_err(|e| {
                ExtractionError::InvalidField {
                    field: "travelers",
                    reason: e.to_string(),
                }
            })?,
        };

        let record = Self {
            destination: read_field(&obj, "destination")?
                .ok_or(ExtractionError::MissingField("destination"))?,
            origin: or_not_specified(read_field(&obj, "origin")?),
            travelers: travelers.ok_or(ExtractionError::MissingField("travelers"))?,
            duration: read_field(&obj, "duration")?
                .ok_or(ExtractionError::MissingField("duration"))?,
            start_date: or_not_specified(read_field(&obj, "startDate")?),
            end_date: or_not_specified(read_field(&obj, "endDate")?),
            budget: or_not_specified(read_field(&obj, "budget")?),
            interests: dedup(read_field(&obj, "interests")?.unwrap_or_default()),
            travel_mode: read_field::<String>(&obj, "travelMode")?
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TRAVEL_MODE.to_string()),
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the fields every consumer relies on.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.destination.trim().is_empty() {
            return Err(ExtractionError::InvalidField {
                field: "destination",
                reason: "must not be blank".to_string(),
            });
        }
        if self.travelers == 0 {
            return Err(ExtractionError::InvalidField {
                field: "travelers",
                reason: "must be a positive integer".to_string(),
            });
        }
        if self.duration.trim().is_empty() {
            return Err(ExtractionError::InvalidField {
                field: "duration",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Shallow field-by-field merge; fields absent from the patch are kept.
    pub fn apply(&self, patch: &TripPatch) -> Result<Self, ExtractionError> {
        let merged = Self {
            destination: patch.destination.clone().unwrap_or_else(|| self.destination.clone()),
            origin: patch.origin.clone().unwrap_or_else(|| self.origin.clone()),
            travelers: patch.travelers.unwrap_or(self.travelers),
            duration: patch.duration.clone().unwrap_or_else(|| self.duration.clone()),
            start_date: patch.start_date.clone().unwrap_or_else(|| self.start_date.clone()),
            end_date: patch.end_date.clone().unwrap_or_else(|| self.end_date.clone()),
            budget: patch.budget.clone().unwrap_or_else(|| self.budget.clone()),
            interests: patch
                .interests
                .clone()
                .map(dedup)
                .unwrap_or_else(|| self.interests.clone()),
            travel_mode: patch.travel_mode.clone().unwrap_or_else(|| self.travel_mode.clone()),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Field-level overrides for a stored [`TripRecord`].
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travelers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<String>,
}

impl TripPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn or_not_specified(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
