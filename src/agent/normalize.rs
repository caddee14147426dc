//! Turns a free-form model reply into a typed result.
//!
//! A reply is accepted only when it is a JSON object (optionally inside a
//! single Markdown code fence) whose expected fields, when present, are
//! strings. Anything else becomes [`Normalized::Fallback`] carrying the raw
//! reply; normalization itself never fails.

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const UNKNOWN: &str = "unknown";
pub const FALLBACK_FIX_EXPLANATION: &str = "Auto-generated fix";

/// The structured shape expected at one call site.
pub trait ResponseShape: DeserializeOwned {
    /// Placeholder value for an unparseable reply. The designated free-text
    /// field holds `raw` verbatim.
    fn fallback(raw: &str) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized<T> {
    Structured(T),
    Fallback(String),
}

impl<T: ResponseShape> Normalized<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Normalized::Fallback(_))
    }

    /// Resolve to field values, substituting placeholders for a fallback.
    pub fn into_fields(self) -> T {
        match self {
            Normalized::Structured(fields) => fields,
            Normalized::Fallback(raw) => T::fallback(&raw),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiagnosisFields {
    pub error_type: String,
    pub failed_file: String,
    pub analysis: String,
}

impl ResponseShape for DiagnosisFields {
    fn fallback(raw: &str) -> Self {
        Self {
            error_type: UNKNOWN.to_string(),
            failed_file: UNKNOWN.to_string(),
            analysis: raw.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FixFields {
    pub fixed_content: String,
    pub explanation: String,
}

impl ResponseShape for FixFields {
    fn fallback(raw: &str) -> Self {
        Self {
            fixed_content: raw.to_string(),
            explanation: FALLBACK_FIX_EXPLANATION.to_string(),
        }
    }
}

pub fn normalize<T: ResponseShape>(raw: &str) -> Normalized<T> {
    let candidate = strip_code_fence(raw.trim());

    let value = match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(value) if value.is_object() => value,
        Ok(_) => {
            tracing::warn!("Model reply is JSON but not an object, using fallback");
            return Normalized::Fallback(raw.to_string());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Model reply is not JSON, using fallback");
            return Normalized::Fallback(raw.to_string());
        }
    };

    match serde_json::from_value::<T>(value) {
        Ok(fields) => Normalized::Structured(fields),
        Err(e) => {
            tracing::warn!(error = %e, "Model reply does not match the expected shape, using fallback");
            Normalized::Fallback(raw.to_string())
        }
    }
}

/// Unwrap ```` ```json ... ``` ```` if the whole reply is one fenced block.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => text,
    }
}
