use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::util::truncate_for_log;

/// A model's answer for one taxonomy level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDecision {
    // None when the model declined to choose
    pub code: Option<String>,
    pub confidence: Option<f64>,
}

/// Parses a level decision out of raw model output.
///
/// Models wrap JSON in prose, code fences or reasoning blocks, so the outermost
/// `{...}` span is extracted first. Anything that does not yield an object is
/// an error; a missing or null `code` is a decline, not an error.
pub fn parse_level_decision(raw: &str) -> Result<LevelDecision> {
    let cleaned = strip_reasoning(raw);
    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    let json_text = match (start, end) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => {
            return Err(anyhow!(
                "no JSON object in model response: {}",
                truncate_for_log(raw, 200)
            ))
        }
    };

    let json: Value = serde_json::from_str(json_text).map_err(|e| {
        anyhow!(
            "invalid JSON in model response ({}): {}",
            e,
            truncate_for_log(json_text, 200)
        )
    })?;
    let object = json
        .as_object()
        .ok_or_else(|| anyhow!("model response is not a JSON object"))?;

    let code = match object.get("code") {
        Some(Value::String(code)) if !code.trim().is_empty() => Some(code.trim().to_string()),
        Some(Value::Number(code)) => Some(code.to_string()),
        _ => None,
    };

    let confidence = match object.get("confidence") {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().trim_end_matches('%').parse::<f64>().ok().map(
            |value| {
                if text.trim().ends_with('%') {
                    value / 100.0
                } else {
                    value
                }
            },
        ),
        _ => None,
    };

    Ok(LevelDecision { code, confidence })
}

// Reasoning models prepend a <think>...</think> block that may contain braces.
fn strip_reasoning(raw: &str) -> &str {
    match raw.rfind("</think>") {
        Some(position) => &raw[position + "</think>".len()..],
        None => raw,
    }
}
