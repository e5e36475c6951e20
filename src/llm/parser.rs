use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::analysis::{AnalysisResult, RawVerdict, SimulationEntry, Verdict};

const KEYS: [&str; 4] = [
    "geo_score",
    "gap_analysis",
    "search_engine_simulation",
    "recommendations",
];

pub fn parse_verdict(raw: RawVerdict) -> Verdict {
    match raw {
        RawVerdict::Text(text) => parse_response(&text),
        RawVerdict::Structured(result) => Verdict::Complete(sanitize(result)),
        RawVerdict::Failed(reason) => Verdict::degraded(reason),
    }
}

/// Parse engine output into a validated result. Anything unusable becomes `Degraded`.
pub fn parse_response(response: &str) -> Verdict {
    match try_parse(response) {
        Ok(result) => Verdict::Complete(result),
        Err(e) => {
            tracing::warn!("Discarding analysis response: {}", e);
            Verdict::degraded(e.to_string())
        }
    }
}

fn try_parse(response: &str) -> Result<AnalysisResult> {
    let value = parse_json(response)?;

    let object = value
        .as_object()
        .ok_or_else(|| Error::ParseError("response is not a JSON object".to_string()))?;

    if !KEYS.iter().any(|k| object.contains_key(*k)) {
        return Err(Error::ParseError(
            "response contains none of the expected keys".to_string(),
        ));
    }

    let geo_score = match object.get("geo_score") {
        None | Some(Value::Null) => 0,
        Some(v) => score(v).ok_or_else(|| shape_error("geo_score", "a number"))?,
    };

    let gap_analysis = match object.get("gap_analysis") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(shape_error("gap_analysis", "a string")),
    };

    let simulations = match object.get("search_engine_simulation") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(simulation_entry).collect(),
        Some(_) => return Err(shape_error("search_engine_simulation", "an array")),
    };

    let recommendations = match object.get("recommendations") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                other => {
                    tracing::warn!("Dropping malformed recommendation: {}", other);
                    None
                }
            })
            .collect(),
        Some(_) => return Err(shape_error("recommendations", "an array")),
    };

    Ok(AnalysisResult {
        geo_score,
        gap_analysis,
        simulations,
        recommendations,
    })
}

fn parse_json(response: &str) -> Result<Value> {
    let stripped = strip_fences(response);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return Ok(value);
    }

    let candidate = extract_json(response)?;
    serde_json::from_str(&candidate)
        .map_err(|e| Error::ParseError(format!("Failed to parse analysis response: {}", e)))
}

fn strip_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop an optional language tag on the opening fence
        text = match rest.find('\n') {
            Some(i) if !rest[..i].contains('{') => &rest[i + 1..],
            _ => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn extract_json(text: &str) -> Result<String> {
    // Try to find JSON block in markdown code blocks
    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return Ok(text[start..start + end].trim().to_string());
        }
    }

    // Try to find raw JSON object
    if let Some(start) = text.find('{') {
        let mut depth = 0;
        let mut end = start;
        let mut in_string = false;
        let mut escape_next = false;

        for (i, c) in text[start..].char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }

            match c {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        end = start + i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }

        if depth == 0 && end > start {
            return Ok(text[start..end].to_string());
        }
    }

    Err(Error::ParseError("No valid JSON found in response".to_string()))
}

fn simulation_entry(item: &Value) -> Option<SimulationEntry> {
    let Some(entry) = item.as_object() else {
        tracing::warn!("Dropping non-object simulation entry: {}", item);
        return None;
    };

    let engine = text_field(entry, "engine").filter(|e| !e.is_empty());
    let Some(engine) = engine else {
        tracing::warn!("Dropping simulation entry without an engine name");
        return None;
    };

    Some(SimulationEntry {
        engine,
        query: text_field(entry, "query")
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| "N/A".to_string()),
        simulation_text: text_field(entry, "simulation").unwrap_or_default(),
        visibility_score: entry.get("score").and_then(score).unwrap_or(0),
    })
}

fn text_field(entry: &Map<String, Value>, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integers, floats and numeric strings, clamped to 0..=100.
fn score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

fn shape_error(key: &str, expected: &str) -> Error {
    Error::ParseError(format!("'{}' must be {}", key, expected))
}

/// Re-apply the text path's repairs to a result that arrived pre-built.
fn sanitize(result: AnalysisResult) -> AnalysisResult {
    AnalysisResult {
        geo_score: result.geo_score.min(100),
        gap_analysis: result.gap_analysis.trim().to_string(),
        simulations: result
            .simulations
            .into_iter()
            .filter(|s| !s.engine.trim().is_empty())
            .map(|s| SimulationEntry {
                engine: s.engine.trim().to_string(),
                query: if s.query.trim().is_empty() {
                    "N/A".to_string()
                } else {
                    s.query.trim().to_string()
                },
                simulation_text: s.simulation_text.trim().to_string(),
                visibility_score: s.visibility_score.min(100),
            })
            .collect(),
        recommendations: result
            .recommendations
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect(),
    }
}
