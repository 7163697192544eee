// src/agent/parser.rs — Decode model responses into structured evaluations
//
// The evaluation contract is a ```json block with a fixed shape. A
// response without a decodable block is rejected outright — the caller
// keeps its session state and may re-evaluate, so salvaging half-parsed
// scores would only hide model drift.

use serde::Deserialize;

use crate::agent::session::CriteriaScores;
use crate::infra::errors::ScadCriticError;

/// Structured result of one model evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEval {
    pub score: u8,
    pub summary: String,
    pub criteria: CriteriaScores,
    pub issues: Vec<String>,
    pub suggested_code: Option<String>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEval {
    score: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    criteria_scores: RawCriteria,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    suggested_code: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCriteria {
    #[serde(default)]
    recognizability: f64,
    #[serde(default)]
    proportions: f64,
    #[serde(default)]
    visual_quality: f64,
    #[serde(default)]
    structural: f64,
    #[serde(default)]
    code_quality: f64,
}

/// Extract the ```json block from a response and decode it.
pub fn parse_evaluation(response: &str) -> Result<ParsedEval, ScadCriticError> {
    let block = extract_fenced(response, "json").ok_or_else(|| {
        ScadCriticError::MalformedResponse("no ```json block in response".into())
    })?;

    let raw: RawEval = serde_json::from_str(block)
        .map_err(|e| ScadCriticError::MalformedResponse(format!("invalid evaluation JSON: {e}")))?;

    Ok(ParsedEval {
        score: clamp_score(raw.score),
        summary: raw.summary,
        criteria: CriteriaScores {
            recognizability: clamp_score(raw.criteria_scores.recognizability),
            proportions: clamp_score(raw.criteria_scores.proportions),
            visual_quality: clamp_score(raw.criteria_scores.visual_quality),
            structural: clamp_score(raw.criteria_scores.structural),
            code_quality: clamp_score(raw.criteria_scores.code_quality),
        },
        issues: raw.issues,
        suggested_code: raw
            .suggested_code
            .filter(|code| !code.trim().is_empty()),
        stop_reason: raw.stop_reason.filter(|r| !r.trim().is_empty()),
    })
}

/// Extract generated source from an ```openscad fence, falling back to
/// the raw text when the model skipped the fence.
pub fn extract_generated_code(response: &str) -> String {
    extract_fenced(response, "openscad")
        .or_else(|| extract_fenced(response, "scad"))
        .map(str::to_string)
        .unwrap_or_else(|| response.trim().to_string())
}

/// Pull the body out of a ```lang fenced block.
fn extract_fenced<'a>(text: &'a str, lang: &str) -> Option<&'a str> {
    let open = format!("```{lang}");
    let start = text.find(&open)? + open.len();
    let rest = &text[start..];
    let rest = rest.strip_prefix('\r').unwrap_or(rest);
    let rest = rest.strip_prefix('\n')?;
    let end = rest.find("```")?;
    Some(rest[..end].trim_end())
}

fn clamp_score(value: f64) -> u8 {
    value.round().clamp(0.0, 10.0) as u8
}
