// src/analyze/validator.rs
//! Strict acceptance of model replies.
//!
//! A reply becomes an [`AnalysisResult`] only when every field in the schema
//! table is present with the declared JSON type. Nothing is coerced or filled
//! in. Data-quality findings are advisory and never change the outcome.

use serde_json::{Map, Value};

use super::schema::{Field, FieldType, ANALYSIS_FIELDS};
use super::AnalysisResult;
use crate::error::ResponseError;

const PLACEHOLDERS: &[&str] = &["n/a", "none", "tbd", "to be determined"];

const TEMPLATE_TOKENS: &[&str] = &[
    "Factor 1", "Factor 2", "Strength 1", "Strength 2", "Weakness 1", "Weakness 2",
    "Pain point 1", "Pain point 2", "Gap 1", "Gap 2", "Risk 1", "Risk 2", "Strategy 1",
    "Strategy 2", "Opportunity 1", "Opportunity 2", "Recommendation 1", "Recommendation 2",
    "Action 1", "Action 2", "Suggestion 1", "Suggestion 2",
];

const TEMPLATE_STATEMENTS: &[&str] = &[
    "clear statement of unique value",
    "brief competitive overview",
    "specific pricing approach",
    "detailed analysis of market saturation",
    "clear problem-solution fit description",
    "unit economics assessment",
    "calculated score from",
    "your assessment",
];

/// Parse and schema-check a raw model reply.
pub fn validate_response(raw: &str) -> Result<AnalysisResult, ResponseError> {
    let json = extract_json(raw)?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ResponseError::Parse(format!("malformed JSON: {e}")))?;
    let Value::Object(root) = &value else {
        return Err(ResponseError::Parse(format!(
            "expected a JSON object, found {}",
            json_type(&value)
        )));
    };
    check_object(root, ANALYSIS_FIELDS, "")?;

    serde_json::from_value(value).map_err(|e| ResponseError::Schema {
        field: String::new(),
        reason: e.to_string(),
    })
}

/// Strip Markdown fences and take the outermost `{ ... }` span.
fn extract_json(raw: &str) -> Result<&str, ResponseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ResponseError::Parse("empty reply from model".to_string()));
    }
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let body = body.trim_end().strip_suffix("```").unwrap_or(body);

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(ResponseError::Parse(
            "no JSON object found in model reply".to_string(),
        )),
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn violation(field: String, reason: impl Into<String>) -> ResponseError {
    ResponseError::Schema {
        field,
        reason: reason.into(),
    }
}

fn check_object(obj: &Map<String, Value>, fields: &[Field], path: &str) -> Result<(), ResponseError> {
    for field in fields {
        let here = join(path, field.name);
        match obj.get(field.name) {
            None | Some(Value::Null) => return Err(violation(here, "missing required field")),
            Some(v) => check_value(v, field.ty, &here)?,
        }
    }
    Ok(())
}

fn check_value(v: &Value, ty: FieldType, path: &str) -> Result<(), ResponseError> {
    let ok = match (ty, v) {
        (FieldType::String, Value::String(_)) => true,
        (FieldType::Number, Value::Number(_)) => true,
        (FieldType::Integer, Value::Number(n)) => n.as_i64().is_some(),
        (FieldType::StringList, Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    return Err(violation(
                        format!("{path}[{i}]"),
                        format!("expected a string, found {}", json_type(item)),
                    ));
                }
            }
            true
        }
        (FieldType::Object(fields), Value::Object(obj)) => {
            check_object(obj, fields, path)?;
            true
        }
        (FieldType::ObjectList(fields), Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let here = format!("{path}[{i}]");
                let Value::Object(obj) = item else {
                    return Err(violation(
                        here,
                        format!("expected an object, found {}", json_type(item)),
                    ));
                };
                check_object(obj, fields, &here)?;
            }
            true
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(violation(
            path.to_string(),
            format!("expected {}, found {}", ty.describe(), json_type(v)),
        ))
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "a fractional number",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Advisory findings on an accepted analysis: out-of-range scores,
/// placeholder values, copied template text, empty lists.
pub fn quality_issues(result: &AnalysisResult) -> Vec<String> {
    let mut issues = Vec::new();

    let score = result.market_assessment.overall_score;
    if !(0..=100).contains(&score) {
        issues.push(format!("market_assessment.overall_score: {score} outside 0-100"));
    }
    range_issue(
        &mut issues,
        "uniqueness_analysis.novelty_score",
        result.uniqueness_analysis.novelty_score.as_f64(),
        10.0,
    );
    range_issue(
        &mut issues,
        "analysis_metadata.confidence_score",
        result.analysis_metadata.confidence_score.as_f64(),
        1.0,
    );

    if let Ok(value) = serde_json::to_value(result) {
        walk_text(&value, "", &mut issues);
    }
    issues
}

fn range_issue(issues: &mut Vec<String>, path: &str, v: Option<f64>, max: f64) {
    if let Some(v) = v {
        if !(0.0..=max).contains(&v) {
            issues.push(format!("{path}: {v} outside 0-{max}"));
        }
    }
}

fn walk_text(v: &Value, path: &str, issues: &mut Vec<String>) {
    match v {
        Value::Object(obj) => {
            for (k, child) in obj {
                walk_text(child, &join(path, k), issues);
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                issues.push(format!("{path}: empty list"));
            }
            for (i, child) in items.iter().enumerate() {
                walk_text(child, &format!("{path}[{i}]"), issues);
            }
        }
        Value::String(s) => {
            if let Some(problem) = text_problem(s) {
                issues.push(format!("{path}: {problem}"));
            }
        }
        _ => {}
    }
}

fn text_problem(s: &str) -> Option<&'static str> {
    let trimmed = s.trim();
    let lower = trimmed.to_lowercase();
    if trimmed.is_empty() {
        return Some("empty text");
    }
    if PLACEHOLDERS.contains(&lower.as_str()) {
        return Some("placeholder value");
    }
    if TEMPLATE_TOKENS.iter().any(|t| trimmed.contains(t))
        || TEMPLATE_STATEMENTS.iter().any(|t| lower.contains(t))
    {
        return Some("copied template text");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conformant() -> Value {
        json!({
            "analysis_metadata": {
                "confidence_score": 0.72,
                "analysis_depth": "comprehensive",
                "data_sources_used": ["trends", "competitors"]
            },
            "market_assessment": {
                "overall_score": 64,
                "verdict": "Niche but loyal demand",
                "market_saturation": "Low for subscription formats",
                "entry_barriers": "Sourcing quality left-handed tools",
                "market_timing": "Steady hobby-craft growth"
            },
            "competitive_landscape": {
                "existing_solutions": [{
                    "name": "Anything Left-Handed",
                    "strengths": ["Broad catalogue"],
                    "weaknesses": ["No subscription"],
                    "market_position": "Specialist retailer",
                    "customer_pain_points": ["Hard to discover new tools"],
                    "differentiation_gaps": ["Curation"]
                }],
                "market_gaps": ["Recurring curated boxes"],
                "competitive_advantages": ["Community focus"],
                "market_saturation_level": "low"
            },
            "uniqueness_analysis": {
                "novelty_score": 6.5,
                "differentiation_factors": ["Curated left-handed tools"],
                "copycat_risk": "Moderate; low capital needs",
                "innovation_level": "Incremental",
                "unique_value_proposition": "Monthly tools that actually fit lefties"
            },
            "business_viability": {
                "customer_value_proposition": "Saves searching for niche tools",
                "target_market_size": "About 10% of crafters",
                "monetization_potential": "Subscription plus add-ons",
                "pricing_strategy": "Tiered monthly plans",
                "customer_acquisition_cost": "Low via communities",
                "unit_economics": "Positive after month three"
            },
            "risk_assessment": {
                "market_risks": ["Small addressable market"],
                "execution_risks": ["Inventory sourcing"],
                "competitive_risks": ["Retailers adding boxes"],
                "mitigation_strategies": ["Exclusive supplier deals"],
                "risk_level": "medium"
            },
            "value_enhancement_roadmap": {
                "current_gaps": ["Brand awareness"],
                "differentiation_opportunities": ["Ergonomic reviews"],
                "feature_prioritization": ["Quiz-based personalization"],
                "market_positioning": ["Premium niche"],
                "competitive_response_strategy": ["Lock in community partnerships"]
            },
            "strategic_recommendations": {
                "market_entry_strategy": "Launch through left-handed forums",
                "pivot_suggestions": ["Expand to kitchen tools"],
                "success_factors": ["Retention above 80%"],
                "next_steps": ["Pre-sell 100 boxes"],
                "timeline_recommendations": "MVP within eight weeks"
            }
        })
    }

    #[test]
    fn conformant_reply_round_trips_unchanged() {
        let raw = conformant().to_string();
        let result = validate_response(&raw).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), conformant());
        assert!(quality_issues(&result).is_empty());
    }

    #[test]
    fn keys_outside_the_schema_survive_the_round_trip() {
        let mut v = conformant();
        v["analysis_metadata"]["analysis_timestamp"] = json!("2026-10-16T09:00:00Z");
        v["competitive_landscape"]["existing_solutions"][0]["founded"] = json!(1968);
        v["market_insights"] = json!({ "seasonality": ["back to school"] });

        let result = validate_response(&v.to_string()).unwrap();
        assert_eq!(result.extra["market_insights"]["seasonality"][0], "back to school");
        assert_eq!(serde_json::to_value(&result).unwrap(), v);
    }

    #[test]
    fn fenced_reply_with_chatter_is_accepted() {
        let raw = format!("```json\nHere you go: {}\n```", conformant());
        assert!(validate_response(&raw).is_ok());
    }

    #[test]
    fn missing_section_is_named() {
        let mut v = conformant();
        v.as_object_mut().unwrap().remove("risk_assessment");
        let err = validate_response(&v.to_string()).unwrap_err();
        assert_eq!(
            err,
            ResponseError::Schema {
                field: "risk_assessment".into(),
                reason: "missing required field".into()
            }
        );
    }

    #[test]
    fn nested_type_errors_carry_dotted_paths() {
        let mut v = conformant();
        v["competitive_landscape"]["existing_solutions"][0]["name"] = json!(42);
        let err = validate_response(&v.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ResponseError::Schema { ref field, .. } if field == "competitive_landscape.existing_solutions[0].name"
        ));

        let mut v = conformant();
        v["market_assessment"]["overall_score"] = json!("85");
        let err = validate_response(&v.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ResponseError::Schema { ref field, .. } if field == "market_assessment.overall_score"
        ));

        let mut v = conformant();
        v["market_assessment"]["overall_score"] = json!(64.5);
        assert!(validate_response(&v.to_string()).is_err());

        let mut v = conformant();
        v["risk_assessment"]["market_risks"][0] = json!(null);
        let err = validate_response(&v.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ResponseError::Schema { ref field, .. } if field == "risk_assessment.market_risks[0]"
        ));
    }

    #[test]
    fn parse_failures() {
        for raw in ["", "   ", "I cannot help with that.", "{ \"analysis_metadata\": "] {
            assert!(matches!(validate_response(raw), Err(ResponseError::Parse(_))), "{raw:?}");
        }
        assert!(matches!(validate_response("[1, 2]"), Err(ResponseError::Parse(_))));
    }

    #[test]
    fn quality_issues_are_reported() {
        let mut v = conformant();
        v["market_assessment"]["overall_score"] = json!(140);
        v["risk_assessment"]["risk_level"] = json!("TBD");
        v["value_enhancement_roadmap"]["current_gaps"] = json!([]);
        v["strategic_recommendations"]["next_steps"] = json!(["Action 1"]);
        let result = validate_response(&v.to_string()).unwrap();
        let issues = quality_issues(&result);
        assert_eq!(issues.len(), 4, "{issues:?}");
        assert!(issues.iter().any(|i| i.starts_with("market_assessment.overall_score")));
        assert!(issues.iter().any(|i| i == "risk_assessment.risk_level: placeholder value"));
        assert!(issues.iter().any(|i| i == "value_enhancement_roadmap.current_gaps: empty list"));
    }
}
