// src/analyze/schema.rs
//! One field table for the analysis contract.
//!
//! The validator walks it to check replies and the model client renders it as
//! the `responseSchema` of the request, so the two can never drift apart.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    /// Any JSON number (integer or float).
    Number,
    /// JSON number without fraction or exponent.
    Integer,
    StringList,
    Object(&'static [Field]),
    ObjectList(&'static [Field]),
}

impl FieldType {
    pub fn describe(self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Number => "a number",
            FieldType::Integer => "an integer",
            FieldType::StringList => "an array of strings",
            FieldType::Object(_) => "an object",
            FieldType::ObjectList(_) => "an array of objects",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub hint: Option<&'static str>,
}

const fn f(name: &'static str, ty: FieldType) -> Field {
    Field {
        name,
        ty,
        hint: None,
    }
}

const fn h(name: &'static str, ty: FieldType, hint: &'static str) -> Field {
    Field {
        name,
        ty,
        hint: Some(hint),
    }
}

use FieldType::{Integer, Number, Object, ObjectList, String as Str, StringList};

const ANALYSIS_METADATA: &[Field] = &[
    h("confidence_score", Number, "Confidence in this analysis, 0.0 to 1.0"),
    f("analysis_depth", Str),
    h("data_sources_used", StringList, "Names of the market signals actually used"),
];

const MARKET_ASSESSMENT: &[Field] = &[
    h("overall_score", Integer, "Overall market score, 0 to 100"),
    f("verdict", Str),
    f("market_saturation", Str),
    f("entry_barriers", Str),
    f("market_timing", Str),
];

const EXISTING_SOLUTION: &[Field] = &[
    f("name", Str),
    f("strengths", StringList),
    f("weaknesses", StringList),
    f("market_position", Str),
    f("customer_pain_points", StringList),
    f("differentiation_gaps", StringList),
];

const COMPETITIVE_LANDSCAPE: &[Field] = &[
    f("existing_solutions", ObjectList(EXISTING_SOLUTION)),
    f("market_gaps", StringList),
    f("competitive_advantages", StringList),
    f("market_saturation_level", Str),
];

const UNIQUENESS_ANALYSIS: &[Field] = &[
    h("novelty_score", Number, "Novelty of the idea, 0 to 10"),
    f("differentiation_factors", StringList),
    f("copycat_risk", Str),
    f("innovation_level", Str),
    f("unique_value_proposition", Str),
];

const BUSINESS_VIABILITY: &[Field] = &[
    f("customer_value_proposition", Str),
    f("target_market_size", Str),
    f("monetization_potential", Str),
    f("pricing_strategy", Str),
    f("customer_acquisition_cost", Str),
    f("unit_economics", Str),
];

const RISK_ASSESSMENT: &[Field] = &[
    f("market_risks", StringList),
    f("execution_risks", StringList),
    f("competitive_risks", StringList),
    f("mitigation_strategies", StringList),
    f("risk_level", Str),
];

const VALUE_ENHANCEMENT_ROADMAP: &[Field] = &[
    f("current_gaps", StringList),
    f("differentiation_opportunities", StringList),
    f("feature_prioritization", StringList),
    f("market_positioning", StringList),
    f("competitive_response_strategy", StringList),
];

const STRATEGIC_RECOMMENDATIONS: &[Field] = &[
    f("market_entry_strategy", Str),
    f("pivot_suggestions", StringList),
    f("success_factors", StringList),
    f("next_steps", StringList),
    f("timeline_recommendations", Str),
];

/// Top-level sections, in output order.
pub const ANALYSIS_FIELDS: &[Field] = &[
    f("analysis_metadata", Object(ANALYSIS_METADATA)),
    f("market_assessment", Object(MARKET_ASSESSMENT)),
    f("competitive_landscape", Object(COMPETITIVE_LANDSCAPE)),
    f("uniqueness_analysis", Object(UNIQUENESS_ANALYSIS)),
    f("business_viability", Object(BUSINESS_VIABILITY)),
    f("risk_assessment", Object(RISK_ASSESSMENT)),
    f("value_enhancement_roadmap", Object(VALUE_ENHANCEMENT_ROADMAP)),
    f("strategic_recommendations", Object(STRATEGIC_RECOMMENDATIONS)),
];

/// The seven analysis sub-sections (everything except metadata).
pub fn section_names() -> impl Iterator<Item = &'static str> {
    ANALYSIS_FIELDS
        .iter()
        .map(|f| f.name)
        .filter(|n| *n != "analysis_metadata")
}

/// Gemini `responseSchema` (OpenAPI subset) for the whole analysis.
pub fn response_schema() -> Value {
    object_schema(ANALYSIS_FIELDS)
}

fn object_schema(fields: &[Field]) -> Value {
    let mut props = Map::new();
    for field in fields {
        let mut schema = field_schema(field.ty);
        if let (Some(hint), Value::Object(obj)) = (field.hint, &mut schema) {
            obj.insert("description".to_string(), Value::String(hint.to_string()));
        }
        props.insert(field.name.to_string(), schema);
    }
    let names: Vec<&str> = fields.iter().map(|f| f.name).collect();
    json!({
        "type": "OBJECT",
        "properties": props,
        "required": names,
        "propertyOrdering": names,
    })
}

fn field_schema(ty: FieldType) -> Value {
    match ty {
        FieldType::String => json!({ "type": "STRING" }),
        FieldType::Number => json!({ "type": "NUMBER" }),
        FieldType::Integer => json!({ "type": "INTEGER" }),
        FieldType::StringList => json!({ "type": "ARRAY", "items": { "type": "STRING" } }),
        FieldType::Object(fields) => object_schema(fields),
        FieldType::ObjectList(fields) => json!({ "type": "ARRAY", "items": object_schema(fields) }),
    }
}

/// Human-readable outline for the prompt: `section: field (type), ...` per line.
pub fn outline() -> String {
    let mut out = String::new();
    for section in ANALYSIS_FIELDS {
        if let FieldType::Object(fields) = section.ty {
            let cols: Vec<String> = fields
                .iter()
                .map(|f| format!("{} ({})", f.name, f.ty.describe()))
                .collect();
            out.push_str(&format!("- {}: {}\n", section.name, cols.join(", ")));
        }
    }
    out
}
