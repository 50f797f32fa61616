// src/compose.rs
//! Context composer: pure (Idea, SignalBundle) -> AnalysisRequest.
//!
//! Deterministic. The same inputs always yield byte-identical prompts.

use std::fmt::Write as _;

use serde::Serialize;

use crate::analyze::schema::{outline, section_names};
use crate::analyze::{AnalysisRequest, ANALYSIS_SCHEMA_NAME};
use crate::idea::Idea;
use crate::signals::{SignalBundle, SignalKind, SignalSlot};

const SYSTEM_INSTRUCTION: &str = "You are an experienced startup analyst and business strategist. \
Assess startup ideas with evidence from the market data you are given. \
Be specific, honest about risks, and constructive. \
Reply with a single JSON object that matches the response schema exactly; \
never copy field descriptions or example wording into values.";

const FRAMEWORKS: &[(&str, &str)] = &[
    (
        "Competitive forces (Porter's Five Forces)",
        "rivalry, buyer and supplier power, threat of new entrants and of substitutes",
    ),
    (
        "Value chain",
        "where this business adds value or removes cost compared to incumbents",
    ),
    (
        "Blue ocean",
        "uncontested market space and differentiation the incumbents ignore",
    ),
    (
        "Customer journey",
        "pain points and unmet needs along the customer's path",
    ),
    (
        "Market timing",
        "whether the market is ready for this now",
    ),
];

const SCORING_GUIDE: &str = "\
- overall_score 90-100: exceptional opportunity with clear advantages and strong timing
- 75-89: strong opportunity, good differentiation, manageable risks
- 60-74: promising with caveats
- 40-59: moderate; needs significant changes or better timing
- 20-39: weak; high risk or poor market fit
- 0-19: very high risk or limited potential
- novelty_score runs 0 to 10, confidence_score runs 0.0 to 1.0";

/// Build the one request sent to the model.
pub fn compose(idea: &Idea, signals: &SignalBundle) -> AnalysisRequest {
    let missing: Vec<SignalKind> = signals.missing().into_iter().map(|(k, _)| k).collect();

    let mut p = String::new();
    let _ = writeln!(p, "## Startup idea\n");
    let _ = writeln!(p, "\"\"\"\n{}\n\"\"\"\n", idea.text());

    let _ = writeln!(p, "## Frameworks to apply\n");
    for (i, (name, focus)) in FRAMEWORKS.iter().enumerate() {
        let _ = writeln!(p, "{}. {name}: {focus}", i + 1);
    }
    p.push('\n');

    let _ = writeln!(p, "## Market signals\n");
    render_slot(&mut p, SignalKind::Trends, &signals.trends);
    render_slot(&mut p, SignalKind::Competitors, &signals.competitors);
    render_slot(&mut p, SignalKind::Community, &signals.community);

    let _ = writeln!(p, "## Missing signals\n");
    let absent = signals.missing();
    if absent.is_empty() {
        let _ = writeln!(p, "All signals are available.\n");
    } else {
        for (kind, reason) in &absent {
            let _ = writeln!(p, "- {} ({}): unavailable, {reason}", kind.label(), kind.as_str());
        }
        let _ = writeln!(
            p,
            "\nDo not invent data for missing signals. Lower confidence_score accordingly \
             and list only the signals you actually used in data_sources_used.\n"
        );
    }

    let _ = writeln!(p, "## Required output sections\n");
    p.push_str(&outline());
    let _ = writeln!(
        p,
        "\nEvery analysis section must be filled: {}.\n",
        section_names().collect::<Vec<_>>().join(", ")
    );

    let _ = writeln!(p, "## Scoring guide\n");
    let _ = writeln!(p, "{SCORING_GUIDE}");

    AnalysisRequest {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        prompt: p,
        missing_signals: missing,
        schema_name: ANALYSIS_SCHEMA_NAME,
    }
}

fn render_slot<T: Serialize>(p: &mut String, kind: SignalKind, slot: &SignalSlot<T>) {
    let SignalSlot::Present { data, .. } = slot else {
        return;
    };
    let body = serde_json::to_string_pretty(data)
        .unwrap_or_else(|e| format!("{{\"render_error\": \"{e}\"}}"));
    let _ = writeln!(p, "### {} ({})\n", kind.label(), kind.as_str());
    let _ = writeln!(p, "```json\n{body}\n```\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::signals::{
        CommunitySignal, CompetitorSignal, TrendDirection, TrendSignal, UnavailableKind,
    };

    fn idea() -> Idea {
        Idea::parse("A subscription box for left-handed scissors", &PipelineConfig::default())
            .unwrap()
    }

    fn trends() -> TrendSignal {
        TrendSignal {
            query: "q".into(),
            cleaned_query: "left-handed scissors".into(),
            timeframe: "today 12-m".into(),
            interest_score: 37,
            trend_direction: TrendDirection::Rising,
            trend_velocity: 12,
            data_points: 52,
            min_score: 20,
            max_score: 61,
            used_fallback: false,
        }
    }

    fn competitors() -> CompetitorSignal {
        CompetitorSignal {
            query: "q".into(),
            search_query: "sq".into(),
            competitor_count: 0,
            top_domains: vec!["leftyshop.example".into()],
            results: vec![],
            used_fallback: false,
        }
    }

    fn community() -> CommunitySignal {
        CommunitySignal {
            query: "q".into(),
            search_query: "sq".into(),
            posts_last_n_days: 4,
            total_score: 40,
            total_comments: 9,
            avg_score: 10.0,
            avg_comments: 2.25,
            top_subreddits: vec![],
            sample_posts: vec![],
            used_fallback: false,
        }
    }

    fn failed<T>(reason: &str) -> SignalSlot<T> {
        SignalSlot::unavailable(UnavailableKind::Failed, reason)
    }

    #[test]
    fn all_signals_present() {
        let bundle = SignalBundle {
            trends: SignalSlot::present(trends()),
            competitors: SignalSlot::present(competitors()),
            community: SignalSlot::present(community()),
        };
        let req = compose(&idea(), &bundle);
        assert!(req.prompt.contains("A subscription box for left-handed scissors"));
        assert!(req.prompt.contains("All signals are available."));
        assert!(req.prompt.contains("\"interest_score\": 37"));
        assert!(req.prompt.contains("leftyshop.example"));
        assert!(req.prompt.contains("\"avg_comments\": 2.25"));
        assert!(req.missing_signals.is_empty());
        assert_eq!(req.schema_name, ANALYSIS_SCHEMA_NAME);
    }

    #[test]
    fn some_signals_missing() {
        let bundle = SignalBundle {
            trends: SignalSlot::present(trends()),
            competitors: failed("upstream returned HTTP 500: boom"),
            community: SignalSlot::unavailable(UnavailableKind::TimedOut, "timed out after 12000ms"),
        };
        let req = compose(&idea(), &bundle);
        assert!(req.prompt.contains("A subscription box for left-handed scissors"));
        assert!(!req.prompt.contains("All signals are available."));
        assert!(req.prompt.contains("Competitor web search (competitors): unavailable, upstream returned HTTP 500: boom"));
        assert!(req.prompt.contains("Community discussion (community): unavailable, timed out after 12000ms"));
        assert!(!req.prompt.contains("### Competitor web search"));
        assert_eq!(
            req.missing_signals,
            vec![SignalKind::Competitors, SignalKind::Community]
        );
    }

    #[test]
    fn no_signals_present() {
        let bundle = SignalBundle {
            trends: failed("x"),
            competitors: SignalSlot::unavailable(UnavailableKind::NotConfigured, "competitors provider is not configured"),
            community: SignalSlot::unavailable(UnavailableKind::NotRequested, "not requested by caller"),
        };
        let req = compose(&idea(), &bundle);
        assert!(req.prompt.contains("A subscription box for left-handed scissors"));
        for kind in SignalKind::ALL {
            assert!(req.prompt.contains(&format!("- {} ({})", kind.label(), kind.as_str())));
        }
        assert_eq!(req.missing_signals.len(), 3);
        assert!(req.prompt.contains("Do not invent data"));
    }

    #[test]
    fn lists_required_sections_and_is_deterministic() {
        let bundle = SignalBundle {
            trends: SignalSlot::present(trends()),
            competitors: failed("x"),
            community: SignalSlot::present(community()),
        };
        let a = compose(&idea(), &bundle);
        let b = compose(&idea(), &bundle);
        assert_eq!(a, b);
        for section in section_names() {
            assert!(a.prompt.contains(section), "{section}");
        }
        assert!(a.prompt.contains("Porter's Five Forces"));
        assert!(a.prompt.contains("Blue ocean"));
    }
}
