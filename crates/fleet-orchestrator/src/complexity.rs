//! Complexity assessment: a pure function over query text.
//!
//! Heuristic, not a model call: word count plus keyword sets suggestive of
//! reasoning, coding, or system-analysis questions. `simple` mode routes on
//! the resulting tier; every other mode ignores it except to record it in
//! `QueryMetadata.complexity_score` for the routing-analytics endpoint.

use fleet_types::Tier;

const REASONING_KEYWORDS: &[&str] =
    &["why", "explain", "reasoning", "prove", "derive", "compare", "trade-off", "tradeoff", "analyze", "evaluate"];
const CODING_KEYWORDS: &[&str] = &["code", "function", "algorithm", "bug", "implement", "refactor", "compile", "debug", "api"];
const ANALYSIS_KEYWORDS: &[&str] =
    &["architecture", "design", "system", "scalability", "distributed", "microservice", "database", "infrastructure"];

#[derive(Debug, Clone, PartialEq)]
pub struct Complexity {
    pub score: f64,
    pub tier: Tier,
    pub reasoning: String,
}

fn count_matches(lower: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| lower.contains(*k)).count()
}

/// Assesses `query`'s complexity on a 0-10 scale. Longer queries and
/// queries containing reasoning/coding/analysis keywords score higher.
pub fn assess(query: &str) -> Complexity {
    let lower = query.to_ascii_lowercase();
    let word_count = query.split_whitespace().count();

    // Length contributes up to 3 points: short queries ("what is 2+2") stay
    // near zero, long multi-sentence prompts saturate at 3.
    let length_score = (word_count as f64 / 15.0).min(3.0);

    let reasoning_hits = count_matches(&lower, REASONING_KEYWORDS);
    let coding_hits = count_matches(&lower, CODING_KEYWORDS);
    let analysis_hits = count_matches(&lower, ANALYSIS_KEYWORDS);

    let keyword_score = (reasoning_hits as f64 * 1.5) + (coding_hits as f64 * 1.2) + (analysis_hits as f64 * 1.3);

    let score = (length_score + keyword_score).min(10.0);

    let tier = if score < 3.5 {
        Tier::Fast
    } else if score < 7.0 {
        Tier::Balanced
    } else {
        Tier::Powerful
    };

    let reasoning = format!(
        "{word_count} words (+{length_score:.1}), {reasoning_hits} reasoning / {coding_hits} coding / \
         {analysis_hits} analysis keyword(s) matched -> score {score:.1} -> {}",
        tier.as_str()
    );

    Complexity { score, tier, reasoning }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_simple_query_is_fast() {
        let c = assess("What is 2+2?");
        assert_eq!(c.tier, Tier::Fast);
        assert!(c.score < 3.5);
    }

    #[test]
    fn reasoning_keywords_raise_tier() {
        let c = assess("Explain why event sourcing trades off consistency for availability in distributed systems architecture design, compare it to CRDTs and analyze the failure modes thoroughly");
        assert_eq!(c.tier, Tier::Powerful);
    }

    #[test]
    fn coding_keyword_moderate_length_is_balanced_or_higher() {
        let c = assess("Can you help me debug this function, there seems to be an algorithm bug in the implementation");
        assert!(c.score >= 3.5);
    }

    #[test]
    fn score_is_always_within_bounds() {
        let c = assess("");
        assert!(c.score >= 0.0 && c.score <= 10.0);
        let c2 = assess(&"why explain reasoning prove derive compare analyze evaluate ".repeat(20));
        assert!(c2.score <= 10.0);
    }
}
