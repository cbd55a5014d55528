//! Filename-based GGUF discovery (`Discover`).
//!
//! Three ordered templates are tried specific → general; the first to match
//! wins. Every template exposes the same named capture groups so callers
//! never need to know which template matched.

use fleet_types::{Quantization, Tier};
use regex::Regex;
use std::sync::LazyLock;

/// `{family}-{version}-{size}b-{quant}-{tier_suffix}.gguf`
static TEMPLATE_WITH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^
        (?P<family>[a-z0-9]+) -
        (?P<version>[a-z0-9.]+) -
        (?P<size>[0-9.]+) b -
        (?P<quant>[a-z0-9_]+) -
        (?P<suffix>fast|balanced|powerful)
        \.gguf$",
    )
    .expect("static regex is valid")
});

/// `{family}-{version}-{size}b-{quant}.gguf`
static TEMPLATE_NO_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^
        (?P<family>[a-z0-9]+) -
        (?P<version>[a-z0-9.]+) -
        (?P<size>[0-9.]+) b -
        (?P<quant>[a-z0-9_]+)
        \.gguf$",
    )
    .expect("static regex is valid")
});

/// Catch-all: anything ending in `.gguf`, every field unknown.
static TEMPLATE_CATCH_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.gguf$").expect("static regex is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFilename {
    pub family: String,
    pub version: String,
    pub size_params: f64,
    pub quantization: Quantization,
    /// An explicit tier annotation in the filename (template 1 only). This
    /// seeds `Model::tier_override`, not `assigned_tier`: `assigned_tier`
    /// always follows the `AssignTier` formula, and only an override
    /// (user-set or filename-annotated) can pre-empt it.
    pub tier_suffix: Option<Tier>,
}

/// Parse a bare filename (no directory components) against the three
/// templates in order. Always succeeds for anything ending in `.gguf`
/// (malformed filenames still register, with unknown fields).
pub fn parse_filename(filename: &str) -> Option<ParsedFilename> {
    if let Some(caps) = TEMPLATE_WITH_SUFFIX.captures(filename) {
        return Some(ParsedFilename {
            family: caps["family"].to_string(),
            version: caps["version"].to_string(),
            size_params: caps["size"].parse().unwrap_or(0.0),
            quantization: Quantization::parse(&caps["quant"]),
            tier_suffix: Tier::parse(&caps["suffix"]),
        });
    }

    if let Some(caps) = TEMPLATE_NO_SUFFIX.captures(filename) {
        return Some(ParsedFilename {
            family: caps["family"].to_string(),
            version: caps["version"].to_string(),
            size_params: caps["size"].parse().unwrap_or(0.0),
            quantization: Quantization::parse(&caps["quant"]),
            tier_suffix: None,
        });
    }

    if TEMPLATE_CATCH_ALL.is_match(filename) {
        return Some(ParsedFilename {
            family: "unknown".to_string(),
            version: "unknown".to_string(),
            size_params: 0.0,
            quantization: Quantization::Unknown,
            tier_suffix: None,
        });
    }

    None
}

/// Heuristics used to detect model capability flags from the parsed name.
/// These are cheap filename substrings, not a guarantee — callers may
/// override via `thinking_override`/`tier_override`.
pub fn looks_like_thinking(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.contains("r1") || lower.contains("o1") || lower.contains("thinking")
}

pub fn looks_like_coder(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.contains("coder") || lower.contains("code") || lower.contains("codestral")
}

pub fn looks_like_instruct(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.contains("instruct") || lower.contains("chat") || lower.contains("it-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_template_with_suffix() {
        let parsed = parse_filename("deepseek-r1-8b-q4_k_m-powerful.gguf").unwrap();
        assert_eq!(parsed.family, "deepseek");
        assert_eq!(parsed.version, "r1");
        assert_eq!(parsed.size_params, 8.0);
        assert_eq!(parsed.quantization, Quantization::Q4KM);
        assert_eq!(parsed.tier_suffix, Some(Tier::Powerful));
    }

    #[test]
    fn parses_template_without_suffix() {
        let parsed = parse_filename("llama-3.1-70b-q5_k_m.gguf").unwrap();
        assert_eq!(parsed.family, "llama");
        assert_eq!(parsed.version, "3.1");
        assert_eq!(parsed.size_params, 70.0);
        assert_eq!(parsed.quantization, Quantization::Q5KM);
        assert_eq!(parsed.tier_suffix, None);
    }

    #[test]
    fn falls_back_to_catch_all() {
        let parsed = parse_filename("some_weird_name.gguf").unwrap();
        assert_eq!(parsed.family, "unknown");
        assert_eq!(parsed.quantization, Quantization::Unknown);
    }

    #[test]
    fn rejects_non_gguf() {
        assert!(parse_filename("readme.txt").is_none());
    }

    #[test]
    fn detects_thinking_and_coder_hints() {
        assert!(looks_like_thinking("deepseek-r1-8b-q4_k_m.gguf"));
        assert!(looks_like_thinking("openai-o1-32b-q8_0.gguf"));
        assert!(looks_like_coder("qwen-2.5-coder-7b-q4_k_m.gguf"));
        assert!(looks_like_instruct("llama-3.1-8b-instruct-q4_k_m.gguf"));
    }
}
