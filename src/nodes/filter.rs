//! Tag filter: normalizes a raw prompt against a CSV vocabulary and resolves
//! aliases to canonical tags.
//!
//! Tokens are stripped of generation-tool syntax before lookup. The unwrap
//! patterns are attempted in a fixed order and at most one emphasis layer is
//! removed per token; the order is part of the contract and must not change.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::tags::TagVocabulary;

/// How a token that resolves through the alias table is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasPolicy {
    UseAlias,
    UseMain,
    UseBoth,
}

impl AliasPolicy {
    /// Parse the UI-facing label ("Use alias" / "Use main" / "Use both").
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Use alias" => Some(AliasPolicy::UseAlias),
            "Use main" => Some(AliasPolicy::UseMain),
            "Use both" => Some(AliasPolicy::UseBoth),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AliasPolicy::UseAlias => "Use alias",
            AliasPolicy::UseMain => "Use main",
            AliasPolicy::UseBoth => "Use both",
        }
    }
}

/// Lower-case and underscore-to-space normalization applied to every tag,
/// alias, and query before comparison.
pub fn normalize(s: &str) -> String {
    s.to_lowercase().replace('_', " ")
}

static LORA_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<lora:[^:>]+(:[^:>]+){1,2}>").unwrap());
static LORA_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"lora\([^)]+\)").unwrap());
static ANGLE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WEIGHT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\w\- ]+):[\d.]+").unwrap());

// Emphasis unwrap attempts, in contract order. First match wins.
static UNWRAP_TRIPLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\(\((.*?)\)\)\)$").unwrap());
static UNWRAP_DOUBLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\((.*?)\)\)$").unwrap());
static UNWRAP_PAREN_WEIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(([^()]+:[\d.]+)\)$").unwrap());
static UNWRAP_BRACKET_WEIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\[\]]+:[\d.]+)\]$").unwrap());
static UNWRAP_BRACE_WEIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{([^{}]+:[\d.]+)\}$").unwrap());
static UNWRAP_ANY_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[(\[{](.*?)[)\]}]$").unwrap());

/// Strip generation-tool syntax from a single token before vocabulary lookup.
pub fn strip_token_syntax(token: &str) -> String {
    let token = LORA_TAG.replace_all(token, "");
    let token = LORA_CALL.replace_all(&token, "");
    let token = ANGLE_TAG.replace_all(&token, "");
    let token = WEIGHT_SUFFIX.replace_all(&token, "$1");

    let unwrapped = [
        &*UNWRAP_TRIPLE,
        &*UNWRAP_DOUBLE,
        &*UNWRAP_PAREN_WEIGHT,
        &*UNWRAP_BRACKET_WEIGHT,
        &*UNWRAP_BRACE_WEIGHT,
        &*UNWRAP_ANY_PAIR,
    ]
    .iter()
    .find_map(|re| {
        re.captures(&token)
            .map(|c| c.get(1).map(|m| m.as_str().to_string()).unwrap_or_default())
    })
    .unwrap_or_else(|| token.to_string());

    unwrapped.replace(r"\(", "(").replace(r"\)", ")").trim().to_string()
}

/// Filter a raw prompt down to a cleaned, deduplicated, comma-joined tag
/// string using `vocab` and the given alias policy.
///
/// Tokens that match neither an alias nor a canonical tag are dropped
/// silently. Callers handle a missing or unreadable CSV by falling back to
/// [`normalize`] on the whole prompt.
pub fn filter_prompt(prompt: &str, vocab: &TagVocabulary, policy: AliasPolicy) -> String {
    let prompt = normalize(prompt);
    let mut kept: Vec<String> = Vec::new();

    for raw in prompt.split(|c| c == ',' || c == '\n') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let token = strip_token_syntax(raw);

        let alias_target = vocab.alias_target(&token);
        let base = alias_target.unwrap_or(&token);
        let main = vocab.canonical(base);

        if policy == AliasPolicy::UseAlias && alias_target.is_some() {
            kept.push(token);
        } else if policy == AliasPolicy::UseMain && main.is_some() {
            kept.push(main.unwrap_or_default().to_string());
        } else if policy == AliasPolicy::UseBoth && alias_target.is_some() && main.is_some() {
            kept.push(main.unwrap_or_default().to_string());
            kept.push(token);
        } else if vocab.canonical(&token).is_some() {
            kept.push(token);
        }
    }

    let mut seen = std::collections::HashSet::new();
    kept.retain(|t| seen.insert(t.clone()));
    kept.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagRecord;

    fn vocab() -> TagVocabulary {
        TagVocabulary::from_records(&[
            TagRecord {
                name: "1girl".to_string(),
                count: 5000000,
                aliases: vec!["1girls".to_string(), "sole female".to_string()],
            },
            TagRecord {
                name: "long hair".to_string(),
                count: 400000,
                aliases: vec!["longhair".to_string()],
            },
            TagRecord {
                name: "smile".to_string(),
                count: 300000,
                aliases: vec![],
            },
        ])
    }

    #[test]
    fn strips_lora_tags_and_weights() {
        assert_eq!(strip_token_syntax("<lora:foo:0.8> smile"), "smile");
        assert_eq!(strip_token_syntax("smile:1.2"), "smile");
        assert_eq!(strip_token_syntax("lora(foo) smile"), "smile");
        assert_eq!(strip_token_syntax("<embedding> smile"), "smile");
    }

    #[test]
    fn unwraps_one_emphasis_layer() {
        assert_eq!(strip_token_syntax("(((smile)))"), "smile");
        assert_eq!(strip_token_syntax("((smile))"), "smile");
        assert_eq!(strip_token_syntax("(smile)"), "smile");
        assert_eq!(strip_token_syntax("[smile]"), "smile");
        assert_eq!(strip_token_syntax("{smile}"), "smile");
    }

    #[test]
    fn weighted_emphasis_unwraps_then_drops_weight() {
        // The weight suffix is stripped before unwrapping, so the weighted
        // bracket patterns only see tokens whose weight survived the first
        // pass (e.g. escaped or oddly shaped ones). A plain "(tag:1.2)"
        // loses its weight first and then unwraps as a bare pair.
        assert_eq!(strip_token_syntax("(smile:1.2)"), "smile");
        assert_eq!(strip_token_syntax("[smile:0.7]"), "smile");
        assert_eq!(strip_token_syntax("{smile:0.7}"), "smile");
    }

    #[test]
    fn unescapes_literal_parens() {
        assert_eq!(strip_token_syntax(r"smile \(relaxed\)"), "smile (relaxed)");
    }

    #[test]
    fn use_main_resolves_aliases() {
        let v = vocab();
        let out = filter_prompt("1girls, longhair, smile", &v, AliasPolicy::UseMain);
        assert_eq!(out, "1girl, long hair, smile");
    }

    #[test]
    fn use_main_is_idempotent_on_canonical_input() {
        let v = vocab();
        let once = filter_prompt("1girls, long_hair, smile", &v, AliasPolicy::UseMain);
        let twice = filter_prompt(&once, &v, AliasPolicy::UseMain);
        assert_eq!(once, twice);
    }

    #[test]
    fn use_alias_keeps_known_aliases_and_canonicals() {
        let v = vocab();
        let out = filter_prompt("1girls, smile, unknown tag", &v, AliasPolicy::UseAlias);
        assert_eq!(out, "1girls, smile");
    }

    #[test]
    fn use_both_emits_canonical_then_alias() {
        let v = vocab();
        let out = filter_prompt("1girls", &v, AliasPolicy::UseBoth);
        assert_eq!(out, "1girl, 1girls");
    }

    #[test]
    fn underscores_normalize_before_lookup() {
        let v = vocab();
        let out = filter_prompt("Sole_Female", &v, AliasPolicy::UseMain);
        assert_eq!(out, "1girl");
    }

    #[test]
    fn unknown_tokens_are_dropped() {
        let v = vocab();
        let out = filter_prompt("not a tag, smile", &v, AliasPolicy::UseMain);
        assert_eq!(out, "smile");
    }

    #[test]
    fn deduplicates_preserving_first_occurrence() {
        let v = vocab();
        let out = filter_prompt("smile, 1girls, smile", &v, AliasPolicy::UseMain);
        assert_eq!(out, "smile, 1girl");
    }

    #[test]
    fn policy_labels_round_trip() {
        for p in [AliasPolicy::UseAlias, AliasPolicy::UseMain, AliasPolicy::UseBoth] {
            assert_eq!(AliasPolicy::from_label(p.label()), Some(p));
        }
        assert_eq!(AliasPolicy::from_label("Use nothing"), None);
    }
}
