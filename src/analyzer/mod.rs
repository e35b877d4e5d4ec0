//! Given raw text, returns a mapping from lemma to occurrence count, filtered
//! by language rules and stop part-of-speech tags (§4.2).

pub mod morphology;

pub use morphology::{MorphForm, Morphology, RuleBasedMorphology, STOP_POS_TAGS};

use std::collections::HashMap;
use std::sync::OnceLock;

const MIN_TOKEN_LEN: usize = 3;

fn non_letter_run() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"[^a-zЀ-ӿ]+").unwrap())
}

/// Lowercase → non-letter run collapse → tokenize → morphology lookup →
/// stop-POS filter → first-base-form selection → count (§4.2 steps 1-5).
///
/// Never panics or propagates an analyzer failure: a token that the
/// morphology provider can't handle (empty result) is simply skipped, and a
/// `None` provider ("analyzer uninitialized") yields an empty mapping.
pub async fn collect_lemmas(
    text: &str,
    morphology: Option<&dyn Morphology>,
) -> HashMap<String, i64> {
    let mut counts = HashMap::new();
    let Some(morphology) = morphology else {
        return counts;
    };

    let lowered = text.to_lowercase();
    let normalized = non_letter_run().replace_all(&lowered, " ");

    for token in normalized.split_whitespace() {
        if token.chars().count() < MIN_TOKEN_LEN {
            continue;
        }
        let forms = morphology.analyze(token).await;
        if forms.is_empty() {
            continue;
        }
        if forms.iter().any(|f| STOP_POS_TAGS.contains(&f.pos.as_str())) {
            continue;
        }
        let lemma = &forms[0].lemma;
        *counts.entry(lemma.clone()).or_insert(0) += 1;
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_repeated_lemma() {
        let morphology = RuleBasedMorphology::new();
        let counts = collect_lemmas("кот кот собака", Some(&morphology)).await;
        assert_eq!(counts.get("кот"), Some(&2));
        assert_eq!(counts.get("собака"), Some(&1));
    }

    #[tokio::test]
    async fn drops_short_tokens_and_stop_words() {
        let morphology = RuleBasedMorphology::new();
        let counts = collect_lemmas("a and cats", Some(&morphology)).await;
        assert!(!counts.contains_key("a"));
        assert!(!counts.contains_key("and"));
        assert_eq!(counts.get("cat"), Some(&1));
    }

    #[tokio::test]
    async fn uninitialized_analyzer_yields_empty_mapping() {
        let counts = collect_lemmas("кот собака", None).await;
        assert!(counts.is_empty());
    }
}
