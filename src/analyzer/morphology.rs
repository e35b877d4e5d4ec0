//! The morphological analyzer is an assumed external collaborator (§1): a
//! library mapping a word to its base forms and a part-of-speech tag string.
//! Only its interface is specified; `RuleBasedMorphology` is a concrete,
//! dependency-free stand-in so the pipeline runs end to end without one
//! attached.

use async_trait::async_trait;

/// One candidate base form for a word, with its part-of-speech tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphForm {
    pub lemma: String,
    pub pos: String,
}

/// Maps a word to its candidate base forms and POS tags (§4.2 step 3).
#[async_trait]
pub trait Morphology: Send + Sync {
    async fn analyze(&self, word: &str) -> Vec<MorphForm>;
}

/// POS tags the Analyzer discards (§4.2 step 4): interjection, preposition,
/// conjunction, particle, pronoun.
pub const STOP_POS_TAGS: &[&str] = &[
    "INTJ", "PREP", "CONJ", "PART", "PRON",
];

const STOP_WORDS_LATIN: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "of", "in", "on", "at", "to", "for",
    "with", "as", "by", "is", "are", "was", "were", "it", "he", "she", "they",
    "we", "you", "i", "this", "that", "these", "those", "from", "not", "be",
];

const STOP_WORDS_CYRILLIC: &[&str] = &[
    "и", "в", "не", "на", "я", "он", "она", "оно", "они", "мы", "вы", "с",
    "что", "это", "как", "но", "а", "то", "его", "её", "их", "по", "для",
    "из", "у", "к", "о",
];

const SUFFIXES_LATIN: &[&str] = &["ies", "ied", "ing", "ed", "es", "s"];
const SUFFIXES_CYRILLIC: &[&str] = &[
    "ами", "ями", "ого", "его", "ому", "ему", "ыми", "ими", "ах", "ях",
    "ов", "ев", "ой", "ей", "ый", "ий", "ая", "яя", "ое", "ее", "ы", "и",
    "а", "я", "у", "ю", "е", "о",
];

/// Suffix-stripping + stop-word tagging stand-in, per language family.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedMorphology;

impl RuleBasedMorphology {
    pub fn new() -> Self {
        Self
    }

    fn strip_suffix(word: &str) -> String {
        let is_cyrillic = word.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c));
        let suffixes = if is_cyrillic {
            SUFFIXES_CYRILLIC
        } else {
            SUFFIXES_LATIN
        };
        for suffix in suffixes {
            if word.len() > suffix.len() + 2 && word.ends_with(suffix) {
                return word[..word.len() - suffix.len()].to_string();
            }
        }
        word.to_string()
    }

    fn is_stop_word(word: &str) -> bool {
        STOP_WORDS_LATIN.contains(&word) || STOP_WORDS_CYRILLIC.contains(&word)
    }
}

#[async_trait]
impl Morphology for RuleBasedMorphology {
    async fn analyze(&self, word: &str) -> Vec<MorphForm> {
        let word = word.to_lowercase();
        let pos = if Self::is_stop_word(&word) {
            "PART"
        } else {
            "NOUN"
        };
        vec![MorphForm {
            lemma: Self::strip_suffix(&word),
            pos: pos.to_string(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn strips_inflection() {
        let m = RuleBasedMorphology::new();
        let forms = m.analyze("cats").await;
        assert_eq!(forms[0].lemma, "cat");
    }

    #[tokio::test]
    async fn tags_stop_words() {
        let m = RuleBasedMorphology::new();
        let forms = m.analyze("and").await;
        assert_eq!(forms[0].pos, "PART");
    }

    #[tokio::test]
    async fn strips_cyrillic_inflection() {
        let m = RuleBasedMorphology::new();
        let forms = m.analyze("кошками").await;
        assert!(forms[0].lemma.starts_with("кошк"));
    }
}
