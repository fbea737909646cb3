//! # kora-classifier
//!
//! Pure intent classification: text in, category + confidence +
//! extracted keywords + sentiment out. No I/O, no state beyond the
//! configuration it was built with.
//!
//! Pattern families are tested in strict priority order — Command,
//! Greeting, Farewell, Question, Help, Contextual, Unknown — and the
//! first match wins. The ordering is a deliberate tie-break and part of
//! the contract; callers that need to know about shadowed matches use
//! [`Classifier::classify_detailed`].

pub mod keywords;

use keywords::*;
use kora_core::classification::{
    Category, Classification, DetailedClassification, Sentiment,
};
use kora_core::config::ClassifierConfig;

/// Intent classifier for inbound message text.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify message text into an intent category.
    pub fn classify(&self, text: &str) -> Classification {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return Classification::unknown(0.0);
        }

        let matched_keywords = self.extract_keywords(&normalized);
        let sentiment = derive_sentiment(&normalized);
        let category = self.primary_category(&normalized, &matched_keywords);

        Classification {
            category,
            confidence: category.confidence(),
            matched_keywords,
            sentiment,
        }
    }

    /// Classify and additionally report every pattern family that would
    /// have matched had it been tried first. Diagnostics only — the
    /// primary result is identical to [`Classifier::classify`].
    pub fn classify_detailed(&self, text: &str) -> DetailedClassification {
        let primary = self.classify(text);
        let normalized = text.trim().to_lowercase();

        let mut also_matched = Vec::new();
        if !normalized.is_empty() {
            let checks: [(Category, bool); 6] = [
                (Category::Command, self.is_command(&normalized)),
                (Category::Greeting, is_greeting(&normalized)),
                (Category::Farewell, is_farewell(&normalized)),
                (Category::Question, is_question(&normalized)),
                (Category::Help, is_help(&normalized)),
                (
                    Category::Contextual,
                    !primary.matched_keywords.is_empty(),
                ),
            ];
            for (category, matched) in checks {
                if matched && category != primary.category {
                    also_matched.push(category);
                }
            }
        }

        DetailedClassification {
            primary,
            also_matched,
        }
    }

    /// First matching family wins; no backtracking.
    fn primary_category(&self, normalized: &str, matched_keywords: &[String]) -> Category {
        if self.is_command(normalized) {
            Category::Command
        } else if is_greeting(normalized) {
            Category::Greeting
        } else if is_farewell(normalized) {
            Category::Farewell
        } else if is_question(normalized) {
            Category::Question
        } else if is_help(normalized) {
            Category::Help
        } else if !matched_keywords.is_empty() {
            Category::Contextual
        } else {
            Category::Unknown
        }
    }

    fn is_command(&self, normalized: &str) -> bool {
        normalized.starts_with(self.config.prefix)
    }

    /// Extract contextual vocabulary words in order of appearance,
    /// deduplicated, capped at the configured maximum.
    fn extract_keywords(&self, normalized: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for word in normalized
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        {
            if found.len() >= self.config.max_keywords {
                break;
            }
            if CONTEXTUAL_VOCAB.contains(&word) && !found.iter().any(|f| f == word) {
                found.push(word.to_string());
            }
        }
        found
    }
}

fn is_greeting(normalized: &str) -> bool {
    word_match(normalized, GREETING_KW) || phrase_match(normalized, GREETING_PHRASES)
}

fn is_farewell(normalized: &str) -> bool {
    word_match(normalized, FAREWELL_KW) || phrase_match(normalized, FAREWELL_PHRASES)
}

fn is_question(normalized: &str) -> bool {
    if normalized.contains('?') || normalized.starts_with('¿') {
        return true;
    }
    // Leading interrogative word also counts ("como llego al centro").
    normalized
        .split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .is_some_and(|first| QUESTION_STARTERS.contains(&first))
}

fn is_help(normalized: &str) -> bool {
    word_match(normalized, HELP_KW) || phrase_match(normalized, HELP_PHRASES)
}

/// Sentiment from keyword counts: more positive hits than negative →
/// Positive, fewer → Negative, tie (including zero) → Neutral.
fn derive_sentiment(normalized: &str) -> Sentiment {
    let positive = word_hits(normalized, POSITIVE_KW);
    let negative = word_hits(normalized, NEGATIVE_KW);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(ClassifierConfig::default())
    }

    #[test]
    fn test_empty_text_is_unknown_zero_confidence() {
        let c = classifier().classify("");
        assert_eq!(c.category, Category::Unknown);
        assert_eq!(c.confidence, 0.0);

        let c = classifier().classify("   \t  ");
        assert_eq!(c.category, Category::Unknown);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_hola_is_greeting() {
        let c = classifier().classify("hola");
        assert_eq!(c.category, Category::Greeting);
        assert_eq!(c.confidence, 0.85);
    }

    #[test]
    fn test_slash_help_is_command() {
        // Prefix beats the help family: priority order is the contract.
        let c = classifier().classify("/help");
        assert_eq!(c.category, Category::Command);
        assert_eq!(c.confidence, 0.9);
    }

    #[test]
    fn test_greeting_variants() {
        for text in ["Hola!", "buenos días", "hey", "bom dia", "  HOLA  "] {
            let c = classifier().classify(text);
            assert_eq!(c.category, Category::Greeting, "{text:?}");
        }
    }

    #[test]
    fn test_farewell() {
        for text in ["adios", "hasta luego", "bye", "nos vemos"] {
            let c = classifier().classify(text);
            assert_eq!(c.category, Category::Farewell, "{text:?}");
            assert_eq!(c.confidence, 0.85);
        }
    }

    #[test]
    fn test_question() {
        for text in ["cuanto cuesta esto?", "¿donde estan?", "como funciona esto"] {
            let c = classifier().classify(text);
            assert_eq!(c.category, Category::Question, "{text:?}");
            assert_eq!(c.confidence, 0.8);
        }
    }

    #[test]
    fn test_help() {
        let c = classifier().classify("necesito ayuda con mi cuenta por favor");
        assert_eq!(c.category, Category::Help);
        assert_eq!(c.confidence, 0.8);
    }

    #[test]
    fn test_contextual_from_vocabulary() {
        let c = classifier().classify("el precio del producto");
        assert_eq!(c.category, Category::Contextual);
        assert_eq!(c.confidence, 0.7);
        assert_eq!(c.matched_keywords, vec!["precio", "producto"]);
    }

    #[test]
    fn test_unknown_fallback() {
        let c = classifier().classify("xyzzy plugh");
        assert_eq!(c.category, Category::Unknown);
        assert_eq!(c.confidence, 0.5);
        assert!(c.matched_keywords.is_empty());
    }

    #[test]
    fn test_priority_greeting_beats_question() {
        // "hola" wins even when the text is also a question.
        let c = classifier().classify("hola, cuanto cuesta?");
        assert_eq!(c.category, Category::Greeting);
    }

    #[test]
    fn test_keyword_cap() {
        let c = Classifier::new(ClassifierConfig {
            prefix: '/',
            max_keywords: 2,
        })
        .classify("precio horario pedido cita soporte");
        assert_eq!(c.matched_keywords.len(), 2);
        assert_eq!(c.matched_keywords, vec!["precio", "horario"]);
    }

    #[test]
    fn test_keywords_deduplicated_in_order() {
        let c = classifier().classify("precio precio soporte precio");
        assert_eq!(c.matched_keywords, vec!["precio", "soporte"]);
    }

    #[test]
    fn test_sentiment_positive() {
        let c = classifier().classify("gracias, excelente servicio");
        assert_eq!(c.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_sentiment_negative() {
        let c = classifier().classify("esto es un problema horrible");
        assert_eq!(c.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_sentiment_neutral_on_tie() {
        let c = classifier().classify("el horario de mañana");
        assert_eq!(c.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_detailed_reports_shadowed_families() {
        let d = classifier().classify_detailed("hola, cuanto cuesta el producto?");
        assert_eq!(d.primary.category, Category::Greeting);
        assert!(d.also_matched.contains(&Category::Question));
        assert!(d.also_matched.contains(&Category::Contextual));
        assert!(!d.also_matched.contains(&Category::Greeting));
    }

    #[test]
    fn test_detailed_primary_matches_plain_classify() {
        for text in ["/status", "hola", "adios", "que hora es", "precio"] {
            let plain = classifier().classify(text);
            let detailed = classifier().classify_detailed(text);
            assert_eq!(plain.category, detailed.primary.category, "{text:?}");
            assert_eq!(plain.confidence, detailed.primary.confidence);
        }
    }

    #[test]
    fn test_custom_prefix() {
        let c = Classifier::new(ClassifierConfig {
            prefix: '!',
            max_keywords: 5,
        });
        assert_eq!(c.classify("!ping").category, Category::Command);
        assert_eq!(c.classify("/ping").category, Category::Unknown);
    }
}
