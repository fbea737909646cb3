use serde::{Deserialize, Serialize};

/// Intent category assigned to a message's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Command,
    Greeting,
    Farewell,
    Question,
    Help,
    Contextual,
    Unknown,
}

impl Category {
    /// Fixed confidence assigned when this category matches.
    /// These are deliberate constants, not learned values.
    pub fn confidence(self) -> f32 {
        match self {
            Category::Command => 0.9,
            Category::Greeting | Category::Farewell => 0.85,
            Category::Question | Category::Help => 0.8,
            Category::Contextual => 0.7,
            Category::Unknown => 0.5,
        }
    }
}

/// Keyword-derived sentiment of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// The inferred intent of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    /// 0.0–1.0, fixed per category.
    pub confidence: f32,
    /// Vocabulary keywords found in the text, in order of appearance,
    /// capped at the classifier's configured maximum.
    pub matched_keywords: Vec<String>,
    pub sentiment: Sentiment,
}

impl Classification {
    pub fn unknown(confidence: f32) -> Self {
        Self {
            category: Category::Unknown,
            confidence,
            matched_keywords: Vec::new(),
            sentiment: Sentiment::Neutral,
        }
    }
}

/// Diagnostic classification: the primary result plus every other
/// pattern family that would have matched had it been tried first.
#[derive(Debug, Clone)]
pub struct DetailedClassification {
    pub primary: Classification,
    pub also_matched: Vec<Category>,
}
