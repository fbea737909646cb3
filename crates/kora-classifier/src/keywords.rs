//! Fixed keyword families used by the classifier.
//!
//! These are deliberate constants covering Spanish, English, and
//! Portuguese — the languages the agent serves. Matching is done on
//! normalized (trimmed, lowercased) text.

/// Greeting words. Matched as whole words.
pub const GREETING_KW: &[&str] = &[
    "hola", "buenas", "hello", "hi", "hey", "saludos", "oi", "ola", "olá",
];

/// Greeting phrases. Matched as substrings.
pub const GREETING_PHRASES: &[&str] = &[
    "buenos dias",
    "buenos días",
    "buenas tardes",
    "buenas noches",
    "good morning",
    "good afternoon",
    "good evening",
    "bom dia",
    "boa tarde",
    "boa noite",
];

/// Farewell words.
pub const FAREWELL_KW: &[&str] = &[
    "adios", "adiós", "chau", "chao", "bye", "goodbye", "tchau", "despedida",
];

/// Farewell phrases.
pub const FAREWELL_PHRASES: &[&str] = &[
    "hasta luego",
    "hasta mañana",
    "nos vemos",
    "see you",
    "até logo",
    "ate logo",
    "até mais",
];

/// Interrogative words that mark a question when the text starts with one.
pub const QUESTION_STARTERS: &[&str] = &[
    "que", "qué", "como", "cómo", "cuando", "cuándo", "donde", "dónde", "quien", "quién", "cual",
    "cuál", "cuanto", "cuánto", "what", "how", "when", "where", "who", "why", "which", "can",
    "quando", "onde", "quem", "qual",
];

/// Help-request words.
pub const HELP_KW: &[&str] = &["ayuda", "ayúdame", "ayudame", "help", "socorro", "ajuda"];

/// Help-request phrases.
pub const HELP_PHRASES: &[&str] = &["no entiendo", "no sé que", "help me", "não entendo"];

/// Contextual vocabulary — domain words worth extracting as keywords.
pub const CONTEXTUAL_VOCAB: &[&str] = &[
    "precio",
    "precios",
    "price",
    "preço",
    "horario",
    "horarios",
    "schedule",
    "pedido",
    "order",
    "cita",
    "appointment",
    "comprar",
    "buy",
    "pago",
    "payment",
    "pagamento",
    "factura",
    "invoice",
    "soporte",
    "support",
    "suporte",
    "producto",
    "productos",
    "product",
    "produto",
    "servicio",
    "service",
    "serviço",
    "cuenta",
    "account",
    "conta",
    "informacion",
    "información",
    "information",
    "gracias",
    "thanks",
    "obrigado",
    "obrigada",
];

/// Positive-sentiment words.
pub const POSITIVE_KW: &[&str] = &[
    "gracias",
    "genial",
    "excelente",
    "perfecto",
    "bueno",
    "bien",
    "great",
    "good",
    "thanks",
    "awesome",
    "perfect",
    "ótimo",
    "otimo",
    "obrigado",
    "obrigada",
    "legal",
];

/// Negative-sentiment words.
pub const NEGATIVE_KW: &[&str] = &[
    "malo", "mal", "problema", "error", "terrible", "horrible", "odio", "bad", "problem", "hate",
    "wrong", "falla", "ruim", "péssimo", "pessimo",
];

/// True if any keyword appears as a whole word of `text`.
///
/// Words are compared after stripping surrounding punctuation, so
/// "hola!" still matches "hola".
pub fn word_match(text: &str, keywords: &[&str]) -> bool {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|w| keywords.contains(&w))
}

/// True if any phrase appears as a substring of `text`.
pub fn phrase_match(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

/// Count whole-word hits of `keywords` in `text`.
pub fn word_hits(text: &str, keywords: &[&str]) -> usize {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| keywords.contains(w))
        .count()
}
