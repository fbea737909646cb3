//! Localized canned replies.
//!
//! Small static tables keyed by the user's language ("es", "en", "pt").
//! Spanish is the fallback for anything unrecognized — it is the agent's
//! home language.

use kora_core::classification::Category;

/// Fallback reply when no handler claims a message, keyed by category.
pub fn fallback(category: Category, lang: &str) -> String {
    match category {
        Category::Greeting => match lang {
            "en" => "Hi! How can I help you today?",
            "pt" => "Olá! Como posso ajudar você hoje?",
            _ => "¡Hola! ¿En qué puedo ayudarte hoy?",
        },
        Category::Farewell => match lang {
            "en" => "Goodbye! Come back any time.",
            "pt" => "Tchau! Volte quando quiser.",
            _ => "¡Hasta luego! Vuelve cuando quieras.",
        },
        Category::Question => match lang {
            "en" => "Good question — an agent will get back to you shortly.",
            "pt" => "Boa pergunta — um agente vai responder em breve.",
            _ => "Buena pregunta — un agente te responderá en breve.",
        },
        Category::Help => match lang {
            "en" => "I can help. Type /help to see everything I can do.",
            "pt" => "Posso ajudar. Digite /help para ver tudo o que sei fazer.",
            _ => "Puedo ayudarte. Escribe /help para ver todo lo que sé hacer.",
        },
        Category::Command => match lang {
            "en" => "Unknown command. Type /help to see the available commands.",
            "pt" => "Comando desconhecido. Digite /help para ver os comandos.",
            _ => "Comando desconocido. Escribe /help para ver los comandos.",
        },
        Category::Contextual | Category::Unknown => match lang {
            "en" => "I didn't quite get that. Type /help if you're stuck.",
            "pt" => "Não entendi bem. Digite /help se precisar.",
            _ => "No te entendí bien. Escribe /help si necesitas ayuda.",
        },
    }
    .to_string()
}

/// Reply for Contextual messages naming the recognized topics.
pub fn contextual(keywords: &[String], lang: &str) -> String {
    let topics = keywords.join(", ");
    match lang {
        "en" => format!("I see you're asking about *{topics}*. An agent will follow up shortly."),
        "pt" => format!("Vi que você pergunta sobre *{topics}*. Um agente vai responder em breve."),
        _ => format!("Veo que preguntas sobre *{topics}*. Un agente te responderá en breve."),
    }
}

/// Permission denial: insufficient level.
pub fn denied_level(lang: &str) -> String {
    match lang {
        "en" => "You don't have permission to use this command.",
        "pt" => "Você não tem permissão para usar este comando.",
        _ => "No tienes permisos para usar este comando.",
    }
    .to_string()
}

/// Permission denial: outside the tier's time window.
pub fn denied_window(start: u32, end: u32, lang: &str) -> String {
    match lang {
        "en" => format!("This command is only available between {start}:00 and {end}:00."),
        "pt" => format!("Este comando só está disponível entre {start}:00 e {end}:00."),
        _ => format!("Este comando solo está disponible entre las {start}:00 y las {end}:00."),
    }
}

/// Permission denial: hourly quota exhausted.
pub fn denied_quota(quota: i64, lang: &str) -> String {
    match lang {
        "en" => format!("You reached your limit of {quota} commands per hour. Try again later."),
        "pt" => format!("Você atingiu o limite de {quota} comandos por hora. Tente mais tarde."),
        _ => format!("Alcanzaste el límite de {quota} comandos por hora. Intenta más tarde."),
    }
}

/// Cooldown still running.
pub fn cooldown_active(remaining_secs: u64, lang: &str) -> String {
    match lang {
        "en" => format!("Easy there — wait {remaining_secs}s before using that command again."),
        "pt" => format!("Calma — espere {remaining_secs}s antes de usar esse comando de novo."),
        _ => format!("Con calma — espera {remaining_secs}s antes de repetir ese comando."),
    }
}

/// Something went wrong on our side.
pub fn internal_error(lang: &str) -> String {
    match lang {
        "en" => "Something went wrong. Please try again in a moment.",
        "pt" => "Algo deu errado. Tente de novo em um momento.",
        _ => "Algo salió mal. Intenta de nuevo en un momento.",
    }
    .to_string()
}

/// Welcome-flow completion reward.
pub fn welcome_reward(name: &str, lang: &str) -> String {
    match lang {
        "en" => format!("🎁 Welcome aboard, {name}! You've unlocked the starter pack."),
        "pt" => format!("🎁 Bem-vindo a bordo, {name}! Você desbloqueou o pacote inicial."),
        _ => format!("🎁 ¡Bienvenido a bordo, {name}! Desbloqueaste el paquete de inicio."),
    }
}
