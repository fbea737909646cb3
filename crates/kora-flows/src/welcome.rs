//! Built-in welcome (onboarding) flow.
//!
//! greeting → name_request → language_selection → completion. Captures
//! the user's display name and preferred language; the completion hook
//! consumer persists both and issues the welcome reward.

use chrono::Duration;

use crate::flow::{FlowDescriptor, StepDescriptor, StepTransition, StepValidation};

pub const WELCOME_FLOW_ID: &str = "welcome";

/// Step ids, also the keys under which inputs land in `step_data`.
pub const STEP_GREETING: &str = "greeting";
pub const STEP_NAME: &str = "name_request";
pub const STEP_LANGUAGE: &str = "language_selection";
pub const STEP_COMPLETION: &str = "completion";

/// Languages the agent speaks.
pub const LANGUAGES: &[&str] = &["es", "en", "pt"];

/// Build the welcome flow descriptor.
pub fn welcome_flow(max_duration: Duration) -> FlowDescriptor {
    FlowDescriptor {
        id: WELCOME_FLOW_ID.to_string(),
        entry_step: STEP_GREETING.to_string(),
        steps: vec![
            StepDescriptor {
                id: STEP_GREETING.to_string(),
                response_template: "¡Hola! Soy Kora, tu asistente. Vamos a configurar tu perfil. \
                                    ¿Cómo te llamas?"
                    .to_string(),
                validation: StepValidation::None,
                transition: StepTransition::Next(STEP_NAME.to_string()),
            },
            StepDescriptor {
                id: STEP_NAME.to_string(),
                response_template: "¡Mucho gusto, {input}! ¿En qué idioma prefieres hablar? \
                                    (es, en, pt)"
                    .to_string(),
                validation: StepValidation::FreeText {
                    min_len: 2,
                    max_len: 50,
                },
                transition: StepTransition::Next(STEP_LANGUAGE.to_string()),
            },
            StepDescriptor {
                id: STEP_LANGUAGE.to_string(),
                response_template: "¡Perfecto! Tu perfil quedó configurado.".to_string(),
                validation: StepValidation::Choice {
                    options: LANGUAGES.iter().map(|l| l.to_string()).collect(),
                },
                transition: StepTransition::Next(STEP_COMPLETION.to_string()),
            },
            StepDescriptor {
                id: STEP_COMPLETION.to_string(),
                response_template: "¡Listo! Bienvenido a bordo.".to_string(),
                validation: StepValidation::None,
                transition: StepTransition::End,
            },
        ],
        max_duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ContextManager;
    use std::collections::HashMap;

    fn manager() -> ContextManager {
        let mut m = ContextManager::new();
        m.register_flow(welcome_flow(Duration::minutes(30))).unwrap();
        m
    }

    #[test]
    fn test_welcome_flow_graph_is_valid() {
        welcome_flow(Duration::minutes(30)).validate().unwrap();
    }

    #[test]
    fn test_enter_starts_at_greeting() {
        let m = manager();
        let ctx = m.enter("user1", WELCOME_FLOW_ID, HashMap::new()).unwrap();
        assert_eq!(ctx.current_step, STEP_GREETING);
        assert!(ctx.active);
        assert!(ctx.expires_at > ctx.created_at);
    }

    #[test]
    fn test_full_walkthrough() {
        let m = manager();
        m.enter("user1", WELCOME_FLOW_ID, HashMap::new()).unwrap();

        // Any text advances past the greeting.
        let out = m.process("user1", "hola").unwrap();
        assert!(out.advanced);
        assert_eq!(
            m.active_context("user1").unwrap().current_step,
            STEP_NAME
        );

        // A valid name advances and the response echoes it.
        let out = m.process("user1", "Juan").unwrap();
        assert!(out.advanced);
        assert!(out.response.contains("Juan"));
        assert_eq!(
            m.active_context("user1").unwrap().current_step,
            STEP_LANGUAGE
        );

        // An invalid language does not advance and lists the options.
        let out = m.process("user1", "xx").unwrap();
        assert!(!out.advanced);
        assert!(out.response.contains("es"));
        assert!(out.response.contains("en"));
        assert!(out.response.contains("pt"));
        assert_eq!(
            m.active_context("user1").unwrap().current_step,
            STEP_LANGUAGE
        );

        // A valid language reaches the terminal step.
        let out = m.process("user1", "es").unwrap();
        assert!(out.advanced);
        assert!(out.completed);
        assert_eq!(
            m.active_context("user1").unwrap().current_step,
            STEP_COMPLETION
        );

        // Exit deactivates and fires the completion event once.
        let completion = m.exit("user1").expect("completion event");
        assert_eq!(completion.flow_id, WELCOME_FLOW_ID);
        assert_eq!(completion.step_data.get(STEP_NAME).unwrap(), "Juan");
        assert_eq!(completion.step_data.get(STEP_LANGUAGE).unwrap(), "es");
        assert!(!m.active_context("user1").is_some_and(|c| c.active));

        // A second exit must not fire the hook again.
        assert!(m.exit("user1").is_none());
    }

    #[test]
    fn test_name_too_short_rejected() {
        let m = manager();
        m.enter("user1", WELCOME_FLOW_ID, HashMap::new()).unwrap();
        m.process("user1", "hola").unwrap();

        let out = m.process("user1", "J").unwrap();
        assert!(!out.advanced);
        assert_eq!(
            m.active_context("user1").unwrap().current_step,
            STEP_NAME
        );
    }

    #[test]
    fn test_abandoned_exit_fires_no_completion() {
        let m = manager();
        m.enter("user1", WELCOME_FLOW_ID, HashMap::new()).unwrap();
        m.process("user1", "hola").unwrap();
        assert!(m.exit("user1").is_none(), "incomplete flow has no reward");
    }
}
