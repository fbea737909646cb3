//! # kora-flows
//!
//! Guided multi-turn conversation flows: flow/step descriptors with
//! per-step input validation, a per-user context state machine, and the
//! built-in welcome flow.

pub mod flow;
pub mod manager;
pub mod welcome;

pub use flow::{FlowDescriptor, StepData, StepDescriptor, StepTransition, StepValidation};
pub use manager::{ContextManager, ConversationContext, FlowCompletion, StepOutcome};
pub use welcome::{
    welcome_flow, LANGUAGES, STEP_COMPLETION, STEP_GREETING, STEP_LANGUAGE, STEP_NAME,
    WELCOME_FLOW_ID,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    fn two_step_flow(id: &str, max_duration: Duration) -> FlowDescriptor {
        FlowDescriptor {
            id: id.to_string(),
            entry_step: "ask".to_string(),
            steps: vec![
                StepDescriptor {
                    id: "ask".to_string(),
                    response_template: "got {input}".to_string(),
                    validation: StepValidation::FreeText {
                        min_len: 1,
                        max_len: 100,
                    },
                    transition: StepTransition::Next("done".to_string()),
                },
                StepDescriptor {
                    id: "done".to_string(),
                    response_template: "bye".to_string(),
                    validation: StepValidation::None,
                    transition: StepTransition::End,
                },
            ],
            max_duration,
        }
    }

    #[test]
    fn test_duplicate_flow_registration_rejected() {
        let mut m = ContextManager::new();
        m.register_flow(two_step_flow("f", Duration::minutes(5)))
            .unwrap();
        assert!(m
            .register_flow(two_step_flow("f", Duration::minutes(5)))
            .is_err());
    }

    #[test]
    fn test_enter_unknown_flow_fails() {
        let m = ContextManager::new();
        assert!(m.enter("u", "ghost", HashMap::new()).is_err());
    }

    #[test]
    fn test_process_without_context_fails() {
        let mut m = ContextManager::new();
        m.register_flow(two_step_flow("f", Duration::minutes(5)))
            .unwrap();
        assert!(m.process("u", "hello").is_err());
    }

    #[test]
    fn test_reentering_replaces_context() {
        let mut m = ContextManager::new();
        m.register_flow(two_step_flow("f", Duration::minutes(5)))
            .unwrap();
        m.enter("u", "f", HashMap::new()).unwrap();
        m.process("u", "first").unwrap();
        assert_eq!(m.active_context("u").unwrap().current_step, "done");

        m.enter("u", "f", HashMap::new()).unwrap();
        assert_eq!(m.active_context("u").unwrap().current_step, "ask");
    }

    #[test]
    fn test_cleanup_expired_reaps_only_overdue() {
        let mut m = ContextManager::new();
        m.register_flow(two_step_flow("short", Duration::seconds(-1)))
            .unwrap();
        m.register_flow(two_step_flow("long", Duration::minutes(30)))
            .unwrap();

        // Negative duration puts expires_at in the past immediately.
        m.enter("expired_user", "short", HashMap::new()).unwrap();
        m.enter("fresh_user", "long", HashMap::new()).unwrap();

        let reaped = m.cleanup_expired();
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].0, "expired_user");
        assert!(reaped[0].1.is_none(), "mid-flow expiry carries no completion");
        assert!(m.active_context("expired_user").is_none());
        assert!(m.active_context("fresh_user").is_some());

        // Idempotent: nothing left to reap.
        assert!(m.cleanup_expired().is_empty());
    }

    #[test]
    fn test_cleanup_fires_completion_for_finished_flow() {
        let mut m = ContextManager::new();
        m.register_flow(two_step_flow("short", Duration::seconds(-1)))
            .unwrap();
        m.enter("u", "short", HashMap::new()).unwrap();
        let out = m.process("u", "hello").unwrap();
        assert!(out.completed);

        let reaped = m.cleanup_expired();
        assert_eq!(reaped.len(), 1);
        let completion = reaped[0].1.as_ref().expect("completed flow fires its hook");
        assert_eq!(completion.flow_id, "short");
        assert_eq!(completion.step_data.get("ask").unwrap(), "hello");

        // Once only: a later exit does not fire it again.
        assert!(m.exit("u").is_none());
    }

    #[test]
    fn test_branch_transition() {
        let mut m = ContextManager::new();
        let flow = FlowDescriptor {
            id: "branching".to_string(),
            entry_step: "pick".to_string(),
            steps: vec![
                StepDescriptor {
                    id: "pick".to_string(),
                    response_template: "ok".to_string(),
                    validation: StepValidation::Choice {
                        options: vec!["a".into(), "b".into()],
                    },
                    transition: StepTransition::Branch(|data| {
                        match data.get("pick").map(String::as_str) {
                            Some("a") => "left".to_string(),
                            _ => "right".to_string(),
                        }
                    }),
                },
                StepDescriptor {
                    id: "left".to_string(),
                    response_template: "L".to_string(),
                    validation: StepValidation::None,
                    transition: StepTransition::End,
                },
                StepDescriptor {
                    id: "right".to_string(),
                    response_template: "R".to_string(),
                    validation: StepValidation::None,
                    transition: StepTransition::End,
                },
            ],
            max_duration: Duration::minutes(5),
        };
        m.register_flow(flow).unwrap();

        m.enter("u", "branching", HashMap::new()).unwrap();
        let out = m.process("u", "a").unwrap();
        assert!(out.completed);
        assert_eq!(m.active_context("u").unwrap().current_step, "left");
    }

    #[test]
    fn test_restore_drops_unknown_flows() {
        let mut m = ContextManager::new();
        m.register_flow(two_step_flow("f", Duration::minutes(5)))
            .unwrap();
        let good = m.enter("u1", "f", HashMap::new()).unwrap();
        let mut bad = good.clone();
        bad.user_id = "u2".to_string();
        bad.flow_id = "removed".to_string();

        let m2 = {
            let mut m2 = ContextManager::new();
            m2.register_flow(two_step_flow("f", Duration::minutes(5)))
                .unwrap();
            m2.restore(vec![good, bad]);
            m2
        };
        assert!(m2.active_context("u1").is_some());
        assert!(m2.active_context("u2").is_none());
    }

    #[test]
    fn test_initial_data_preserved() {
        let mut m = ContextManager::new();
        m.register_flow(two_step_flow("f", Duration::minutes(5)))
            .unwrap();
        let initial = HashMap::from([("source".to_string(), "command".to_string())]);
        m.enter("u", "f", initial).unwrap();
        m.process("u", "hello").unwrap();

        let ctx = m.active_context("u").unwrap();
        assert_eq!(ctx.step_data.get("source").unwrap(), "command");
        assert_eq!(ctx.step_data.get("ask").unwrap(), "hello");
    }
}
