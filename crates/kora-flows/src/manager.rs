//! Per-user conversation context state machine.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use kora_core::error::KoraError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::flow::{FlowDescriptor, StepData, StepTransition};

/// A running (or finished) flow for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub id: String,
    pub user_id: String,
    pub flow_id: String,
    pub current_step: String,
    pub step_data: StepData,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    /// The flow reached its terminal step.
    pub completed: bool,
    /// The completion hook already fired for this context.
    #[serde(default)]
    pub hook_fired: bool,
}

/// Result of feeding input to the active step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub response: String,
    /// False when validation rejected the input (step unchanged).
    pub advanced: bool,
    /// True when the flow just reached its terminal step.
    pub completed: bool,
}

/// Fired exactly once per completed flow, on `exit`.
#[derive(Debug, Clone)]
pub struct FlowCompletion {
    pub flow_id: String,
    pub user_id: String,
    pub step_data: StepData,
}

/// Manages flow descriptors and one active context per user.
///
/// Interior mutability keeps the call sites simple; the gateway processes
/// one message at a time, so the mutex is uncontended in practice but
/// makes a multi-threaded port safe.
pub struct ContextManager {
    flows: HashMap<String, FlowDescriptor>,
    contexts: Mutex<HashMap<String, ConversationContext>>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self {
            flows: HashMap::new(),
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Register a flow. The step graph is validated up front; a bad graph
    /// is a configuration error, not a runtime surprise.
    pub fn register_flow(&mut self, flow: FlowDescriptor) -> Result<(), KoraError> {
        flow.validate()?;
        if self.flows.contains_key(&flow.id) {
            return Err(KoraError::Config(format!(
                "flow '{}' registered twice",
                flow.id
            )));
        }
        info!("flow registered: {} ({} steps)", flow.id, flow.steps.len());
        self.flows.insert(flow.id.clone(), flow);
        Ok(())
    }

    pub fn flow(&self, flow_id: &str) -> Option<&FlowDescriptor> {
        self.flows.get(flow_id)
    }

    /// Start a flow for a user, replacing any previous context for them.
    pub fn enter(
        &self,
        user_id: &str,
        flow_id: &str,
        initial_data: StepData,
    ) -> Result<ConversationContext, KoraError> {
        let flow = self
            .flows
            .get(flow_id)
            .ok_or_else(|| KoraError::Config(format!("unknown flow '{flow_id}'")))?;

        let now = Utc::now();
        let ctx = ConversationContext {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            flow_id: flow_id.to_string(),
            current_step: flow.entry_step.clone(),
            step_data: initial_data,
            created_at: now,
            expires_at: now + flow.max_duration,
            active: true,
            completed: false,
            hook_fired: false,
        };

        debug!("flow '{}' entered for user {}", flow_id, user_id);
        let mut contexts = self.contexts.lock().expect("context lock poisoned");
        contexts.insert(user_id.to_string(), ctx.clone());
        Ok(ctx)
    }

    /// The user's active context, if any.
    pub fn active_context(&self, user_id: &str) -> Option<ConversationContext> {
        let contexts = self.contexts.lock().expect("context lock poisoned");
        contexts.get(user_id).filter(|c| c.active).cloned()
    }

    /// Feed input to the user's active context.
    ///
    /// Invalid input returns the validation error text and leaves the
    /// step untouched. Valid input stores the value under the current
    /// step id, advances along the step's transition, and returns the
    /// step's rendered response.
    pub fn process(&self, user_id: &str, input: &str) -> Result<StepOutcome, KoraError> {
        let mut contexts = self.contexts.lock().expect("context lock poisoned");
        let ctx = contexts
            .get_mut(user_id)
            .filter(|c| c.active)
            .ok_or_else(|| KoraError::Validation("no active flow".to_string()))?;

        let flow = self
            .flows
            .get(&ctx.flow_id)
            .ok_or_else(|| KoraError::Config(format!("unknown flow '{}'", ctx.flow_id)))?;
        let step = flow.step(&ctx.current_step).ok_or_else(|| {
            KoraError::Config(format!(
                "context at step '{}' missing from flow '{}'",
                ctx.current_step, ctx.flow_id
            ))
        })?;

        if let Err(message) = step.validation.validate(input) {
            return Ok(StepOutcome {
                response: message,
                advanced: false,
                completed: false,
            });
        }

        ctx.step_data
            .insert(ctx.current_step.clone(), input.trim().to_string());
        let response = step.render_response(input);

        let next_id = match &step.transition {
            StepTransition::Next(id) => id.clone(),
            StepTransition::Branch(f) => {
                let target = f(&ctx.step_data);
                if flow.step(&target).is_none() {
                    return Err(KoraError::Config(format!(
                        "flow '{}': branch from '{}' chose missing step '{}'",
                        flow.id, step.id, target
                    )));
                }
                target
            }
            StepTransition::End => {
                // Already terminal — re-processing the terminal step keeps
                // the context where it is.
                ctx.completed = true;
                return Ok(StepOutcome {
                    response,
                    advanced: false,
                    completed: true,
                });
            }
        };

        ctx.current_step = next_id;
        let completed = flow
            .step(&ctx.current_step)
            .is_some_and(|s| s.is_terminal());
        if completed {
            ctx.completed = true;
        }

        Ok(StepOutcome {
            response,
            advanced: true,
            completed,
        })
    }

    /// Deactivate the user's context. Returns the completion event the
    /// first time a completed flow is exited, `None` otherwise.
    pub fn exit(&self, user_id: &str) -> Option<FlowCompletion> {
        let mut contexts = self.contexts.lock().expect("context lock poisoned");
        let ctx = contexts.get_mut(user_id)?;
        ctx.active = false;

        if ctx.completed && !ctx.hook_fired {
            ctx.hook_fired = true;
            info!("flow '{}' completed by user {}", ctx.flow_id, user_id);
            return Some(FlowCompletion {
                flow_id: ctx.flow_id.clone(),
                user_id: ctx.user_id.clone(),
                step_data: ctx.step_data.clone(),
            });
        }
        None
    }

    /// Exit every active context whose deadline has passed. Returns the
    /// reaped user ids, each paired with the completion event when the
    /// flow had reached its terminal step but was never exited. Driven by
    /// an external scheduler, not by user activity.
    pub fn cleanup_expired(&self) -> Vec<(String, Option<FlowCompletion>)> {
        let now = Utc::now();
        let mut contexts = self.contexts.lock().expect("context lock poisoned");
        let mut reaped = Vec::new();
        for ctx in contexts.values_mut() {
            if ctx.active && ctx.expires_at <= now {
                ctx.active = false;
                let completion = if ctx.completed && !ctx.hook_fired {
                    ctx.hook_fired = true;
                    info!("flow '{}' completed by user {}", ctx.flow_id, ctx.user_id);
                    Some(FlowCompletion {
                        flow_id: ctx.flow_id.clone(),
                        user_id: ctx.user_id.clone(),
                        step_data: ctx.step_data.clone(),
                    })
                } else {
                    warn!(
                        "flow '{}' expired for user {} at step '{}'",
                        ctx.flow_id, ctx.user_id, ctx.current_step
                    );
                    None
                };
                reaped.push((ctx.user_id.clone(), completion));
            }
        }
        reaped
    }

    /// Active contexts, for persistence across restarts.
    pub fn export_active(&self) -> Vec<ConversationContext> {
        let contexts = self.contexts.lock().expect("context lock poisoned");
        contexts.values().filter(|c| c.active).cloned().collect()
    }

    /// Restore persisted contexts. Contexts for unknown flows are dropped
    /// with a warning (the manifest may have changed across restarts).
    pub fn restore(&self, saved: Vec<ConversationContext>) {
        let mut contexts = self.contexts.lock().expect("context lock poisoned");
        for ctx in saved {
            match self.flows.get(&ctx.flow_id) {
                Some(flow) if flow.step(&ctx.current_step).is_some() => {
                    contexts.insert(ctx.user_id.clone(), ctx);
                }
                _ => warn!(
                    "dropping restored context for user {}: flow '{}' step '{}' no longer exists",
                    ctx.user_id, ctx.flow_id, ctx.current_step
                ),
            }
        }
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}
