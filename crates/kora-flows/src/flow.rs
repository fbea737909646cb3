//! Flow and step descriptors.
//!
//! A flow is a small step graph: each step validates its input, stores
//! it, and hands control to a fixed next step or a branch function of the
//! data accumulated so far. A step with the `End` transition is terminal.

use std::collections::HashMap;

use kora_core::error::KoraError;

/// Data accumulated across a flow run, keyed by the step that captured it.
pub type StepData = HashMap<String, String>;

/// Validation rule applied to a step's input.
#[derive(Debug, Clone)]
pub enum StepValidation {
    /// Any input accepted (e.g. "press anything to continue").
    None,
    /// Free text bounded by length.
    FreeText { min_len: usize, max_len: usize },
    /// One of a fixed set of options.
    Choice { options: Vec<String> },
    /// Integer within an inclusive range.
    Numeric { min: i64, max: i64 },
    /// Custom predicate with a description used in the error message.
    Pattern {
        check: fn(&str) -> bool,
        description: String,
    },
}

impl StepValidation {
    /// Validate input. Returns the user-facing error text on failure.
    pub fn validate(&self, input: &str) -> Result<(), String> {
        let input = input.trim();
        match self {
            StepValidation::None => Ok(()),
            StepValidation::FreeText { min_len, max_len } => {
                let len = input.chars().count();
                if len < *min_len {
                    Err(format!(
                        "El texto es demasiado corto (mínimo {min_len} caracteres)."
                    ))
                } else if len > *max_len {
                    Err(format!(
                        "El texto es demasiado largo (máximo {max_len} caracteres)."
                    ))
                } else {
                    Ok(())
                }
            }
            StepValidation::Choice { options } => {
                let lowered = input.to_lowercase();
                if options.iter().any(|o| o.eq_ignore_ascii_case(&lowered)) {
                    Ok(())
                } else {
                    Err(format!(
                        "Opción no válida. Elige una de: {}",
                        options.join(", ")
                    ))
                }
            }
            StepValidation::Numeric { min, max } => match input.parse::<i64>() {
                Ok(n) if n >= *min && n <= *max => Ok(()),
                Ok(_) => Err(format!("Ingresa un número entre {min} y {max}.")),
                Err(_) => Err("Ingresa un número válido.".to_string()),
            },
            StepValidation::Pattern { check, description } => {
                if check(input) {
                    Ok(())
                } else {
                    Err(format!("Entrada no válida: {description}"))
                }
            }
        }
    }
}

/// Where control goes after a step's input validates.
#[derive(Debug, Clone)]
pub enum StepTransition {
    /// Fixed next step id.
    Next(String),
    /// Next step id computed from the accumulated data.
    Branch(fn(&StepData) -> String),
    /// Terminal step.
    End,
}

/// One step of a flow.
#[derive(Debug, Clone)]
pub struct StepDescriptor {
    pub id: String,
    /// Response sent when this step's input validates. `{input}` is
    /// replaced with the (trimmed) input.
    pub response_template: String,
    pub validation: StepValidation,
    pub transition: StepTransition,
}

impl StepDescriptor {
    pub fn render_response(&self, input: &str) -> String {
        self.response_template.replace("{input}", input.trim())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.transition, StepTransition::End)
    }
}

/// A guided multi-turn flow.
#[derive(Debug, Clone)]
pub struct FlowDescriptor {
    pub id: String,
    pub entry_step: String,
    pub steps: Vec<StepDescriptor>,
    pub max_duration: chrono::Duration,
}

impl FlowDescriptor {
    pub fn step(&self, id: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Check graph integrity: the entry step and every fixed transition
    /// target must name an existing step. Branch targets are checked at
    /// runtime (they depend on data).
    pub fn validate(&self) -> Result<(), KoraError> {
        if self.step(&self.entry_step).is_none() {
            return Err(KoraError::Config(format!(
                "flow '{}': entry step '{}' does not exist",
                self.id, self.entry_step
            )));
        }
        for step in &self.steps {
            if let StepTransition::Next(target) = &step.transition {
                if self.step(target).is_none() {
                    return Err(KoraError::Config(format!(
                        "flow '{}': step '{}' points at missing step '{}'",
                        self.id, step.id, target
                    )));
                }
            }
        }
        Ok(())
    }
}
