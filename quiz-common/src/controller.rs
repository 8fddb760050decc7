//! Step progression state machine
//!
//! [`StepController`] owns the current step index. Forward moves are gated
//! on the active step's required fields; backward moves and direct jumps are
//! not validated. Exactly one step is active at any time and the index stays
//! within `1..=total_steps`.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::events::{EventSink, QuizEvent};
use crate::form::FormValues;
use crate::steps::QuizDefinition;
use crate::{Error, Result, ValidationFailure};

/// Progress snapshot after a navigation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub current_step: usize,
    pub total_steps: usize,
    /// `current_step / total_steps` as a percentage (0-100]
    pub percentage: f64,
}

/// Render state of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepState {
    pub index: usize,
    pub title: String,
    pub active: bool,
}

/// Result of a successful [`StepController::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// Moved to the next step
    Advanced(Progress),
    /// Active step validated but it is the last one; the caller decides
    /// whether to submit
    LastStepReached(Progress),
}

impl AdvanceOutcome {
    pub fn progress(&self) -> Progress {
        match self {
            AdvanceOutcome::Advanced(p) | AdvanceOutcome::LastStepReached(p) => *p,
        }
    }
}

/// Owned quiz navigation state
pub struct StepController {
    definition: Arc<QuizDefinition>,
    current_step: usize,
    sink: Arc<dyn EventSink>,
}

impl StepController {
    /// Start at step 1
    pub fn new(definition: Arc<QuizDefinition>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            definition,
            current_step: 1,
            sink,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.definition.total_steps()
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step == self.total_steps()
    }

    pub fn definition(&self) -> &QuizDefinition {
        &self.definition
    }

    pub fn progress(&self) -> Progress {
        let total = self.total_steps();
        Progress {
            current_step: self.current_step,
            total_steps: total,
            percentage: (self.current_step as f64 / total as f64) * 100.0,
        }
    }

    /// Every step with its active flag; exactly one is active
    pub fn step_states(&self) -> Vec<StepState> {
        self.definition
            .steps()
            .iter()
            .map(|step| StepState {
                index: step.index,
                title: step.title.clone(),
                active: step.index == self.current_step,
            })
            .collect()
    }

    /// Jump to step `n` without validation
    pub fn go_to_step(&mut self, n: usize) -> Result<Progress> {
        let total = self.total_steps();
        if n < 1 || n > total {
            return Err(Error::StepOutOfRange {
                requested: n,
                total,
            });
        }
        self.current_step = n;
        debug!(step = n, total, "Activated step");
        Ok(self.progress())
    }

    /// Validate the active step and move forward
    ///
    /// Only the active step's required fields are checked. On failure the
    /// index is unchanged and every failing field is reported. Leaving the
    /// lead capture step emits `lead_captured` with the email value. At the
    /// last step the index stays put and [`AdvanceOutcome::LastStepReached`]
    /// is returned.
    pub fn advance(
        &mut self,
        values: &FormValues,
    ) -> std::result::Result<AdvanceOutcome, ValidationFailure> {
        let step = self.current_step;
        let fields = self
            .definition
            .step(step)
            .map(|def| def.failing_fields(values))
            .unwrap_or_default();

        if !fields.is_empty() {
            debug!(step, failing = ?fields, "Step validation failed");
            return Err(ValidationFailure { step, fields });
        }

        if step == self.definition.lead_capture_step() {
            let email = values
                .get(self.definition.email_field())
                .unwrap_or_default()
                .to_string();
            info!(step, "Lead captured");
            self.sink.emit(QuizEvent::LeadCaptured { email });
        }

        if self.is_last_step() {
            return Ok(AdvanceOutcome::LastStepReached(self.progress()));
        }

        let progress = self.go_to_step(step + 1).unwrap_or_else(|_| self.progress());
        Ok(AdvanceOutcome::Advanced(progress))
    }

    /// Move back one step; no-op at step 1
    pub fn retreat(&mut self) -> Progress {
        if self.current_step > 1 {
            self.current_step -= 1;
            debug!(step = self.current_step, "Stepped back");
        }
        self.progress()
    }

    /// Return to step 1
    pub fn reset(&mut self) -> Progress {
        self.current_step = 1;
        self.progress()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::steps::{RequiredField, StepDefinition};

    fn controller() -> (StepController, Arc<EventLog>) {
        let log = Arc::new(EventLog::new());
        let controller = StepController::new(Arc::new(QuizDefinition::niche_quiz()), log.clone());
        (controller, log)
    }

    fn complete_form() -> FormValues {
        FormValues::new()
            .with("avatar", "coaches")
            .with("revenue", "10k_50k")
            .with("first_name", "Ann")
            .with("email", "a@b.com")
            .with("niche", "fitness for new parents")
            .with("challenge", "pricing")
            .with("goal", "double revenue")
            .with("timeline", "90_days")
    }

    #[test]
    fn test_go_to_step_activates_exactly_one() {
        let (mut c, _) = controller();
        for n in 1..=c.total_steps() {
            let progress = c.go_to_step(n).unwrap();
            let active: Vec<_> = c.step_states().into_iter().filter(|s| s.active).collect();
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].index, n);
            assert_eq!(progress.current_step, n);
            assert!((progress.percentage - n as f64 / 7.0 * 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_go_to_step_out_of_range_leaves_state() {
        let (mut c, _) = controller();
        c.go_to_step(4).unwrap();
        assert!(matches!(
            c.go_to_step(0),
            Err(Error::StepOutOfRange { requested: 0, total: 7 })
        ));
        assert!(c.go_to_step(8).is_err());
        assert_eq!(c.current_index(), 4);
    }

    #[test]
    fn test_advance_blocked_by_empty_text_field() {
        let (mut c, log) = controller();
        c.go_to_step(4).unwrap();
        let values = complete_form().with("niche", "   ");
        let failure = c.advance(&values).unwrap_err();
        assert_eq!(failure.step, 4);
        assert_eq!(failure.fields, vec!["niche".to_string()]);
        assert_eq!(c.current_index(), 4);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_advance_blocked_by_unselected_choice() {
        let (mut c, _) = controller();
        assert!(c.advance(&FormValues::new()).is_err());
        assert_eq!(c.current_index(), 1);

        let outcome = c.advance(&FormValues::new().with("avatar", "other")).unwrap();
        assert_eq!(outcome, AdvanceOutcome::Advanced(c.progress()));
        assert_eq!(c.current_index(), 2);
    }

    #[test]
    fn test_advance_ignores_other_steps() {
        let (mut c, _) = controller();
        c.go_to_step(2).unwrap();
        // Step 1 answer missing; only step 2 is checked
        let outcome = c.advance(&FormValues::new().with("revenue", "under_5k"));
        assert!(outcome.is_ok());
        assert_eq!(c.current_index(), 3);
    }

    #[test]
    fn test_lead_capture_emits_once_then_advances() {
        let (mut c, log) = controller();
        c.go_to_step(3).unwrap();
        c.advance(&complete_form()).unwrap();
        assert_eq!(c.current_index(), 4);
        assert_eq!(
            log.events(),
            vec![QuizEvent::LeadCaptured {
                email: "a@b.com".to_string()
            }]
        );
    }

    #[test]
    fn test_lead_capture_not_emitted_on_failed_validation() {
        let (mut c, log) = controller();
        c.go_to_step(3).unwrap();
        let values = FormValues::new().with("first_name", "Ann");
        assert!(c.advance(&values).is_err());
        assert_eq!(log.count("lead_captured"), 0);
    }

    #[test]
    fn test_advance_at_last_step_does_not_increment() {
        let (mut c, _) = controller();
        c.go_to_step(7).unwrap();
        let outcome = c.advance(&complete_form()).unwrap();
        assert!(matches!(outcome, AdvanceOutcome::LastStepReached(_)));
        assert_eq!(c.current_index(), 7);
    }

    #[test]
    fn test_retreat() {
        let (mut c, _) = controller();
        assert_eq!(c.retreat().current_step, 1);
        c.go_to_step(5).unwrap();
        assert_eq!(c.retreat().current_step, 4);
        assert_eq!(c.current_index(), 4);
    }

    #[test]
    fn test_single_step_quiz() {
        let definition = QuizDefinition::new(
            vec![StepDefinition::new(1, "Only", vec![RequiredField::text("email")])],
            1,
            "email",
        )
        .unwrap();
        let log = Arc::new(EventLog::new());
        let mut c = StepController::new(Arc::new(definition), log.clone());
        let outcome = c.advance(&FormValues::new().with("email", "x@y.z")).unwrap();
        assert!(matches!(outcome, AdvanceOutcome::LastStepReached(p) if p.percentage == 100.0));
        assert_eq!(log.count("lead_captured"), 1);
    }
}
