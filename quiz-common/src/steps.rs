//! Declarative quiz structure
//!
//! A [`QuizDefinition`] lists the steps of the quiz and, for each step, the
//! fields that must be answered before the user may move forward. It is built
//! once (compiled default or TOML config) and read-only afterwards.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::form::FormValues;
use crate::payload::RESERVED_FIELDS;
use crate::{Error, Result, ValidationFailure};

/// Default step at which the contact email is collected
pub const DEFAULT_LEAD_CAPTURE_STEP: usize = 3;

/// Default name of the email field on the lead capture step
pub const DEFAULT_EMAIL_FIELD: &str = "email";

/// Kind of input a required field represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text (input, textarea, email); valid when non-blank after trimming
    Text,
    /// Single-choice group; valid when exactly one listed option is selected
    Choice { options: Vec<String> },
}

/// A field that must be answered before leaving its step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredField {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl RequiredField {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn choice<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: FieldKind::Choice {
                options: options.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Whether `values` satisfies this field
    pub fn is_satisfied(&self, values: &FormValues) -> bool {
        match (&self.kind, values.get(&self.name)) {
            (FieldKind::Text, Some(value)) => !value.trim().is_empty(),
            (FieldKind::Choice { options }, Some(selected)) => {
                options.iter().any(|option| option == selected)
            }
            (_, None) => false,
        }
    }
}

/// One screen of the quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// 1-based step index
    pub index: usize,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<RequiredField>,
}

impl StepDefinition {
    pub fn new(index: usize, title: impl Into<String>, fields: Vec<RequiredField>) -> Self {
        Self {
            index,
            title: title.into(),
            fields,
        }
    }

    /// Names of required fields not satisfied by `values`, in definition order
    pub fn failing_fields(&self, values: &FormValues) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| !field.is_satisfied(values))
            .map(|field| field.name.clone())
            .collect()
    }
}

/// Complete, validated quiz structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizDefinition {
    steps: Vec<StepDefinition>,
    lead_capture_step: usize,
    email_field: String,
}

impl QuizDefinition {
    /// Validate and build a definition
    ///
    /// Rules:
    /// - at least one step, numbered 1..=N in order
    /// - field names unique across the quiz and not reserved by the payload
    /// - choice groups list at least one option
    /// - the lead capture step exists and requires `email_field` as text
    pub fn new(
        steps: Vec<StepDefinition>,
        lead_capture_step: usize,
        email_field: impl Into<String>,
    ) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::InvalidDefinition("quiz has no steps".to_string()));
        }

        let mut seen = HashSet::new();
        for (position, step) in steps.iter().enumerate() {
            if step.index != position + 1 {
                return Err(Error::InvalidDefinition(format!(
                    "step at position {} is numbered {}",
                    position + 1,
                    step.index
                )));
            }

            for field in &step.fields {
                if field.name.trim().is_empty() {
                    return Err(Error::InvalidDefinition(format!(
                        "step {} has a field with an empty name",
                        step.index
                    )));
                }
                if RESERVED_FIELDS.contains(&field.name.as_str()) {
                    return Err(Error::InvalidDefinition(format!(
                        "field '{}' uses a reserved payload name",
                        field.name
                    )));
                }
                if !seen.insert(field.name.as_str()) {
                    return Err(Error::InvalidDefinition(format!(
                        "field '{}' is defined more than once",
                        field.name
                    )));
                }
                if let FieldKind::Choice { options } = &field.kind {
                    if options.is_empty() {
                        return Err(Error::InvalidDefinition(format!(
                            "choice field '{}' has no options",
                            field.name
                        )));
                    }
                }
            }
        }

        if lead_capture_step == 0 || lead_capture_step > steps.len() {
            return Err(Error::InvalidDefinition(format!(
                "lead capture step {} is not a step of this quiz",
                lead_capture_step
            )));
        }

        let email_field = email_field.into();
        let email_is_required_text = steps[lead_capture_step - 1]
            .fields
            .iter()
            .any(|field| field.name == email_field && field.kind == FieldKind::Text);
        if !email_is_required_text {
            return Err(Error::InvalidDefinition(format!(
                "email field '{}' is not a required text field of step {}",
                email_field, lead_capture_step
            )));
        }

        Ok(Self {
            steps,
            lead_capture_step,
            email_field,
        })
    }

    /// Number of steps (`totalSteps`)
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Step by 1-based index
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        index.checked_sub(1).and_then(|i| self.steps.get(i))
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn lead_capture_step(&self) -> usize {
        self.lead_capture_step
    }

    pub fn email_field(&self) -> &str {
        &self.email_field
    }

    /// Check required fields on every step
    ///
    /// Reports the first step with failures, like a browser's native
    /// required-field check stopping at the first invalid control.
    pub fn validate_all(&self, values: &FormValues) -> std::result::Result<(), ValidationFailure> {
        for step in &self.steps {
            let fields = step.failing_fields(values);
            if !fields.is_empty() {
                return Err(ValidationFailure {
                    step: step.index,
                    fields,
                });
            }
        }
        Ok(())
    }

    /// The seven-step niche quiz
    pub fn niche_quiz() -> Self {
        let steps = vec![
            StepDefinition::new(
                1,
                "Who do you serve?",
                vec![RequiredField::choice(
                    "avatar",
                    ["coaches", "consultants", "course_creators", "agency_owners", "other"],
                )],
            ),
            StepDefinition::new(
                2,
                "What is your current monthly revenue?",
                vec![RequiredField::choice(
                    "revenue",
                    ["under_5k", "5k_10k", "10k_50k", "over_50k"],
                )],
            ),
            StepDefinition::new(
                3,
                "Where should we send your results?",
                vec![RequiredField::text("first_name"), RequiredField::text("email")],
            ),
            StepDefinition::new(
                4,
                "Describe your niche in one sentence",
                vec![RequiredField::text("niche")],
            ),
            StepDefinition::new(
                5,
                "What is your biggest challenge?",
                vec![RequiredField::choice(
                    "challenge",
                    ["lead_generation", "conversion", "pricing", "positioning"],
                )],
            ),
            StepDefinition::new(
                6,
                "What would success look like in a year?",
                vec![RequiredField::text("goal")],
            ),
            StepDefinition::new(
                7,
                "How soon do you want to get there?",
                vec![RequiredField::choice(
                    "timeline",
                    ["30_days", "90_days", "6_months", "12_months"],
                )],
            ),
        ];

        // Static definition satisfies every rule checked by `new`
        Self {
            steps,
            lead_capture_step: DEFAULT_LEAD_CAPTURE_STEP,
            email_field: DEFAULT_EMAIL_FIELD.to_string(),
        }
    }
}

impl Default for QuizDefinition {
    fn default() -> Self {
        Self::niche_quiz()
    }
}
