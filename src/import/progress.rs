//! Step list reported to callers while an import runs.
//!
//! The list is fixed before any network call: one `create` step followed by
//! one step per planned link operation. Step states only move forward.

use std::fmt;

use serde::Serialize;

use super::linker::{PlannedLink, plan_operations};
use super::types::LinkRequest;

pub const CREATE_STEP_ID: &str = "create";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Completed | StepState::Failed)
    }

    /// Whether moving from `self` to `next` goes forward.
    pub fn can_advance_to(&self, next: StepState) -> bool {
        match self {
            StepState::Pending => next != StepState::Pending,
            StepState::InProgress => next.is_terminal(),
            StepState::Completed | StepState::Failed => false,
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepState::Pending => write!(f, "pending"),
            StepState::InProgress => write!(f, "in progress"),
            StepState::Completed => write!(f, "completed"),
            StepState::Failed => write!(f, "failed"),
        }
    }
}

/// One entry of the progress list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub id: String,
    pub label: String,
    pub state: StepState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProgressStep {
    fn pending(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            state: StepState::Pending,
            detail: None,
        }
    }
}

pub(crate) fn link_steps(planned: &[PlannedLink]) -> Vec<ProgressStep> {
    planned
        .iter()
        .map(|p| ProgressStep::pending(p.step_id.clone(), p.operation.label()))
        .collect()
}

/// Enumerate the steps an import with `request` will perform.
pub fn describe_steps(request: &LinkRequest) -> Vec<ProgressStep> {
    let mut steps = vec![ProgressStep::pending(CREATE_STEP_ID, "Create test")];
    steps.extend(link_steps(&plan_operations(request)));
    steps
}

/// Receives step updates as a run progresses.
pub trait ProgressObserver: Send {
    fn on_step(&mut self, index: usize, step: &ProgressStep);
}

impl<F> ProgressObserver for F
where
    F: FnMut(usize, &ProgressStep) + Send,
{
    fn on_step(&mut self, index: usize, step: &ProgressStep) {
        self(index, step)
    }
}

/// Observer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_step(&mut self, _index: usize, _step: &ProgressStep) {}
}

/// Owns the step list of one run and forwards changes to an observer.
pub struct ProgressTracker<'a> {
    steps: Vec<ProgressStep>,
    observer: &'a mut dyn ProgressObserver,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(steps: Vec<ProgressStep>, observer: &'a mut dyn ProgressObserver) -> Self {
        Self { steps, observer }
    }

    /// Move step `index` to `state`. Backward or unknown moves are ignored.
    pub fn advance(&mut self, index: usize, state: StepState, detail: Option<String>) -> bool {
        let Some(step) = self.steps.get_mut(index) else {
            return false;
        };
        if !step.state.can_advance_to(state) {
            tracing::debug!(
                step = %step.id,
                from = %step.state,
                to = %state,
                "ignoring backward step transition"
            );
            return false;
        }
        step.state = state;
        if detail.is_some() {
            step.detail = detail;
        }
        self.observer.on_step(index, step);
        true
    }

    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<ProgressStep> {
        self.steps
    }
}
