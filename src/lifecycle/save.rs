use time::OffsetDateTime;

use super::SaveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    /// Terminal for the lifetime of the editor.
    Saved { at: OffsetDateTime },
    Error(SaveError),
}

impl SaveStatus {
    pub fn kind(&self) -> SaveStatusKind {
        match self {
            SaveStatus::Idle => SaveStatusKind::Idle,
            SaveStatus::Saving => SaveStatusKind::Saving,
            SaveStatus::Saved { .. } => SaveStatusKind::Saved,
            SaveStatus::Error(_) => SaveStatusKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatusKind {
    Idle,
    Saving,
    Saved,
    Error,
}

/// What a click on the submit button does once an error is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Clear the error and submit the current edit state in the same click.
    ResubmitOnAcknowledge,
    /// Clear the error only; the next click submits.
    AcknowledgeOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    /// The caller must issue the request now.
    Submit,
    /// An error was cleared and no request is to be sent.
    Acknowledged,
    /// Nothing to do: a request is in flight or the save already completed.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SaveLifecycle {
    status: SaveStatus,
    policy: RetryPolicy,
    history: Vec<SaveStatusKind>,
}

impl SaveLifecycle {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            status: SaveStatus::Idle,
            policy,
            history: vec![SaveStatusKind::Idle],
        }
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.status, SaveStatus::Saving)
    }

    pub fn is_saved(&self) -> bool {
        matches!(self.status, SaveStatus::Saved { .. })
    }

    pub fn saved_at(&self) -> Option<OffsetDateTime> {
        match self.status {
            SaveStatus::Saved { at } => Some(at),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SaveError> {
        match &self.status {
            SaveStatus::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Every state entered since creation, starting with `Idle`.
    pub fn history(&self) -> &[SaveStatusKind] {
        &self.history
    }

    /// Handles a click on the submit button.
    pub fn submit(&mut self) -> SubmitDecision {
        match self.status {
            SaveStatus::Idle => {
                self.transition(SaveStatus::Saving);
                SubmitDecision::Submit
            }
            SaveStatus::Saving | SaveStatus::Saved { .. } => {
                tracing::debug!(status = ?self.status.kind(), "ignoring duplicate submit");
                SubmitDecision::Ignored
            }
            SaveStatus::Error(_) => {
                self.transition(SaveStatus::Idle);
                match self.policy {
                    RetryPolicy::ResubmitOnAcknowledge => {
                        self.transition(SaveStatus::Saving);
                        SubmitDecision::Submit
                    }
                    RetryPolicy::AcknowledgeOnly => SubmitDecision::Acknowledged,
                }
            }
        }
    }

    /// Applies the outcome of the request started by [`submit`](Self::submit).
    /// Outcomes that arrive outside `Saving` are dropped and `false` is returned.
    pub fn complete(&mut self, outcome: Result<(), SaveError>) -> bool {
        if !self.is_saving() {
            tracing::warn!(status = ?self.status.kind(), "dropping save outcome outside of saving state");
            return false;
        }
        match outcome {
            Ok(()) => self.transition(SaveStatus::Saved {
                at: OffsetDateTime::now_utc(),
            }),
            Err(err) => {
                tracing::error!(%err, "save failed");
                self.transition(SaveStatus::Error(err));
            }
        }
        true
    }

    fn transition(&mut self, next: SaveStatus) {
        tracing::debug!(from = ?self.status.kind(), to = ?next.kind(), "save lifecycle transition");
        self.history.push(next.kind());
        self.status = next;
    }
}
