use super::SaveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveStatus {
    Idle,
    Pending,
    /// The request succeeded; the host window is expected to close.
    Done,
}

/// Where a failed destructive request is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSurface {
    /// Logged only (clear cache).
    LogOnly,
    /// Handed back to the editor, which shows it in its error slot (remove license).
    Inline,
}

/// One-shot action with no error state of its own: a failure returns to `Idle` so the
/// user can simply try again.
#[derive(Debug, Clone)]
pub struct DestructiveLifecycle {
    name: &'static str,
    status: DestructiveStatus,
    surface: ErrorSurface,
    last_error: Option<SaveError>,
}

impl DestructiveLifecycle {
    pub fn new(name: &'static str, surface: ErrorSurface) -> Self {
        Self {
            name,
            status: DestructiveStatus::Idle,
            surface,
            last_error: None,
        }
    }

    pub fn status(&self) -> DestructiveStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == DestructiveStatus::Pending
    }

    pub fn last_error(&self) -> Option<&SaveError> {
        self.last_error.as_ref()
    }

    /// Returns `true` when the caller should send the request.
    pub fn begin(&mut self) -> bool {
        match self.status {
            DestructiveStatus::Idle => {
                self.status = DestructiveStatus::Pending;
                self.last_error = None;
                true
            }
            DestructiveStatus::Pending | DestructiveStatus::Done => {
                tracing::debug!(action = self.name, status = ?self.status, "ignoring repeated request");
                false
            }
        }
    }

    /// Applies the request outcome. Inline failures are returned for the editor to show.
    pub fn complete(&mut self, outcome: Result<(), SaveError>) -> Option<SaveError> {
        if !self.is_pending() {
            tracing::warn!(action = self.name, status = ?self.status, "dropping outcome for idle action");
            return None;
        }
        match outcome {
            Ok(()) => {
                tracing::info!(action = self.name, "request completed");
                self.status = DestructiveStatus::Done;
                None
            }
            Err(err) => {
                tracing::error!(action = self.name, %err, "settings error");
                self.status = DestructiveStatus::Idle;
                self.last_error = Some(err.clone());
                match self.surface {
                    ErrorSurface::LogOnly => None,
                    ErrorSurface::Inline => Some(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_marks_done_and_blocks_repeat() {
        let mut action = DestructiveLifecycle::new("clear_cache", ErrorSurface::LogOnly);
        assert!(action.begin());
        assert!(!action.begin());
        assert_eq!(action.complete(Ok(())), None);
        assert_eq!(action.status(), DestructiveStatus::Done);
        assert!(!action.begin());
    }

    #[test]
    fn log_only_failure_returns_to_idle_silently() {
        let mut action = DestructiveLifecycle::new("clear_cache", ErrorSurface::LogOnly);
        action.begin();
        let surfaced = action.complete(Err(SaveError::network(Some("offline".into()))));
        assert!(surfaced.is_none());
        assert_eq!(action.status(), DestructiveStatus::Idle);
        assert_eq!(
            action.last_error().map(SaveError::display_message),
            Some("offline")
        );
        assert!(action.begin());
        assert!(action.last_error().is_none());
    }

    #[test]
    fn inline_failure_is_handed_back() {
        let mut action = DestructiveLifecycle::new("remove_license", ErrorSurface::Inline);
        action.begin();
        let surfaced = action.complete(Err(SaveError::validation(Some("no license".into()))));
        assert_eq!(
            surfaced.as_ref().map(SaveError::display_message),
            Some("no license")
        );
        assert_eq!(action.status(), DestructiveStatus::Idle);
    }

    #[test]
    fn outcome_without_request_is_ignored() {
        let mut action = DestructiveLifecycle::new("clear_cache", ErrorSurface::Inline);
        assert!(action.complete(Err(SaveError::unknown(None))).is_none());
        assert_eq!(action.status(), DestructiveStatus::Idle);
    }
}
