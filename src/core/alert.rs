//! Process-wide notification surface.
//!
//! Stores report every failure here; the view layer renders the current alert
//! as a toast.

use std::cell::{Cell, RefCell};

use tracing::{info, warn};

use crate::core::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

/// Holds the most recent alert. Newer alerts replace older ones.
#[derive(Debug, Default)]
pub struct AlertStore {
    current: RefCell<Option<Alert>>,
    errors: Cell<usize>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        info!(%message, "alert");
        *self.current.borrow_mut() = Some(Alert {
            kind: AlertKind::Success,
            message,
        });
    }

    /// Report a failure with the error's own message.
    pub fn error(&self, err: &ApiError) {
        self.error_message(err.to_string());
    }

    pub fn error_message(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "alert");
        self.errors.set(self.errors.get() + 1);
        *self.current.borrow_mut() = Some(Alert {
            kind: AlertKind::Error,
            message,
        });
    }

    pub fn current(&self) -> Option<Alert> {
        self.current.borrow().clone()
    }

    /// Number of errors reported since start-up.
    pub fn error_count(&self) -> usize {
        self.errors.get()
    }

    pub fn clear(&self) {
        self.current.borrow_mut().take();
    }
}
