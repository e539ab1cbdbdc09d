//! Single-client admission.
//!
//! A calc-link service serves one client at a time.  The [`AdmissionGate`]
//! hands out at most one [`AdmissionToken`]; the slot frees itself when the
//! token is dropped, so a connection task that ends by any path (normal
//! close, error, panic unwinding) gives the slot back.
//!
//! The gate is an owned value shared by cloning, not a process global.  Two
//! services in the same process each get their own gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("another client is already being served")]
    Busy,
}

/// Grants exclusive use of a service to one client at a time.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    occupied: Arc<AtomicBool>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot if it is free.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::Busy`] while another token is alive.
    pub fn try_acquire(&self) -> Result<AdmissionToken, AdmissionError> {
        self.occupied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AdmissionError::Busy)?;
        Ok(AdmissionToken {
            occupied: Arc::clone(&self.occupied),
        })
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }
}

/// Proof of admission.  Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the token is dropped"]
pub struct AdmissionToken {
    occupied: Arc<AtomicBool>,
}

impl Drop for AdmissionToken {
    fn drop(&mut self) {
        self.occupied.store(false, Ordering::Release);
    }
}
