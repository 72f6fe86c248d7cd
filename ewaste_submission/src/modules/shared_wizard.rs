use log::warn;
use std::sync::Arc;
use tokio::{
    runtime::Handle,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use uuid::Uuid;

use crate::modules::{
    capability::SubmissionHandler,
    error::WizardError,
    submission_wizard::{deliver, SubmissionWizard},
};

// Wizard shared between the tasks that dispatch user events
// The submission handler runs outside the lock, so readers can observe the busy state
#[derive(Clone)]
pub struct SharedWizard {
    inner: Arc<RwLock<SubmissionWizard>>,
}

impl SharedWizard {
    pub fn new(wizard: SubmissionWizard) -> Self {
        Self {
            inner: Arc::new(RwLock::new(wizard)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, SubmissionWizard> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, SubmissionWizard> {
        self.inner.write().await
    }

    pub async fn is_busy(&self) -> bool {
        self.inner.read().await.is_busy()
    }

    // A second call while the first is with the handler gets `WizardError::Busy`
    // Dropping the returned future before it completes returns the wizard to review
    pub async fn submit(&self, handler: &dyn SubmissionHandler) -> Result<Uuid, WizardError> {
        let (record, timeout) = { // Acquire write lock to validate and enter the busy state
            let mut wizard = self.inner.write().await;
            let record = wizard.begin_submit()?;
            (record, wizard.submit_timeout())
        }; // Release the write lock

        let submission_id = record.submission_id;
        let mut pending = PendingSubmit {
            inner: self.inner.clone(),
            submission_id,
            armed: true,
        };
        let outcome = deliver(handler, record, timeout).await;

        { // Acquire write lock again when the handler has answered
            let mut wizard = self.inner.write().await;
            pending.armed = false;
            wizard.finish_submit(outcome)?;
        } // Release the write lock

        Ok(submission_id)
    }
}

// Armed while a submission started by `SharedWizard::submit` is unfinished
struct PendingSubmit {
    inner: Arc<RwLock<SubmissionWizard>>,
    submission_id: Uuid,
    armed: bool,
}

impl Drop for PendingSubmit {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let submission_id = self.submission_id;

        // Drop cannot await, take the lock now or hand the rollback to the runtime
        match self.inner.try_write() {
            Ok(mut wizard) => wizard.abandon_submit(submission_id),
            Err(_) => match Handle::try_current() {
                Ok(handle) => {
                    let inner = self.inner.clone();
                    handle.spawn(async move {
                        inner.write().await.abandon_submit(submission_id);
                    });
                }
                Err(_) => warn!(
                    "Submission {} abandoned outside a runtime, wizard left busy",
                    submission_id
                ),
            },
        }
    }
}
