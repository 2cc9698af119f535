use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tripweave_shared::Result;

use crate::{ItineraryRepository, Persisted, Planner, persist};

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(3);

/// Saves a planner snapshot without holding the planner lock across the write.
///
/// `gate` makes sure only one save (manual or automatic) talks to the repository at a time.
#[derive(Clone)]
pub(crate) struct Saver {
    pub(crate) planner: Arc<Mutex<Planner>>,
    pub(crate) repository: Arc<dyn ItineraryRepository>,
    pub(crate) gate: Arc<Mutex<()>>,
}

impl Saver {
    pub(crate) async fn save(&self, automatic: bool) -> Result<Option<Persisted>> {
        let _gate = self.gate.lock().await;

        let request = {
            let planner = self.planner.lock().await;
            if automatic && !planner.should_autosave() {
                return Ok(None);
            }

            planner.prepare_save()?
        };

        let persisted = persist(self.repository.as_ref(), &request).await?;
        self.planner
            .lock()
            .await
            .complete_save(request.revision, persisted.clone());

        Ok(Some(persisted))
    }
}

/// Debounced background saving for one planner.
///
/// Each `schedule` restarts the quiet-period timer. When it fires, a save is queued for the
/// worker. The worker runs saves one after another and a queue of one coalesces bursts,
/// so an in-flight save is never interrupted and at most one follow-up is pending.
pub struct AutoSave {
    delay: Duration,
    trigger: mpsc::Sender<()>,
    timer: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl AutoSave {
    pub(crate) fn spawn(saver: Saver, delay: Duration) -> Self {
        let (trigger, mut rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                match saver.save(true).await {
                    Ok(Some(persisted)) => {
                        tracing::debug!(id = %persisted.id, "auto-saved itinerary");
                    }
                    Ok(None) => {
                        tracing::trace!("auto-save skipped");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "auto-save failed, itinerary stays dirty");
                    }
                }
            }
        });

        Self {
            delay,
            trigger,
            timer: std::sync::Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)starts the quiet-period timer.
    pub fn schedule(&self) {
        let trigger = self.trigger.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A full queue means a save is already pending and will pick up this change.
            let _ = trigger.try_send(());
        });

        if let Some(previous) = self.replace_timer(Some(handle)) {
            previous.abort();
        }
    }

    /// Drops a pending timer, e.g. before a manual save.
    pub fn cancel(&self) {
        if let Some(previous) = self.replace_timer(None) {
            previous.abort();
        }
    }

    fn replace_timer(&self, handle: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut timer = self
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        std::mem::replace(&mut *timer, handle)
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        self.cancel();
    }
}
