//! Exactly-once reconciliation of session update streams.
//!
//! DESIGN
//! ======
//! The backend pushes session updates as full batches: every batch for a
//! session is a prefix-extension of one growing log. A wait must resolve on
//! the first *unconsumed* matching update, whether it arrives by push after
//! the wait starts or already sits in the log because it landed first.
//!
//! Consumption is tracked by a per-[`WaitKey`] cursor, the count of log
//! items already consumed for that key. Each wait slices incoming batches
//! from its cursor, resolves on the first match, and advances the cursor
//! past the consumed item, so a given update is delivered to at most one
//! wait per key for the life of the client. The dedup inherits the
//! prefix-extension assumption: batches that reorder or drop earlier items
//! defeat it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::bus::{Event, EventBus, SubscriptionId, Topic};
use crate::error::Error;
use crate::models::{SessionUpdate, UpdateKind};

/// Where a wait pulls the current update log from, covering updates that
/// landed before the wait subscribed.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_session_updates(&self, session_id: &str) -> Result<Vec<SessionUpdate>, Error>;
}

/// Identity of a wait: session plus the normalized (sorted, deduplicated)
/// set of accepted kinds. Waits with the same key share one cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WaitKey {
    session_id: String,
    kinds: Vec<UpdateKind>,
}

impl WaitKey {
    fn new(session_id: &str, kinds: &[UpdateKind]) -> Self {
        let mut kinds = kinds.to_vec();
        kinds.sort_unstable();
        kinds.dedup();
        Self { session_id: session_id.to_owned(), kinds }
    }
}

struct WaitState {
    tx: Option<oneshot::Sender<Result<(SessionUpdate, usize), Error>>>,
    update_sub: Option<SubscriptionId>,
    closed_sub: Option<SubscriptionId>,
}

/// Unsubscribes the wait's bus entries when the wait ends, including when
/// its future is dropped mid-flight.
struct WaitGuard {
    bus: Arc<EventBus>,
    state: Arc<Mutex<WaitState>>,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(id) = state.update_sub.take() {
            self.bus.off(Topic::SessionUpdates, id);
        }
        if let Some(id) = state.closed_sub.take() {
            self.bus.off(Topic::Closed, id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct UpdateReconciler {
    bus: Arc<EventBus>,
    source: Arc<dyn UpdateSource>,
    cursors: Arc<Mutex<HashMap<WaitKey, usize>>>,
}

impl UpdateReconciler {
    #[must_use]
    pub fn new(bus: Arc<EventBus>, source: Arc<dyn UpdateSource>) -> Self {
        Self { bus, source, cursors: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Wait for the next unconsumed update of one of `kinds` on the session.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] when the socket closes before a matching
    /// update arrives; any error from the initial pull.
    pub async fn wait_for(
        &self,
        session_id: &str,
        kinds: &[UpdateKind],
    ) -> Result<SessionUpdate, Error> {
        let (update, _) = self.wait_with_index(session_id, kinds).await?;
        Ok(update)
    }

    /// Wait for one update of every kind in `kinds`, each through its own
    /// single-kind cursor, returned in arrival order.
    ///
    /// # Errors
    ///
    /// Same as [`Self::wait_for`]; the first failing wait aborts the rest.
    pub async fn wait_for_all(
        &self,
        session_id: &str,
        kinds: &[UpdateKind],
    ) -> Result<Vec<SessionUpdate>, Error> {
        let singles: Vec<[UpdateKind; 1]> = kinds.iter().map(|kind| [*kind]).collect();
        let waits = singles.iter().map(|kinds| self.wait_with_index(session_id, kinds));
        let mut resolved = futures_util::future::try_join_all(waits).await?;
        resolved.sort_by_key(|(_, index)| *index);
        Ok(resolved.into_iter().map(|(update, _)| update).collect())
    }

    async fn wait_with_index(
        &self,
        session_id: &str,
        kinds: &[UpdateKind],
    ) -> Result<(SessionUpdate, usize), Error> {
        let key = WaitKey::new(session_id, kinds);
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(Mutex::new(WaitState {
            tx: Some(tx),
            update_sub: None,
            closed_sub: None,
        }));
        let _guard = WaitGuard { bus: Arc::clone(&self.bus), state: Arc::clone(&state) };

        let deliver: Arc<dyn Fn(&[SessionUpdate]) + Send + Sync> = {
            let state = Arc::clone(&state);
            let cursors = Arc::clone(&self.cursors);
            let bus = Arc::clone(&self.bus);
            let key = key.clone();
            Arc::new(move |batch| {
                let mut state = lock(&state);
                if state.tx.is_none() {
                    return;
                }
                let consumed = {
                    let mut cursors = lock(&cursors);
                    let cursor = cursors.entry(key.clone()).or_insert(0);
                    if *cursor >= batch.len() {
                        return;
                    }
                    let matched = batch[*cursor..].iter().enumerate().find(|(_, update)| {
                        update.session_id == key.session_id
                            && key.kinds.contains(&update.update_kind)
                    });
                    let Some((offset, update)) = matched else {
                        return;
                    };
                    let index = *cursor + offset;
                    *cursor = index + 1;
                    (update.clone(), index)
                };
                // Unsubscribe before resolving so a reentrant emit can never
                // reach this wait again.
                if let Some(id) = state.update_sub.take() {
                    bus.off(Topic::SessionUpdates, id);
                }
                if let Some(id) = state.closed_sub.take() {
                    bus.off(Topic::Closed, id);
                }
                if let Some(tx) = state.tx.take() {
                    let _ = tx.send(Ok(consumed));
                }
            })
        };

        let update_sub = self.bus.on(Topic::SessionUpdates, {
            let deliver = Arc::clone(&deliver);
            Arc::new(move |event| {
                if let Event::SessionUpdates(batch) = event {
                    deliver(batch);
                }
            })
        });
        let closed_sub = self.bus.on(Topic::Closed, {
            let state = Arc::clone(&state);
            Arc::new(move |_| {
                if let Some(tx) = lock(&state).tx.take() {
                    let _ = tx.send(Err(Error::closed()));
                }
            })
        });
        {
            let mut state = lock(&state);
            state.update_sub = Some(update_sub);
            state.closed_sub = Some(closed_sub);
        }

        // Pull the current log once: covers updates that landed before this
        // wait subscribed.
        let backlog = self.source.fetch_session_updates(&key.session_id).await?;
        deliver(&backlog);

        rx.await.map_err(|_| Error::closed())?
    }
}

#[cfg(test)]
#[path = "updates_test.rs"]
mod tests;
