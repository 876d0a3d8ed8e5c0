//! Per-actor pending-command tracking with expiry timers.
//!
//! Each actor holds at most one command awaiting a follow-up world
//! interaction. Installing a new command cancels the previous one's
//! timer (last command wins, no queueing); every entry additionally
//! carries a generation number so a timer fire that lost the race with
//! cancellation is a guaranteed no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use tokio::task::JoinHandle;

use crate::shop::types::{ActorId, ContainerHandle};

/// How long a command waits for its follow-up interaction.
pub const DEFAULT_PENDING_TIMEOUT: Duration = Duration::from_secs(60);

/// The follow-up a pending command is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingKind {
    Create,
    Remove,
    SetAdmin(bool),
    Rename(String),
    CloneAwaitSource,
    /// Waiting for the clone destination; carries the captured source.
    CloneAwaitTarget(ContainerHandle),
}

/// A command awaiting its follow-up interaction. Purely in-memory; never
/// persisted.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub kind: PendingKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

struct PendingEntry {
    command: PendingCommand,
    generation: u64,
    timer: JoinHandle<()>,
}

type PendingMap = HashMap<ActorId, PendingEntry>;

/// Owned engine instance holding the per-actor pending state. No ambient
/// statics: construct one per embedding host, drop it to tear down.
pub struct PendingEngine {
    entries: Arc<Mutex<PendingMap>>,
    next_generation: AtomicU64,
    timeout: Duration,
}

fn lock(entries: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    // The map holds only expendable in-memory state, so recover from
    // poisoning instead of propagating a panic across event callbacks.
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PendingEngine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            timeout,
        }
    }

    pub fn with_default_timeout() -> Self {
        Self::new(DEFAULT_PENDING_TIMEOUT)
    }

    /// Install a pending command for `actor`, superseding any existing
    /// one. The previous timer is cancelled before the replacement is
    /// armed. Must be called from within a tokio runtime.
    pub fn set_pending(&self, actor: ActorId, kind: PendingKind) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let command = PendingCommand {
            kind,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(self.timeout.as_secs() as i64),
        };
        let timer = tokio::spawn({
            let entries = Arc::clone(&self.entries);
            let timeout = self.timeout;
            async move {
                tokio::time::sleep(timeout).await;
                let mut entries = lock(&entries);
                // A fire whose generation no longer matches lost the race
                // with a supersede or clear and must change nothing.
                if entries.get(&actor).map(|e| e.generation) == Some(generation) {
                    entries.remove(&actor);
                    debug!("pending command for {} expired", actor);
                }
            }
        });
        let mut entries = lock(&self.entries);
        let previous = entries.insert(
            actor,
            PendingEntry {
                command,
                generation,
                timer,
            },
        );
        if let Some(previous) = previous {
            previous.timer.abort();
        }
    }

    /// Cancel the timer and drop the entry. Idempotent.
    pub fn clear_pending(&self, actor: ActorId) {
        if let Some(entry) = lock(&self.entries).remove(&actor) {
            entry.timer.abort();
        }
    }

    /// Pure lookup, no side effects.
    pub fn has_pending(&self, actor: ActorId) -> bool {
        lock(&self.entries).contains_key(&actor)
    }

    /// Current pending command for `actor`, if any. Pure lookup.
    pub fn resolve(&self, actor: ActorId) -> Option<PendingCommand> {
        lock(&self.entries).get(&actor).map(|e| e.command.clone())
    }
}

impl Drop for PendingEngine {
    fn drop(&mut self) {
        for entry in lock(&self.entries).values() {
            entry.timer.abort();
        }
    }
}
