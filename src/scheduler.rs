//! Per-channel debouncing of deferred work.
//!
//! Each channel holds at most one pending action. Scheduling on a channel
//! that already has one replaces the action and restarts its delay, so a
//! steady stream of calls keeps pushing execution back. Channels are
//! independent of each other.
//!
//! The scheduler does not own a timer: the event loop asks for
//! [`Debouncer::take_ready`] on every tick and runs what comes back on its
//! own thread. [`Debouncer::drain`] hands out everything still pending,
//! which is what shutdown uses.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Logical channels used by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Terminal resized; persist the new window geometry.
    WindowGeometry,
    /// Tree pane width changed; persist the splitter position.
    Splitter,
    /// A watched directory changed; reload the tree.
    DirectoryRefresh,
    /// Tree rebuilt; re-apply the persisted expansion set.
    ExpansionRestore,
}

/// Deferred work carried by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SaveWindowGeometry { width: u16, height: u16 },
    SaveSplitter { position: u16 },
    RefreshTree,
    /// Restore expansion for the root with this normalized key.
    RestoreExpansion { root: String },
}

/// Scheduler used by the application event loop.
pub type Scheduler = Debouncer<Channel, Action>;

#[derive(Debug)]
struct Pending<A> {
    due: Instant,
    action: A,
}

/// Debouncer keyed by channel `K` carrying actions of type `A`.
#[derive(Debug)]
pub struct Debouncer<K, A> {
    pending: HashMap<K, Pending<A>>,
}

impl<K, A> Default for Debouncer<K, A> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash + std::fmt::Debug, A> Debouncer<K, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` on `channel` to run `delay` after `now`, replacing
    /// whatever was pending there.
    pub fn schedule(&mut self, channel: K, delay: Duration, action: A, now: Instant) {
        let restarted = self
            .pending
            .insert(
                channel,
                Pending {
                    due: now + delay,
                    action,
                },
            )
            .is_some();
        tracing::trace!(?channel, restarted, ?delay, "debounce scheduled");
    }

    /// Drop the pending action of `channel`, if any.
    pub fn cancel(&mut self, channel: K) -> Option<A> {
        self.pending.remove(&channel).map(|p| p.action)
    }

    #[cfg(test)]
    pub fn is_pending(&self, channel: K) -> bool {
        self.pending.contains_key(&channel)
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every action whose delay has elapsed at `now`,
    /// earliest deadline first.
    pub fn take_ready(&mut self, now: Instant) -> Vec<A> {
        let ready: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(channel, _)| *channel)
            .collect();
        self.take_sorted(ready)
    }

    /// Remove and return every pending action regardless of deadline,
    /// earliest deadline first.
    pub fn drain(&mut self) -> Vec<A> {
        let all: Vec<K> = self.pending.keys().copied().collect();
        self.take_sorted(all)
    }

    fn take_sorted(&mut self, channels: Vec<K>) -> Vec<A> {
        let mut taken: Vec<Pending<A>> = channels
            .into_iter()
            .filter_map(|channel| self.pending.remove(&channel))
            .collect();
        taken.sort_by_key(|p| p.due);
        taken.into_iter().map(|p| p.action).collect()
    }
}
