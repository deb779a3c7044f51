//! BroadcastSignal - per-consumer wait/clear slots behind one mutex

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use contracts::{ConsumerId, FaultKind, ReapPolicy};
use tracing::{debug, trace};

/// Default window after which an unacknowledged slot is reaped
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A publish happened since the last acknowledgment
    Signaled,
    /// The timeout elapsed first
    TimedOut,
    /// [`BroadcastSignal::interrupt`] was called while waiting
    Interrupted,
}

/// What a single publish did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Slots flipped from waiting to ready
    pub signaled: usize,
    /// Consumers removed as stale
    pub reaped: Vec<ConsumerId>,
}

#[derive(Debug)]
struct SignalSlot {
    ready: bool,
    last_signaled_at: Instant,
}

impl SignalSlot {
    fn new() -> Self {
        Self {
            ready: false,
            last_signaled_at: Instant::now(),
        }
    }
}

#[derive(Debug, Default)]
struct SignalState {
    slots: HashMap<ConsumerId, SignalSlot>,
    /// Bumped by `interrupt`, lets bounded waits notice it
    interrupts: u64,
}

/// One-to-many notification gate keyed by consumer identity.
///
/// All slot mutations (lazy insert, acknowledge, publish, reap) are
/// serialized under a single mutex. The lock is only held to flip flags;
/// waiting happens on the condition variable, which releases it.
#[derive(Debug)]
pub struct BroadcastSignal {
    state: Mutex<SignalState>,
    wakeup: Condvar,
    stale_timeout: Duration,
    reap_policy: ReapPolicy,
}

impl BroadcastSignal {
    /// Signal with the default 5s stale timeout and one-per-publish reaping
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_STALE_TIMEOUT, ReapPolicy::default())
    }

    /// Signal with explicit staleness settings
    pub fn with_policy(stale_timeout: Duration, reap_policy: ReapPolicy) -> Self {
        Self {
            state: Mutex::new(SignalState::default()),
            wakeup: Condvar::new(),
            stale_timeout,
            reap_policy,
        }
    }

    /// Configured stale timeout
    pub fn stale_timeout(&self) -> Duration {
        self.stale_timeout
    }

    /// Configured reap policy
    pub fn reap_policy(&self) -> ReapPolicy {
        self.reap_policy
    }

    // A panicking holder cannot leave the map half-updated: every critical
    // section is a flag flip or a single insert/remove.
    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the slot for `id` without waiting.
    ///
    /// Returns `true` if the slot was created. Registering before the
    /// producer starts guarantees the first publish is not missed.
    pub fn register(&self, id: ConsumerId) -> bool {
        let mut state = self.lock();
        if state.slots.contains_key(&id) {
            return false;
        }
        state.slots.insert(id, SignalSlot::new());
        trace!(consumer_id = %id, "signal slot registered");
        true
    }

    /// Block until a publish happened since `id`'s last acknowledgment.
    ///
    /// Allocates the slot on first use. Returns immediately if a publish is
    /// already pending for `id`.
    pub fn await_next(&self, id: ConsumerId) {
        let mut state = self.lock();
        state.slots.entry(id).or_insert_with(SignalSlot::new);

        loop {
            match state.slots.get(&id) {
                Some(slot) if !slot.ready => {}
                // Only ready slots get reaped, so a missing slot was signalled.
                _ => return,
            }
            state = self
                .wakeup
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`await_next`](Self::await_next) but gives up after `timeout`
    /// and returns early on [`interrupt`](Self::interrupt).
    pub fn await_next_timeout(&self, id: ConsumerId, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        let interrupts_seen = state.interrupts;
        state.slots.entry(id).or_insert_with(SignalSlot::new);

        loop {
            match state.slots.get(&id) {
                Some(slot) if !slot.ready => {}
                _ => return WaitOutcome::Signaled,
            }
            if state.interrupts != interrupts_seen {
                return WaitOutcome::Interrupted;
            }

            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }

            let (guard, _) = self
                .wakeup
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Re-arm `id` so the next publish wakes it again.
    ///
    /// Must be called after the published value was consumed. Unknown ids
    /// (never registered, or already reaped) are ignored.
    pub fn acknowledge(&self, id: ConsumerId) {
        let mut state = self.lock();
        match state.slots.get_mut(&id) {
            Some(slot) => slot.ready = false,
            None => trace!(consumer_id = %id, "acknowledge for unknown slot"),
        }
    }

    /// Announce a new value to every waiting consumer
    pub fn publish(&self) -> PublishReport {
        self.publish_at(Instant::now())
    }

    /// [`publish`](Self::publish) with an explicit clock reading.
    ///
    /// Slots not yet ready are flipped to ready and stamped with `now`.
    /// Slots still ready from an earlier publish are checked for staleness;
    /// depending on the reap policy one or all stale slots are removed.
    pub fn publish_at(&self, now: Instant) -> PublishReport {
        let mut report = PublishReport::default();
        {
            let mut state = self.lock();
            let mut stale = Vec::new();

            for (id, slot) in state.slots.iter_mut() {
                if !slot.ready {
                    slot.ready = true;
                    slot.last_signaled_at = now;
                    report.signaled += 1;
                } else if now.saturating_duration_since(slot.last_signaled_at) > self.stale_timeout
                {
                    stale.push(*id);
                }
            }

            if self.reap_policy == ReapPolicy::OnePerPublish {
                stale.truncate(1);
            }
            for id in &stale {
                state.slots.remove(id);
            }
            report.reaped = stale;
        }

        for id in &report.reaped {
            debug!(
                consumer_id = %id,
                fault = %FaultKind::ConsumerStaleness,
                stale_timeout_ms = self.stale_timeout.as_millis() as u64,
                "reaped unacknowledged consumer"
            );
        }

        self.wakeup.notify_all();
        report
    }

    /// Wake every waiter without signalling any slot.
    ///
    /// Bounded waiters return [`WaitOutcome::Interrupted`]; unbounded
    /// waiters go back to sleep.
    pub fn interrupt(&self) {
        {
            let mut state = self.lock();
            state.interrupts = state.interrupts.wrapping_add(1);
        }
        self.wakeup.notify_all();
    }

    /// Drop the slot of a consumer known to be gone.
    ///
    /// Returns `true` if a slot was removed.
    pub fn remove(&self, id: ConsumerId) -> bool {
        self.lock().slots.remove(&id).is_some()
    }

    /// Number of live slots
    pub fn slot_count(&self) -> usize {
        self.lock().slots.len()
    }

    /// Whether `id` currently has a slot
    pub fn contains(&self, id: ConsumerId) -> bool {
        self.lock().slots.contains_key(&id)
    }

    /// Ready flag of `id`, `None` if it has no slot
    pub fn is_ready(&self, id: ConsumerId) -> Option<bool> {
        self.lock().slots.get(&id).map(|slot| slot.ready)
    }
}

impl Default for BroadcastSignal {
    fn default() -> Self {
        Self::new()
    }
}
