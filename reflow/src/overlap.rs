/// Strategy for a new attempt requested while a previous one may still be in
/// flight. Fixed per resource at construction time.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum OverlapPolicy {
    /// Cancel the in-flight attempt and start the new one. Only the most
    /// recently started attempt's outcome is ever applied.
    #[default]
    Switch,
    /// Let attempts run concurrently; outcomes apply in completion order.
    Merge,
    /// Queue the new attempt; start it only after the current one settles.
    Concat,
    /// Drop the request entirely while an attempt is in flight.
    Exhaust,
}

/// What the resource driver should do with a trigger request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TriggerDecision {
    /// Start an attempt tagged with `generation`, after invalidating the
    /// generations in `cancel` (non-empty only under `Switch`).
    Start { generation: u64, cancel: Vec<u64> },
    /// `Concat` while busy: park the request until the current attempt settles.
    Queue,
    /// `Exhaust` while busy: the request is a no-op.
    Drop,
}

/// Pure overlap bookkeeping: monotonic generation counter plus the set of
/// generations whose outcome is still allowed to touch state.
///
/// The generation check in [`AttemptTracker::on_settle`] is the authoritative
/// stale-suppression guard; cancellation tokens only stop wasted work.
#[derive(Debug)]
pub struct AttemptTracker {
    policy: OverlapPolicy,
    next_generation: u64,
    live: Vec<u64>,
}

impl AttemptTracker {
    pub fn new(policy: OverlapPolicy) -> Self {
        AttemptTracker {
            policy,
            next_generation: 1,
            live: Vec::new(),
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn is_busy(&self) -> bool {
        !self.live.is_empty()
    }

    fn start(&mut self, cancel: Vec<u64>) -> TriggerDecision {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.live.push(generation);
        TriggerDecision::Start { generation, cancel }
    }

    pub fn on_trigger(&mut self) -> TriggerDecision {
        match self.policy {
            OverlapPolicy::Switch => {
                let stale = std::mem::take(&mut self.live);
                self.start(stale)
            }
            OverlapPolicy::Merge => self.start(Vec::new()),
            OverlapPolicy::Concat => {
                if self.is_busy() {
                    TriggerDecision::Queue
                } else {
                    self.start(Vec::new())
                }
            }
            OverlapPolicy::Exhaust => {
                if self.is_busy() {
                    TriggerDecision::Drop
                } else {
                    self.start(Vec::new())
                }
            }
        }
    }

    /// Start a previously queued attempt (`Concat` drain). Must only be
    /// called while idle.
    pub fn on_queued_start(&mut self) -> TriggerDecision {
        debug_assert!(!self.is_busy());
        self.start(Vec::new())
    }

    /// Whether the outcome of `generation` may be applied. A stale or
    /// cancelled generation settles to a no-op.
    pub fn on_settle(&mut self, generation: u64) -> bool {
        match self.live.iter().position(|g| *g == generation) {
            Some(index) => {
                self.live.remove(index);
                true
            }
            None => false,
        }
    }
}
