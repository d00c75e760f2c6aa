//! Bookkeeping for listener subscriptions and scheduled tasks owned by one
//! item or mob, so teardown can release them in one place.

use minigame_host::{Host, SubscriptionId, TaskHandle};

/// Subscriptions and tasks registered by a variant.
#[derive(Default)]
pub struct HookSet {
    pub subscriptions: Vec<SubscriptionId>,
    pub tasks: Vec<TaskHandle>,
}

impl HookSet {
    pub fn merge(&mut self, other: HookSet) {
        self.subscriptions.extend(other.subscriptions);
        self.tasks.extend(other.tasks);
    }

    /// Unsubscribe and cancel everything. Safe to call on an already
    /// released set.
    pub fn release(&mut self, host: &Host) {
        for subscription in self.subscriptions.drain(..) {
            host.events.unsubscribe(subscription);
        }
        for task in self.tasks.drain(..) {
            task.cancel();
        }
    }
}
