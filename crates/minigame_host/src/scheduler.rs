//! Tick-counted task scheduler.
//!
//! All timers in the plugin are expressed as "run after N ticks" or "run
//! every N ticks" against the host's cooperative tick loop; there are no
//! wall-clock sleeps. Cancellation is explicit through [`TaskHandle`] and
//! idempotent. A panicking or erroring job never stops the scheduler from
//! running the remaining and future jobs.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

type Job = Box<dyn FnMut() + Send>;

/// Handle to a scheduled task. Dropping the handle does NOT cancel the task;
/// cancellation is always an explicit call.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Cancel the task. Safe to call any number of times, from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

enum Repeat {
    Once,
    Every(u64),
}

struct ScheduledTask {
    due: u64,
    repeat: Repeat,
    cancelled: Arc<AtomicBool>,
    job: Job,
}

/// The scheduler. Owned by the host; `advance` is called exactly once per
/// host tick, on the tick thread.
pub struct TickScheduler {
    current: AtomicU64,
    tasks: Mutex<Vec<ScheduledTask>>,
    queued: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
            tasks: Mutex::new(Vec::new()),
            queued: Mutex::new(Vec::new()),
        }
    }

    /// The current tick count since host start.
    pub fn current_tick(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Run `job` once, `delay` ticks from now. A delay of 0 runs on the
    /// next tick.
    pub fn run_later<F>(&self, delay: u64, job: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut job = Some(job);
        self.tasks.lock().expect("scheduler poisoned").push(ScheduledTask {
            due: self.current_tick() + delay.max(1),
            repeat: Repeat::Once,
            cancelled: Arc::clone(&cancelled),
            job: Box::new(move || {
                if let Some(job) = job.take() {
                    job();
                }
            }),
        });
        TaskHandle { cancelled }
    }

    /// Run `job` every `interval` ticks, starting `interval` ticks from now,
    /// until the returned handle is cancelled.
    pub fn run_repeating<F>(&self, interval: u64, job: F) -> TaskHandle
    where
        F: FnMut() + Send + 'static,
    {
        let interval = interval.max(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        self.tasks.lock().expect("scheduler poisoned").push(ScheduledTask {
            due: self.current_tick() + interval,
            repeat: Repeat::Every(interval),
            cancelled: Arc::clone(&cancelled),
            job: Box::new(job),
        });
        TaskHandle { cancelled }
    }

    /// Queue a closure for the start of the next tick.
    ///
    /// This is the re-marshal point for async work: network callbacks hand
    /// their results back to the tick thread through here and never touch
    /// game state directly.
    pub fn run_next_tick<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queued.lock().expect("scheduler poisoned").push(Box::new(job));
    }

    /// Advance the clock by one tick and run everything that came due.
    ///
    /// Jobs run outside the internal lock so they are free to schedule
    /// further tasks.
    pub fn advance(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;

        let mut due: Vec<ScheduledTask> = Vec::new();
        {
            let mut tasks = self.tasks.lock().expect("scheduler poisoned");
            tasks.retain(|t| !t.cancelled.load(Ordering::SeqCst));
            let mut i = 0;
            while i < tasks.len() {
                if tasks[i].due <= now {
                    due.push(tasks.swap_remove(i));
                } else {
                    i += 1;
                }
            }
        }

        trace!(tick = now, due = due.len(), "scheduler advance");
        for mut task in due {
            if task.cancelled.load(Ordering::SeqCst) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| (task.job)())).is_err() {
                // A panicking repeating task is dropped, not re-armed.
                warn!(tick = now, "scheduled task panicked");
                continue;
            }
            if let Repeat::Every(interval) = task.repeat {
                if !task.cancelled.load(Ordering::SeqCst) {
                    task.due = now + interval;
                    self.tasks.lock().expect("scheduler poisoned").push(task);
                }
            }
        }

        let queued: Vec<_> = std::mem::take(&mut *self.queued.lock().expect("scheduler poisoned"));
        for job in queued {
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                warn!(tick = now, "queued closure panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counter() -> (Arc<AtomicU32>, impl Fn() + Send + 'static) {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn run_later_fires_once_at_due_tick() {
        let sched = TickScheduler::new();
        let (count, job) = counter();
        sched.run_later(3, job);

        sched.advance();
        sched.advance();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sched.advance();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        sched.advance();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeating_task_fires_until_cancelled() {
        let sched = TickScheduler::new();
        let (count, job) = counter();
        let handle = sched.run_repeating(2, job);

        for _ in 0..6 {
            sched.advance();
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.cancel();
        handle.cancel(); // idempotent
        for _ in 0..4 {
            sched.advance();
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cancel_before_due_suppresses_the_task() {
        let sched = TickScheduler::new();
        let (count, job) = counter();
        let handle = sched.run_later(1, job);
        handle.cancel();
        sched.advance();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_task_does_not_stop_the_rest() {
        let sched = TickScheduler::new();
        sched.run_later(1, || panic!("boom"));
        let (count, job) = counter();
        sched.run_later(1, job);

        sched.advance();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // The scheduler keeps working on later ticks too.
        let (count, job) = counter();
        sched.run_later(1, job);
        sched.advance();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_repeating_task_is_dropped() {
        let sched = TickScheduler::new();
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        sched.run_repeating(1, move || {
            c.fetch_add(1, Ordering::SeqCst);
            panic!("boom");
        });

        for _ in 0..3 {
            sched.advance();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn job_can_reschedule_itself() {
        let sched = Arc::new(TickScheduler::new());
        let count = Arc::new(AtomicU32::new(0));
        let sched2 = Arc::clone(&sched);
        let count2 = Arc::clone(&count);
        sched.run_later(1, move || {
            count2.fetch_add(1, Ordering::SeqCst);
            let count3 = Arc::clone(&count2);
            sched2.run_later(1, move || {
                count3.fetch_add(1, Ordering::SeqCst);
            });
        });

        sched.advance();
        sched.advance();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn next_tick_queue_drains_after_timers() {
        let sched = TickScheduler::new();
        let (count, job) = counter();
        sched.run_next_tick(job);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        sched.advance();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
