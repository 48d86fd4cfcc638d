//! Single-threaded delay queue on a virtual millisecond clock.
//!
//! Tasks come back out of [`Scheduler::pop_due`] in deadline order, with ties
//! broken by insertion order. Cancelled tasks are dropped lazily when they
//! reach the front of the queue.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Milliseconds on the presenter's clock.
pub type Millis = u64;

/// Handle returned when scheduling a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug)]
struct Entry<T> {
    task: T,
    deadline: Millis,
    /// Re-arm interval for repeating tasks.
    interval: Option<Millis>,
}

/// Deadline-ordered queue of pending tasks.
#[derive(Debug)]
pub struct Scheduler<T> {
    queue: BinaryHeap<Reverse<(Millis, u64, TaskId)>>,
    entries: HashMap<TaskId, Entry<T>>,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            queue: BinaryHeap::new(),
            entries: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once at `deadline`.
    pub fn schedule_once(&mut self, task: T, deadline: Millis) -> TaskId {
        self.insert(task, deadline, None)
    }

    /// Run `task` every `interval` ms, first at `start + interval`.
    pub fn schedule_repeating(&mut self, task: T, start: Millis, interval: Millis) -> TaskId {
        let interval = interval.max(1);
        self.insert(task, start.saturating_add(interval), Some(interval))
    }

    /// Cancel a task. Unknown or already finished ids are ignored.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest deadline among live tasks.
    pub fn next_deadline(&mut self) -> Option<Millis> {
        self.discard_cancelled();
        self.queue.peek().map(|Reverse((deadline, _, _))| *deadline)
    }

    /// Take the next task due at or before `now`.
    ///
    /// Repeating tasks are re-armed at their previous deadline plus interval
    /// before being returned, so a caller can cancel them from the handler.
    pub fn pop_due(&mut self, now: Millis) -> Option<(TaskId, T, Millis)> {
        self.discard_cancelled();

        let Reverse((deadline, _, id)) = *self.queue.peek()?;
        if deadline > now {
            return None;
        }
        self.queue.pop();

        let entry = self.entries.get(&id)?;
        let task = entry.task.clone();

        match entry.interval {
            Some(interval) => {
                let next = deadline.saturating_add(interval);
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.deadline = next;
                }
                let seq = self.bump_seq();
                self.queue.push(Reverse((next, seq, id)));
            }
            None => {
                self.entries.remove(&id);
            }
        }

        Some((id, task, deadline))
    }

    fn insert(&mut self, task: T, deadline: Millis, interval: Option<Millis>) -> TaskId {
        let seq = self.bump_seq();
        let id = TaskId(seq);
        self.entries.insert(
            id,
            Entry {
                task,
                deadline,
                interval,
            },
        );
        self.queue.push(Reverse((deadline, seq, id)));
        id
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Drop queue heads whose task was cancelled or re-armed elsewhere.
    fn discard_cancelled(&mut self) {
        while let Some(&Reverse((deadline, _, id))) = self.queue.peek() {
            match self.entries.get(&id) {
                Some(entry) if entry.deadline == deadline => break,
                _ => {
                    self.queue.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut Scheduler<&'static str>, now: Millis) -> Vec<&'static str> {
        let mut fired = Vec::new();
        while let Some((_, task, _)) = scheduler.pop_due(now) {
            fired.push(task);
        }
        fired
    }

    #[test]
    fn test_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once("late", 300);
        scheduler.schedule_once("early", 100);
        scheduler.schedule_once("middle", 200);

        assert_eq!(scheduler.next_deadline(), Some(100));
        assert_eq!(drain(&mut scheduler, 250), vec!["early", "middle"]);
        assert_eq!(drain(&mut scheduler, 300), vec!["late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_ties_are_fifo() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once("first", 100);
        scheduler.schedule_once("second", 100);
        scheduler.schedule_once("third", 100);

        assert_eq!(drain(&mut scheduler, 100), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_nothing_due_before_deadline() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once("task", 100);
        assert!(scheduler.pop_due(99).is_none());
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_once("cancelled", 100);
        scheduler.schedule_once("kept", 200);

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.next_deadline(), Some(200));
        assert_eq!(drain(&mut scheduler, 1_000), vec!["kept"]);
    }

    #[test]
    fn test_cancel_unknown_is_noop() {
        let mut scheduler: Scheduler<&str> = Scheduler::new();
        assert!(!scheduler.cancel(TaskId(42)));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_repeating_rearms() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_repeating("tick", 0, 1_000);

        assert!(scheduler.pop_due(999).is_none());
        assert_eq!(scheduler.pop_due(1_000).map(|(_, t, d)| (t, d)), Some(("tick", 1_000)));
        assert_eq!(scheduler.next_deadline(), Some(2_000));

        // Catch up on missed ticks one at a time.
        assert_eq!(drain(&mut scheduler, 4_500), vec!["tick", "tick", "tick"]);

        scheduler.cancel(id);
        assert!(scheduler.pop_due(u64::MAX).is_none());
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_repeating_interval_never_zero() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_repeating("tick", 10, 0);
        assert_eq!(scheduler.next_deadline(), Some(11));
    }
}
