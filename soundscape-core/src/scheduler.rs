//! Cancelable delayed tasks for the single owning playback thread.
//!
//! Burst replays and fade steps are not closures: they are small [`Task`]
//! values addressed to a sound id and dispatched by
//! [`crate::playback::PlaybackManager::run_pending`]. Every task gets a fresh,
//! monotonically increasing [`TaskId`]; owners remember the id they are waiting
//! for, so a task that was canceled (or replaced) and still fires is ignored.
//!
//! The scheduler is `Rc`-based and therefore `!Send`; it cannot leak onto
//! another thread.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time since the clock was created.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Used for simulation and tests.
#[derive(Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Identifier of a scheduled task. Doubles as the generation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// What a task asks its owner to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Re-render a burst sound.
    Replay,
    /// Advance an in-flight volume fade by one step.
    FadeStep,
}

/// A due task, routed to the player that owns `sound_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub sound_id: String,
    pub kind: TaskKind,
}

/// Snapshot of a task still waiting in the queue.
#[derive(Debug, Clone)]
pub struct PendingTask {
    pub task: Task,
    /// Absolute due time on the scheduler's clock.
    pub due: Duration,
    /// Delay requested when the task was scheduled.
    pub delay: Duration,
}

#[derive(Default)]
struct Queue {
    next_id: u64,
    by_due: BTreeMap<(Duration, TaskId), Task>,
    index: HashMap<TaskId, (Duration, Duration)>,
}

/// Shared handle to the delayed-task queue. Clones refer to the same queue.
#[derive(Clone)]
pub struct Scheduler {
    clock: Rc<dyn Clock>,
    queue: Rc<RefCell<Queue>>,
}

impl Scheduler {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            queue: Rc::new(RefCell::new(Queue::default())),
        }
    }

    /// Creates a scheduler driven by [`SystemClock`].
    pub fn with_system_clock() -> Self {
        Self::new(Rc::new(SystemClock::new()))
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Schedules `kind` for `sound_id` after `delay` and returns its id.
    pub fn schedule(&self, sound_id: &str, kind: TaskKind, delay: Duration) -> TaskId {
        let due = self.clock.now() + delay;
        let mut queue = self.queue.borrow_mut();
        queue.next_id += 1;
        let id = TaskId(queue.next_id);
        queue.by_due.insert(
            (due, id),
            Task {
                id,
                sound_id: sound_id.to_string(),
                kind,
            },
        );
        queue.index.insert(id, (due, delay));
        tracing::trace!("Scheduled {:?} {:?} for '{}' in {:?}", kind, id, sound_id, delay);
        id
    }

    /// Removes a task from the queue. Returns false if it already ran or was canceled.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut queue = self.queue.borrow_mut();
        match queue.index.remove(&id) {
            Some((due, _)) => queue.by_due.remove(&(due, id)).is_some(),
            None => false,
        }
    }

    /// Removes and returns every task due at the current time, oldest first.
    pub fn take_due(&self) -> Vec<Task> {
        let now = self.clock.now();
        let mut queue = self.queue.borrow_mut();
        let mut due = Vec::new();
        while let Some((at, id)) = queue.by_due.keys().next().copied() {
            if at > now {
                break;
            }
            if let Some(task) = queue.by_due.remove(&(at, id)) {
                queue.index.remove(&id);
                due.push(task);
            }
        }
        due
    }

    /// Due time of the earliest pending task.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue
            .borrow()
            .by_due
            .keys()
            .next()
            .map(|(due, _)| *due)
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.queue.borrow().index.contains_key(&id)
    }

    /// Snapshot of all pending tasks ordered by due time.
    pub fn pending(&self) -> Vec<PendingTask> {
        let queue = self.queue.borrow();
        queue
            .by_due
            .iter()
            .map(|((due, id), task)| PendingTask {
                task: task.clone(),
                due: *due,
                delay: queue.index.get(id).map(|(_, delay)| *delay).unwrap_or_default(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().by_due.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
