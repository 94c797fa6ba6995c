use crate::types::{Task, TaskPriority, TaskStatus};
use overseer_core::{OverseerError, OverseerResult};
use std::collections::VecDeque;
use uuid::Uuid;

struct Entry {
    seq: u64,
    task: Task,
}

/// Bounded queue of pending tasks.
///
/// Dequeue picks the lowest `(priority, insertion sequence)` by scanning the
/// entries each time, so a Critical task that arrives after a backlog of Low
/// tasks is served first, and tasks of equal priority leave in FIFO order.
/// There is no aging: low-priority tasks can starve under a steady stream of
/// urgent ones.
pub struct TaskQueue {
    entries: VecDeque<Entry>,
    capacity: usize,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            next_seq: 0,
        }
    }

    /// Add a task. Fails with [`OverseerError::QueueFull`] at capacity, and
    /// with a validation error if the task is not pending or already queued.
    pub fn enqueue(&mut self, task: Task) -> OverseerResult<Uuid> {
        if self.entries.len() >= self.capacity {
            return Err(OverseerError::QueueFull {
                capacity: self.capacity,
            });
        }
        if task.status() != TaskStatus::Pending {
            return Err(OverseerError::Validation(format!(
                "task {} is {}, only pending tasks can be queued",
                task.id,
                task.status()
            )));
        }
        if self.contains(task.id) {
            return Err(OverseerError::Validation(format!(
                "task {} is already queued",
                task.id
            )));
        }

        let id = task.id;
        self.entries.push_back(Entry {
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
        Ok(id)
    }

    /// Remove and return the most urgent task, oldest first among equals.
    pub fn dequeue(&mut self) -> Option<Task> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| (e.task.priority(), e.seq))
            .map(|(i, _)| i)?;
        self.entries.remove(idx).map(|e| e.task)
    }

    /// Priority of the task the next [`dequeue`](Self::dequeue) would return.
    pub fn peek_priority(&self) -> Option<TaskPriority> {
        self.entries.iter().map(|e| e.task.priority()).min()
    }

    /// Remove a specific pending task (used by cancellation).
    pub fn remove(&mut self, id: Uuid) -> Option<Task> {
        let idx = self.entries.iter().position(|e| e.task.id == id)?;
        self.entries.remove(idx).map(|e| e.task)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.iter().any(|e| e.task.id == id)
    }

    /// Pending tasks in insertion order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.entries.iter().map(|e| e.task.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::AgentType;

    fn task(priority: TaskPriority, description: &str) -> Task {
        Task::new(AgentType::DecisionMaker, priority, description)
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = TaskQueue::new(10);
        assert!(queue.is_empty());
        assert!(queue.dequeue().is_none());
        assert!(queue.peek_priority().is_none());
    }

    #[test]
    fn test_priority_order() {
        let mut queue = TaskQueue::new(10);
        queue.enqueue(task(TaskPriority::Low, "low")).unwrap();
        queue.enqueue(task(TaskPriority::Critical, "critical")).unwrap();
        queue.enqueue(task(TaskPriority::Medium, "medium")).unwrap();

        let order: Vec<String> = std::iter::from_fn(|| queue.dequeue())
            .map(|t| t.description)
            .collect();
        assert_eq!(order, vec!["critical", "medium", "low"]);
    }

    #[test]
    fn test_fifo_among_equal_priorities() {
        let mut queue = TaskQueue::new(10);
        for i in 0..5 {
            queue.enqueue(task(TaskPriority::High, &format!("t{i}"))).unwrap();
        }
        for i in 0..5 {
            assert_eq!(queue.dequeue().unwrap().description, format!("t{i}"));
        }
    }

    #[test]
    fn test_late_critical_preempts_backlog() {
        let mut queue = TaskQueue::new(10);
        queue.enqueue(task(TaskPriority::Medium, "m1")).unwrap();
        queue.enqueue(task(TaskPriority::Low, "l1")).unwrap();
        assert_eq!(queue.dequeue().unwrap().description, "m1");

        queue.enqueue(task(TaskPriority::Critical, "c1")).unwrap();
        assert_eq!(queue.peek_priority(), Some(TaskPriority::Critical));
        assert_eq!(queue.dequeue().unwrap().description, "c1");
        assert_eq!(queue.dequeue().unwrap().description, "l1");
    }

    #[test]
    fn test_capacity_rejects_with_queue_full() {
        let mut queue = TaskQueue::new(2);
        queue.enqueue(task(TaskPriority::Low, "a")).unwrap();
        queue.enqueue(task(TaskPriority::Low, "b")).unwrap();
        assert!(queue.is_full());

        let err = queue.enqueue(task(TaskPriority::Critical, "c")).unwrap_err();
        assert!(matches!(err, OverseerError::QueueFull { capacity: 2 }));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_rejects_duplicate_and_started_tasks() {
        let mut queue = TaskQueue::new(10);
        let t = task(TaskPriority::Low, "dup");
        queue.enqueue(t.clone()).unwrap();
        assert!(queue.enqueue(t).is_err());

        let mut started = task(TaskPriority::Low, "started");
        started.start().unwrap();
        assert!(queue.enqueue(started).is_err());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_specific_task() {
        let mut queue = TaskQueue::new(10);
        let keep = queue.enqueue(task(TaskPriority::Low, "keep")).unwrap();
        let dropped = queue.enqueue(task(TaskPriority::High, "drop")).unwrap();

        assert_eq!(queue.remove(dropped).unwrap().description, "drop");
        assert!(queue.remove(dropped).is_none());
        assert!(queue.contains(keep));
        assert_eq!(queue.snapshot().len(), 1);
    }
}
