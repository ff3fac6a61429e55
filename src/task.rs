use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::SectionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Start,
    Finished,
    Error,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Start)
    }
}

/// A background fetch or mutation, tracked by a deterministic id.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub start_text: String,
    pub finished_text: String,
    pub state: TaskState,
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    pub finished_time: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<String>, start_text: impl Into<String>, finished_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_text: start_text.into(),
            finished_text: finished_text.into(),
            state: TaskState::Start,
            error: None,
            start_time: Utc::now(),
            finished_time: None,
        }
    }

    /// Text for the footer in the task's current state.
    pub fn status_text(&self) -> &str {
        match self.state {
            TaskState::Start => &self.start_text,
            TaskState::Finished => &self.finished_text,
            TaskState::Error => self.error.as_deref().unwrap_or("failed"),
        }
    }
}

/// Emitted whenever a task changes state, for the footer and spinner.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatusEvent {
    pub task_id: String,
    pub section_id: usize,
    pub state: TaskState,
    pub text: String,
}

#[derive(Debug, Clone)]
struct Tracked {
    section_id: usize,
    task: Task,
}

impl Tracked {
    fn status(&self) -> TaskStatusEvent {
        TaskStatusEvent {
            task_id: self.task.id.clone(),
            section_id: self.section_id,
            state: self.task.state,
            text: self.task.status_text().to_string(),
        }
    }
}

/// Bookkeeping for running and recently finished tasks.
///
/// The registry never runs or polls anything. It records state transitions
/// reported by the update loop so the footer can show what is going on.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Tracked>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `task` as running. A task with the same id is replaced.
    pub fn start(&mut self, section_id: usize, mut task: Task) {
        task.state = TaskState::Start;
        task.error = None;
        task.finished_time = None;
        tracing::info!(id = %task.id, section = section_id, "task started");
        self.tasks.insert(task.id.clone(), Tracked { section_id, task });
    }

    /// Moves a task into `Finished` or `Error`. Returns false for unknown ids.
    pub fn finish(&mut self, id: &str, error: Option<String>) -> bool {
        let Some(tracked) = self.tasks.get_mut(id) else {
            return false;
        };
        let task = &mut tracked.task;
        task.finished_time = Some(Utc::now());
        match error {
            Some(err) => {
                tracing::warn!(id, error = %err, "task failed");
                task.state = TaskState::Error;
                task.error = Some(err);
            }
            None => {
                tracing::info!(id, "task finished");
                task.state = TaskState::Finished;
            }
        }
        true
    }

    /// Drops a finished task, but only the run that finished at
    /// `finished_time`. A task restarted under the same id is kept.
    pub fn clear(&mut self, id: &str, finished_time: DateTime<Utc>) -> bool {
        let stale = self
            .tasks
            .get(id)
            .is_some_and(|t| t.task.state.is_terminal() && t.task.finished_time == Some(finished_time));
        if stale {
            self.tasks.remove(id);
        }
        stale
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id).map(|t| &t.task)
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.get(id).is_some_and(|t| t.state == TaskState::Start)
    }

    pub fn running_count(&self) -> usize {
        self.tasks.values().filter(|t| !t.task.state.is_terminal()).count()
    }

    /// Status of the task the footer should show: the most recently started
    /// running task, otherwise the most recently finished one.
    pub fn current_status(&self) -> Option<TaskStatusEvent> {
        let running = self
            .tasks
            .values()
            .filter(|t| t.task.state == TaskState::Start)
            .max_by_key(|t| t.task.start_time);
        running
            .or_else(|| {
                self.tasks
                    .values()
                    .filter(|t| t.task.state.is_terminal())
                    .max_by_key(|t| t.task.finished_time)
            })
            .map(Tracked::status)
    }
}

/// Id for fetching the page that follows `cursor` in section `section_id`.
/// The first page has no cursor and gets a timestamp instead.
pub fn fetch_task_id(kind: SectionKind, section_id: usize, cursor: Option<&str>) -> String {
    let cursor = match cursor {
        Some(c) => c.to_string(),
        None => Utc::now().format("%Y%m%dT%H%M%S%.9f").to_string(),
    };
    format!("fetching_{}_{}_{}", kind.plural(), section_id, cursor)
}
