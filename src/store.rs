//! The typed domain store.
//!
//! Owns the three entity collections, generates identity fields, and
//! persists each collection through the injected `Storage` collaborator
//! with an independent debounced flush: a mutation schedules a delayed
//! save, and another mutation to the same collection within the quiescence
//! window cancels and reschedules it. There is no acknowledgment contract;
//! persistence is best effort.
//!
//! `apply_response` is the mutation-batch executor for a validated
//! `AiResponse`: creations first, then edit/delete commands in array order,
//! with no rollback across the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::{
    ActionItem, AiResponse, Command, CommandKind, ItemKind, Log, LogPatch, NewLog, NewSchedule,
    NewTask, PartialActionItem, Schedule, SchedulePatch, Task, TaskPatch,
};
use crate::search::{find_item_by_title, search_items};
use crate::storage::{Storage, LOGS_KEY, SCHEDULES_KEY, TASKS_KEY};

/// Quiescence window before a dirty collection is written out.
pub const FLUSH_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Tasks,
    Schedules,
    Logs,
}

impl Collection {
    fn key(self) -> &'static str {
        match self {
            Collection::Tasks => TASKS_KEY,
            Collection::Schedules => SCHEDULES_KEY,
            Collection::Logs => LOGS_KEY,
        }
    }

    fn index(self) -> usize {
        match self {
            Collection::Tasks => 0,
            Collection::Schedules => 1,
            Collection::Logs => 2,
        }
    }
}

pub struct DataStore {
    tasks: Vec<Task>,
    schedules: Vec<Schedule>,
    logs: Vec<Log>,
    storage: Arc<dyn Storage>,
    pending: [Option<JoinHandle<()>>; 3],
    debounce: Duration,
}

fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// A missing or unreadable record loads as empty; losing one collection must
/// not take the others down with it.
fn load_record<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Vec<T> {
    match storage.load(key) {
        Ok(Some(payload)) => match serde_json::from_str(&payload) {
            Ok(items) => items,
            Err(e) => {
                error!("discarding corrupt record {}: {}", key, e);
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            error!("failed to load record {}: {}", key, e);
            Vec::new()
        }
    }
}

impl DataStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let tasks = load_record(storage.as_ref(), TASKS_KEY);
        let schedules = load_record(storage.as_ref(), SCHEDULES_KEY);
        let logs = load_record(storage.as_ref(), LOGS_KEY);
        Self {
            tasks,
            schedules,
            logs,
            storage,
            pending: [None, None, None],
            debounce: FLUSH_DEBOUNCE,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    fn snapshot(&self, collection: Collection) -> Option<String> {
        fn encode<T: Serialize>(items: &[T], key: &str) -> Option<String> {
            match serde_json::to_string(items) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    error!("failed to serialize {}: {}", key, e);
                    None
                }
            }
        }
        match collection {
            Collection::Tasks => encode(&self.tasks, TASKS_KEY),
            Collection::Schedules => encode(&self.schedules, SCHEDULES_KEY),
            Collection::Logs => encode(&self.logs, LOGS_KEY),
        }
    }

    /// Cancel any pending flush for the collection and schedule a new one
    /// after the quiescence window. Outside a tokio runtime the snapshot is
    /// written through immediately.
    fn schedule_flush(&mut self, collection: Collection) {
        let Some(payload) = self.snapshot(collection) else {
            return;
        };
        let key = collection.key();

        if let Some(handle) = self.pending[collection.index()].take() {
            handle.abort();
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let storage = Arc::clone(&self.storage);
                let debounce = self.debounce;
                let handle = runtime.spawn(async move {
                    tokio::time::sleep(debounce).await;
                    if let Err(e) = storage.save(key, &payload) {
                        error!("failed to persist {}: {}", key, e);
                    }
                });
                self.pending[collection.index()] = Some(handle);
            }
            Err(_) => {
                if let Err(e) = self.storage.save(key, &payload) {
                    error!("failed to persist {}: {}", key, e);
                }
            }
        }
    }

    /// Drain every pending debounce and write all three collections now.
    /// Called before process exit so the quiescence window cannot eat the
    /// last mutations.
    pub fn flush_now(&mut self) {
        for handle in self.pending.iter_mut() {
            if let Some(handle) = handle.take() {
                handle.abort();
            }
        }
        for collection in [Collection::Tasks, Collection::Schedules, Collection::Logs] {
            if let Some(payload) = self.snapshot(collection) {
                if let Err(e) = self.storage.save(collection.key(), &payload) {
                    error!("failed to persist {}: {}", collection.key(), e);
                }
            }
        }
    }

    // Tasks

    pub fn add_task(&mut self, new: NewTask) {
        self.tasks.push(Task {
            id: generate_id("task"),
            title: new.title,
            tags: new.tags,
            priority: new.priority,
            completed: false,
            created_at: Utc::now(),
        });
        self.schedule_flush(Collection::Tasks);
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!("update_task: no task with id {}", id);
            return;
        };
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(tags) = patch.tags {
            task.tags = tags;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        self.schedule_flush(Collection::Tasks);
    }

    pub fn delete_task(&mut self, id: &str) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() != before {
            self.schedule_flush(Collection::Tasks);
        }
    }

    pub fn toggle_task_completion(&mut self, id: &str) {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!("toggle_task_completion: no task with id {}", id);
            return;
        };
        task.completed = !task.completed;
        self.schedule_flush(Collection::Tasks);
    }

    pub fn search_tasks(&self, query: &str) -> Vec<&Task> {
        search_items(&self.tasks, query)
    }

    pub fn find_task_by_title(&self, title: &str) -> Option<&Task> {
        find_item_by_title(&self.tasks, title)
    }

    // Schedules

    pub fn add_schedule(&mut self, new: NewSchedule) {
        self.schedules.push(Schedule {
            id: generate_id("schedule"),
            title: new.title,
            date: new.date,
            tags: new.tags,
            priority: new.priority,
            created_at: Utc::now(),
        });
        self.schedule_flush(Collection::Schedules);
    }

    pub fn update_schedule(&mut self, id: &str, patch: SchedulePatch) {
        let Some(schedule) = self.schedules.iter_mut().find(|s| s.id == id) else {
            debug!("update_schedule: no schedule with id {}", id);
            return;
        };
        if let Some(title) = patch.title {
            schedule.title = title;
        }
        if let Some(date) = patch.date {
            schedule.date = date;
        }
        if let Some(tags) = patch.tags {
            schedule.tags = tags;
        }
        if let Some(priority) = patch.priority {
            schedule.priority = priority;
        }
        self.schedule_flush(Collection::Schedules);
    }

    pub fn delete_schedule(&mut self, id: &str) {
        let before = self.schedules.len();
        self.schedules.retain(|s| s.id != id);
        if self.schedules.len() != before {
            self.schedule_flush(Collection::Schedules);
        }
    }

    pub fn search_schedules(&self, query: &str) -> Vec<&Schedule> {
        search_items(&self.schedules, query)
    }

    pub fn find_schedule_by_title(&self, title: &str) -> Option<&Schedule> {
        find_item_by_title(&self.schedules, title)
    }

    // Logs

    pub fn add_log(&mut self, new: NewLog) {
        self.logs.push(Log {
            id: generate_id("log"),
            title: new.title,
            tags: new.tags,
            priority: new.priority,
            created_at: Utc::now(),
        });
        self.schedule_flush(Collection::Logs);
    }

    pub fn update_log(&mut self, id: &str, patch: LogPatch) {
        let Some(log) = self.logs.iter_mut().find(|l| l.id == id) else {
            debug!("update_log: no log with id {}", id);
            return;
        };
        if let Some(title) = patch.title {
            log.title = title;
        }
        if let Some(tags) = patch.tags {
            log.tags = tags;
        }
        if let Some(priority) = patch.priority {
            log.priority = priority;
        }
        self.schedule_flush(Collection::Logs);
    }

    pub fn delete_log(&mut self, id: &str) {
        let before = self.logs.len();
        self.logs.retain(|l| l.id != id);
        if self.logs.len() != before {
            self.schedule_flush(Collection::Logs);
        }
    }

    pub fn search_logs(&self, query: &str) -> Vec<&Log> {
        search_items(&self.logs, query)
    }

    pub fn find_log_by_title(&self, title: &str) -> Option<&Log> {
        find_item_by_title(&self.logs, title)
    }

    // Batch execution

    /// Apply a validated response: every creation first, then every command,
    /// each in array order. A schedule action without a date is skipped; a
    /// command whose target cannot be resolved is skipped. Earlier mutations
    /// stay applied when a later entry is skipped.
    pub fn apply_response(&mut self, response: &AiResponse) {
        for action in &response.actions {
            self.apply_action(action);
        }
        for command in &response.commands {
            self.apply_command(command);
        }
    }

    fn apply_action(&mut self, action: &ActionItem) {
        match action.kind {
            ItemKind::Task => self.add_task(NewTask {
                title: action.title.clone(),
                tags: action.tags.clone(),
                priority: action.priority,
            }),
            ItemKind::Schedule => match &action.date {
                Some(date) => self.add_schedule(NewSchedule {
                    title: action.title.clone(),
                    date: date.clone(),
                    tags: action.tags.clone(),
                    priority: action.priority,
                }),
                None => {
                    warn!("skipping schedule action without date: {:?}", action.title);
                }
            },
            ItemKind::Log => self.add_log(NewLog {
                title: action.title.clone(),
                tags: action.tags.clone(),
                priority: action.priority,
            }),
        }
    }

    fn apply_command(&mut self, command: &Command) {
        if let Some(new_data) = &command.new_data {
            if new_data.kind.is_some() {
                // Re-classifying an entity across collections has no defined
                // semantics; the field is accepted on the wire and ignored.
                debug!("ignoring type change in newData for {:?}", command.target_title);
            }
        }
        match command.target_type {
            ItemKind::Task => {
                let Some(id) = self
                    .find_task_by_title(&command.target_title)
                    .map(|t| t.id.clone())
                else {
                    debug!("no task matching {:?}, command skipped", command.target_title);
                    return;
                };
                match command.kind {
                    CommandKind::Delete => self.delete_task(&id),
                    CommandKind::Edit => {
                        self.update_task(&id, task_patch(command.new_data.as_ref()))
                    }
                }
            }
            ItemKind::Schedule => {
                let Some(id) = self
                    .find_schedule_by_title(&command.target_title)
                    .map(|s| s.id.clone())
                else {
                    debug!(
                        "no schedule matching {:?}, command skipped",
                        command.target_title
                    );
                    return;
                };
                match command.kind {
                    CommandKind::Delete => self.delete_schedule(&id),
                    CommandKind::Edit => {
                        self.update_schedule(&id, schedule_patch(command.new_data.as_ref()))
                    }
                }
            }
            ItemKind::Log => {
                let Some(id) = self
                    .find_log_by_title(&command.target_title)
                    .map(|l| l.id.clone())
                else {
                    debug!("no log matching {:?}, command skipped", command.target_title);
                    return;
                };
                match command.kind {
                    CommandKind::Delete => self.delete_log(&id),
                    CommandKind::Edit => self.update_log(&id, log_patch(command.new_data.as_ref())),
                }
            }
        }
    }
}

// Only fields explicitly present in newData make it into a patch.

fn task_patch(new_data: Option<&PartialActionItem>) -> TaskPatch {
    let Some(data) = new_data else {
        return TaskPatch::default();
    };
    TaskPatch {
        title: data.title.clone(),
        tags: data.tags.clone(),
        priority: data.priority,
    }
}

fn schedule_patch(new_data: Option<&PartialActionItem>) -> SchedulePatch {
    let Some(data) = new_data else {
        return SchedulePatch::default();
    };
    SchedulePatch {
        title: data.title.clone(),
        date: data.date.clone(),
        tags: data.tags.clone(),
        priority: data.priority,
    }
}

fn log_patch(new_data: Option<&PartialActionItem>) -> LogPatch {
    let Some(data) = new_data else {
        return LogPatch::default();
    };
    LogPatch {
        title: data.title.clone(),
        tags: data.tags.clone(),
        priority: data.priority,
    }
}
