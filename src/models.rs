use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority of any stored item. Always resolves to one of the three
/// levels; the normalizer substitutes `Medium` for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

/// The three kinds of entity the store owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemKind {
    Task,
    Schedule,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandKind {
    Delete,
    Edit,
}

/// A creation intent extracted from user text.
///
/// `date` is semantically required when `kind` is `Schedule`; the mutation
/// executor skips schedule actions that arrive without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub tags: Vec<String>,
    pub priority: Priority,
}

/// The subset of action fields an EDIT command carries. Absent fields mean
/// "leave untouched", so every field stays optional end to end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialActionItem {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// An edit/delete intent referencing an existing entity by free-text title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(rename = "targetType")]
    pub target_type: ItemKind,
    #[serde(rename = "targetTitle")]
    pub target_title: String,
    #[serde(rename = "newData", skip_serializing_if = "Option::is_none")]
    pub new_data: Option<PartialActionItem>,
}

/// The structured response the reconciliation pipeline produces.
/// `actions` and `commands` are always arrays, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub reply: String,
    pub actions: Vec<ActionItem>,
    pub commands: Vec<Command>,
}

impl AiResponse {
    /// A reply-only response with no mutations, used for every recovered
    /// failure in the pipeline.
    pub fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            actions: Vec::new(),
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub title: String,
    /// ISO 8601 (`YYYY-MM-DDTHH:mm:ss`), mandatory unlike `ActionItem::date`.
    pub date: String,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied payloads for creation. Identity fields (`id`,
/// `createdAt`, and `completed` for tasks) are generated by the store.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub tags: Vec<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub title: String,
    pub date: String,
    pub tags: Vec<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct NewLog {
    pub title: String,
    pub tags: Vec<String>,
    pub priority: Priority,
}

/// Partial updates; `None` fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulePatch {
    pub title: Option<String>,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default)]
pub struct LogPatch {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
}
