//! Workflow graph model: processes, task nodes, status-keyed edges and the
//! terminal sentinels.
//!
//! This module defines and serializes the graph. Walking it (deciding which
//! tasks become active next) is the orchestrator's job; only read-only edge
//! queries live here.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ProcessError, ValidationError};
use crate::types::{now_millis, Context, EpochMillis};

/// Instance id of the sentinel that marks overall success.
pub const SUCCEED_PROCESS_TASK: &str = "succeedProcess";

/// Instance id of the sentinel that marks overall failure.
pub const FAIL_PROCESS_TASK: &str = "failProcess";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Task and process status.
///
/// `NotStarted` is only ever an initial state. `Running` follows `NotStarted`
/// or itself (polling). The remaining three are exit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl Status {
    /// Statuses every non-terminal task must route.
    pub const EXIT_STATES: [Status; 3] = [Status::Succeeded, Status::Failed, Status::Cancelled];

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed | Status::Cancelled)
    }

    /// Whether a task currently in `previous` may report `self` next.
    pub fn can_follow(self, previous: Status) -> bool {
        match self {
            Status::NotStarted => false,
            Status::Running => matches!(previous, Status::NotStarted | Status::Running),
            Status::Succeeded | Status::Failed | Status::Cancelled => !previous.is_terminal(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "NOT_STARTED",
            Status::Running => "RUNNING",
            Status::Succeeded => "SUCCEEDED",
            Status::Failed => "FAILED",
            Status::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of lifecycle change a process realizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessType {
    Create,
    Update,
    Delete,
}

// ---------------------------------------------------------------------------
// StatusUpdate / ContextPatch
// ---------------------------------------------------------------------------

/// One mutation to merge back into the caller-visible process context.
///
/// `path` is a JSON pointer rooted at the process context, e.g.
/// `/demoTask/result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ContextPatch {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl ContextPatch {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self::Add {
            path: path.into(),
            value,
        }
    }

    /// Apply this patch to `context`. Missing intermediate objects are created
    /// for `add`; `replace` and `remove` require the target to exist.
    pub fn apply(&self, context: &mut Context) -> Result<(), ValidationError> {
        let path = match self {
            Self::Add { path, .. } | Self::Replace { path, .. } | Self::Remove { path } => path,
        };
        let segments = parse_pointer(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ValidationError::new("Context patch path must not be empty"))?;

        let mut target = context;
        for segment in parents {
            let create = matches!(self, Self::Add { .. });
            if create && !target.contains_key(segment) {
                target.insert(segment.clone(), Value::Object(Context::new()));
            }
            target = target
                .get_mut(segment)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| {
                    ValidationError::new(format!("Context patch path {path} is not an object"))
                })?;
        }

        match self {
            Self::Add { value, .. } => {
                target.insert(last.clone(), value.clone());
            }
            Self::Replace { value, .. } => {
                let slot = target.get_mut(last).ok_or_else(|| {
                    ValidationError::new(format!("Context patch target {path} does not exist"))
                })?;
                *slot = value.clone();
            }
            Self::Remove { .. } => {
                target.remove(last).ok_or_else(|| {
                    ValidationError::new(format!("Context patch target {path} does not exist"))
                })?;
            }
        }
        Ok(())
    }
}

fn parse_pointer(path: &str) -> Result<Vec<String>, ValidationError> {
    let rest = path.strip_prefix('/').ok_or_else(|| {
        ValidationError::new(format!("Context patch path must start with '/': {path}"))
    })?;
    Ok(rest
        .split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Result of a single task handler invocation.
///
/// This is the only channel a task has for moving state forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: Status,
    #[serde(default)]
    pub std_out: Option<String>,
    #[serde(default)]
    pub std_err: Option<String>,
    #[serde(default)]
    pub process_context_update: Vec<ContextPatch>,
}

impl StatusUpdate {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            std_out: None,
            std_err: None,
            process_context_update: Vec::new(),
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::new(Status::Failed).with_std_err(msg)
    }

    pub fn with_std_out(mut self, msg: impl Into<String>) -> Self {
        self.std_out = Some(msg.into());
        self
    }

    pub fn with_std_err(mut self, msg: impl Into<String>) -> Self {
        self.std_err = Some(msg.into());
        self
    }

    pub fn with_patch(mut self, patch: ContextPatch) -> Self {
        self.process_context_update.push(patch);
        self
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Timestamped log line attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessLogMessage {
    pub timestamp: EpochMillis,
    pub message: String,
}

/// Successor ids keyed by the status that selects them.
pub type NextPointers = BTreeMap<Status, IndexSet<String>>;

/// One node in a process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Graph-local id, unique within its process.
    pub instance_id: String,
    /// Names the task handler to invoke.
    pub task_definition_id: String,
    #[serde(default)]
    pub next_pointers: NextPointers,
    #[serde(default)]
    pub start_time_ms: EpochMillis,
    #[serde(default)]
    pub end_time_ms: EpochMillis,
    #[serde(default = "not_started")]
    pub status: Status,
    #[serde(default)]
    pub std_out: Vec<ProcessLogMessage>,
    #[serde(default)]
    pub std_err: Vec<ProcessLogMessage>,
}

fn not_started() -> Status {
    Status::NotStarted
}

impl Task {
    pub fn new(instance_id: impl Into<String>, task_definition_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            task_definition_id: task_definition_id.into(),
            next_pointers: NextPointers::new(),
            start_time_ms: 0,
            end_time_ms: 0,
            status: Status::NotStarted,
            std_out: Vec::new(),
            std_err: Vec::new(),
        }
    }

    /// Task routed on the three exit statuses.
    pub fn with_exits(
        instance_id: impl Into<String>,
        task_definition_id: impl Into<String>,
        on_succeeded: &[&str],
        on_failed: &[&str],
        on_cancelled: &[&str],
    ) -> Self {
        Self::new(instance_id, task_definition_id)
            .on(Status::Succeeded, on_succeeded)
            .on(Status::Failed, on_failed)
            .on(Status::Cancelled, on_cancelled)
    }

    /// Set the successors for `status`, replacing any existing edges.
    pub fn on(mut self, status: Status, successors: &[&str]) -> Self {
        self.next_pointers.insert(
            status,
            successors.iter().map(|s| (*s).to_string()).collect(),
        );
        self
    }

    /// A sentinel: empty transition set for every exit status.
    fn sentinel(id: &str) -> Self {
        Self::with_exits(id, id, &[], &[], &[])
    }

    pub fn is_terminal(&self) -> bool {
        is_sentinel(&self.task_definition_id)
    }

    pub fn append_std_out(&mut self, msg: impl Into<String>) {
        self.std_out.push(ProcessLogMessage {
            timestamp: now_millis(),
            message: msg.into(),
        });
    }

    pub fn append_std_err(&mut self, msg: impl Into<String>) {
        self.std_err.push(ProcessLogMessage {
            timestamp: now_millis(),
            message: msg.into(),
        });
    }
}

/// Whether `task_definition_id` names one of the two sentinels.
pub fn is_sentinel(task_definition_id: &str) -> bool {
    task_definition_id == SUCCEED_PROCESS_TASK || task_definition_id == FAIL_PROCESS_TASK
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// All task nodes keyed by instance id.
pub type TaskGraph = IndexMap<String, Task>;

/// One workflow instance.
///
/// Rebuilt from the caller's payload on every request and never persisted
/// here. Both sentinels are present after construction and after every
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    #[serde(default)]
    pub process_id: Option<String>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub process_type: Option<ProcessType>,
    /// Declared limit for the orchestrator; not enforced here.
    #[serde(default = "default_max_concurrent", alias = "maxConcurrentTask")]
    pub max_concurrent_tasks: u32,
    /// Per-task contexts keyed by instance id, plus shared named entries.
    #[serde(default)]
    pub process_context: Context,
    /// Active task ids. The wire name keeps the orchestrator's spelling.
    #[serde(default, rename = "currenTaskSet", alias = "currentTaskSet")]
    pub current_task_set: IndexSet<String>,
    #[serde(default)]
    pub start_task_id: Option<String>,
    #[serde(default = "sentinel_graph", deserialize_with = "task_graph")]
    pub all_tasks: TaskGraph,
    #[serde(default = "not_started")]
    pub end_status: Status,
    #[serde(default)]
    pub start_time_ms: EpochMillis,
    #[serde(default)]
    pub end_time_ms: EpochMillis,
}

fn default_max_concurrent() -> u32 {
    1
}

fn insert_sentinels(graph: &mut TaskGraph) {
    for id in [SUCCEED_PROCESS_TASK, FAIL_PROCESS_TASK] {
        graph.insert(id.to_string(), Task::sentinel(id));
    }
}

fn sentinel_graph() -> TaskGraph {
    let mut graph = TaskGraph::new();
    insert_sentinels(&mut graph);
    graph
}

fn task_graph<'de, D>(deserializer: D) -> Result<TaskGraph, D::Error>
where
    D: Deserializer<'de>,
{
    let mut graph = TaskGraph::deserialize(deserializer)?;
    insert_sentinels(&mut graph);
    Ok(graph)
}

impl Default for Process {
    fn default() -> Self {
        Self {
            process_id: None,
            execution_id: None,
            process_type: None,
            max_concurrent_tasks: default_max_concurrent(),
            process_context: Context::new(),
            current_task_set: IndexSet::new(),
            start_task_id: None,
            all_tasks: sentinel_graph(),
            end_status: Status::NotStarted,
            start_time_ms: 0,
            end_time_ms: 0,
        }
    }
}

impl Process {
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: Some(process_id.into()),
            ..Self::default()
        }
    }

    /// Fail fast on a process that has no entry point.
    pub fn init(&self) -> Result<(), ProcessError> {
        if self.start_task_id.is_none() {
            return Err(ProcessError::MissingStartTask);
        }
        Ok(())
    }

    pub fn process_id(&self) -> &str {
        self.process_id.as_deref().unwrap_or_default()
    }

    pub fn execution_id(&self) -> &str {
        self.execution_id.as_deref().unwrap_or_default()
    }

    /// Add a task node, rejecting a duplicate instance id.
    pub fn add_task(&mut self, task: Task) -> Result<(), ProcessError> {
        if self.all_tasks.contains_key(&task.instance_id) {
            return Err(ProcessError::DuplicateTask(task.instance_id));
        }
        self.all_tasks.insert(task.instance_id.clone(), task);
        Ok(())
    }

    /// Successor ids of `instance_id` for `status`, empty when none are routed.
    pub fn successors(&self, instance_id: &str, status: Status) -> Vec<&str> {
        self.all_tasks
            .get(instance_id)
            .and_then(|t| t.next_pointers.get(&status))
            .map(|next| next.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The sub-context stored under a task instance id.
    ///
    /// Absent is not an error and yields `None`; a non-object value is.
    pub fn task_context(&self, instance_id: &str) -> Result<Option<&Context>, ValidationError> {
        match self.process_context.get(instance_id) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(ctx)) => Ok(Some(ctx)),
            Some(other) => Err(ValidationError::new(format!(
                "Task context for {instance_id} must be an object, found {other}"
            ))),
        }
    }

    /// Plan-time dry run of the graph structure.
    ///
    /// Only tasks reachable from the start task are checked. Unused nodes may
    /// be left partially wired.
    pub fn validate_graph(&self) -> Result<(), ProcessError> {
        let start = self
            .start_task_id
            .as_deref()
            .ok_or(ProcessError::MissingStartTask)?;
        if !self.all_tasks.contains_key(start) {
            return Err(ProcessError::UnknownStartTask(start.to_string()));
        }

        let mut visited: IndexSet<&str> = IndexSet::from([start]);
        let mut queue: VecDeque<&str> = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            let task = &self.all_tasks[id];
            if task.is_terminal() {
                if task.next_pointers.values().any(|next| !next.is_empty()) {
                    return Err(ProcessError::TerminalWithEdges(id.to_string()));
                }
                continue;
            }

            for (status, next) in &task.next_pointers {
                if !status.is_terminal() && !next.is_empty() {
                    return Err(ProcessError::NonExitTransition {
                        task: id.to_string(),
                        status: status.to_string(),
                    });
                }
                for to in next {
                    if !self.all_tasks.contains_key(to) {
                        return Err(ProcessError::DanglingPointer {
                            from: id.to_string(),
                            to: to.clone(),
                        });
                    }
                    if visited.insert(to.as_str()) {
                        queue.push_back(to.as_str());
                    }
                }
            }

            for status in Status::EXIT_STATES {
                if !task.next_pointers.contains_key(&status) {
                    return Err(ProcessError::MissingExitStatus {
                        task: id.to_string(),
                        status: status.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
