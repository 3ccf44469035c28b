//! Error taxonomy shared by handlers, registries and the runtime.

/// A handler rejected a proposed change. Surfaced to callers as a 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlanError(pub String);

impl PlanError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Required task context is absent or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A call to the ResourceDB or HumanTaskSystem collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to {operation}: {}", describe_remote(.status, .message))]
pub struct RemoteCallError {
    /// What was attempted, e.g. `"get resource r-1"`.
    pub operation: String,
    /// Remote HTTP status, `None` when the request never completed.
    pub status: Option<u16>,
    /// Transport error or response body.
    pub message: String,
}

fn describe_remote(status: &Option<u16>, message: &str) -> String {
    match *status {
        Some(code) if message.is_empty() => format!("status {code}"),
        Some(code) => format!("status {code}: {message}"),
        None => message.to_string(),
    }
}

/// Structural problems with a workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    #[error("Process hasn't been initialized correctly: missing start task id")]
    MissingStartTask,

    #[error("Invalid start task id: {0}")]
    UnknownStartTask(String),

    #[error("Duplicate task instance id: {0}")]
    DuplicateTask(String),

    #[error("Task {from} points to missing task id {to}")]
    DanglingPointer { from: String, to: String },

    #[error("Task {task} has no transitions for exit status {status}")]
    MissingExitStatus { task: String, status: String },

    #[error("Task {task} has transitions for non-exit status {status}")]
    NonExitTransition { task: String, status: String },

    #[error("Terminal task {0} must not have outgoing edges")]
    TerminalWithEdges(String),
}

/// Plugin discovery failures. Every variant aborts discovery.
///
/// Recoverable problems (unreadable descriptor, bad YAML, missing scan
/// directory) never become a `PluginLoadError`; they are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum PluginLoadError {
    #[error("Module {module} failed to load: missing dependency {symbol}")]
    MissingDependency { module: String, symbol: String },

    #[error("Plugin {symbol} declares unknown parent {parent}")]
    UnknownParent { symbol: String, parent: String },

    #[error("Duplicate {registry} registration for key {key}")]
    DuplicateKey { registry: &'static str, key: String },

    #[error("Plugin {key} failed to initialize: {source}")]
    Initialization {
        key: String,
        #[source]
        source: Box<CoreError>,
    },
}

/// Umbrella error returned by handler and runtime operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteCallError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{0}")]
    Handler(String),
}

impl CoreError {
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
