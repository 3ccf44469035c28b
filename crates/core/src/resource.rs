//! Resource-side wire types: the resource itself, proposed changes, plans and
//! the descriptive records a handler may publish.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::PlanError;
use crate::process::Process;
use crate::types::{Context, EpochMillis};

/// Related resource ids grouped by edge label.
pub type ResourceEdges = BTreeMap<String, BTreeSet<String>>;

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A provisioned infrastructure object.
///
/// `id` and `resource_definition_class` are stable for the lifetime of the
/// resource. `desired_state` is validated by the owning handler, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub resource_definition_class: String,
    #[serde(default)]
    pub desired_state: Context,
    pub environment: String,
    pub project: String,
    pub owner: String,
    pub region: String,
    #[serde(default)]
    pub input_resources: ResourceEdges,
    #[serde(default)]
    pub output_resources: ResourceEdges,
    #[serde(default)]
    pub resource_watch_list: BTreeSet<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub resource_lock_owner: Option<String>,
    #[serde(default)]
    pub last_update_timestamp: EpochMillis,
    #[serde(default)]
    pub parent_resource: Option<String>,
    #[serde(default)]
    pub child_resources: Option<BTreeSet<String>>,
}

impl Resource {
    /// Build a resource from a raw keyed mapping.
    pub fn from_context(raw: Context) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(raw))
    }

    /// Read a string field out of `desired_state`.
    pub fn desired_str(&self, key: &str) -> Option<&str> {
        self.desired_state.get(key).and_then(Value::as_str)
    }
}

/// Accept a resource either as a JSON object or as a JSON string holding an
/// encoded object. Both normalize to the same [`Resource`].
fn resource_object<'de, D>(deserializer: D) -> Result<Resource, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Object(raw) => Resource::from_context(raw).map_err(D::Error::custom),
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(D::Error::custom),
        other => Err(D::Error::custom(format!(
            "expected a resource object, found {other}"
        ))),
    }
}

fn optional_resource_object<'de, D>(deserializer: D) -> Result<Option<Resource>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "resource_object")] Resource);

    Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(r)| r))
}

// ---------------------------------------------------------------------------
// ResourceChange / Plan
// ---------------------------------------------------------------------------

/// A proposed transition for a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceChange {
    pub requester: String,
    #[serde(deserialize_with = "resource_object")]
    pub proposed_resource_object: Resource,
    /// Affected resource ids mapped to their snapshots.
    #[serde(default)]
    pub delta_graph: BTreeMap<String, Resource>,
    #[serde(default)]
    pub current_state: Option<Context>,
    #[serde(default, deserialize_with = "optional_resource_object")]
    pub current_resource_object: Option<Resource>,
}

impl ResourceChange {
    pub fn new(requester: impl Into<String>, proposed: Resource) -> Self {
        Self {
            requester: requester.into(),
            proposed_resource_object: proposed,
            delta_graph: BTreeMap::new(),
            current_state: None,
            current_resource_object: None,
        }
    }

    /// Desired-state string field of the proposed resource, or a [`PlanError`]
    /// naming the missing key.
    pub fn require_desired_str(&self, key: &str) -> Result<&str, PlanError> {
        self.proposed_resource_object
            .desired_str(key)
            .ok_or_else(|| PlanError::new(format!("Missing required desiredState field: {key}")))
    }
}

/// A handler's proposed outcome for a [`ResourceChange`].
///
/// A plan without a process is realizable immediately with no workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub proposed_resource: Resource,
    #[serde(default)]
    pub process: Option<Process>,
    #[serde(default)]
    pub updated_resource_id: Option<String>,
    /// Upstream vertices that must be realized before this one.
    #[serde(default)]
    pub upstream_vertex_dependency_ids: Vec<String>,
}

impl Plan {
    pub fn new(proposed_resource: Resource) -> Self {
        Self {
            proposed_resource,
            process: None,
            updated_resource_id: None,
            upstream_vertex_dependency_ids: Vec::new(),
        }
    }

    pub fn with_process(mut self, process: Process) -> Self {
        self.process = Some(process);
        self
    }

    pub fn with_updated_resource_id(mut self, id: impl Into<String>) -> Self {
        self.updated_resource_id = Some(id.into());
        self
    }

    pub fn with_upstream_dependencies(mut self, ids: Vec<String>) -> Self {
        self.upstream_vertex_dependency_ids = ids;
        self
    }
}

// ---------------------------------------------------------------------------
// Descriptive records
// ---------------------------------------------------------------------------

/// Cardinality constraint on edges between resource types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDefinition {
    pub connected_resource_type: BTreeSet<String>,
    #[serde(default)]
    pub min_cardinality: u32,
    #[serde(default = "default_max_cardinality")]
    pub max_cardinality: u32,
}

fn default_max_cardinality() -> u32 {
    100
}

/// An observability query published for a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDefinition {
    pub metric_label: String,
    pub query: String,
    pub warn_threshold: f64,
    pub severe_threshold: f64,
}

/// A UI action link for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub embed: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
