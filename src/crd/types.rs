//! Supporting types shared by the Backend, Provider and Module CRDs

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Resource category a custom resource belongs to
///
/// The category drives the dependency compatibility table and the first
/// segment of finalizer markers and configuration file names.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// State backend for the provisioning tool
    Backend,
    /// Cloud provider configuration
    Provider,
    /// Deployable module
    Module,
}

impl ResourceKind {
    /// All categories, in dependency order
    pub const ALL: [ResourceKind; 3] = [Self::Backend, Self::Provider, Self::Module];

    /// The single sub-kind registered for this category
    pub fn sub_kind(&self) -> SubKind {
        match self {
            Self::Backend => SubKind::EtcdV3,
            Self::Provider => SubKind::Google,
            Self::Module => SubKind::Gcs,
        }
    }

    /// Whether a resource of this category may declare a dependency on `dependency`
    pub fn may_depend_on(&self, dependency: ResourceKind) -> bool {
        matches!(
            (self, dependency),
            (Self::Provider, Self::Provider)
                | (Self::Provider, Self::Module)
                | (Self::Provider, Self::Backend)
                | (Self::Module, Self::Provider)
        )
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Backend" => Ok(Self::Backend),
            "Provider" => Ok(Self::Provider),
            "Module" => Ok(Self::Module),
            _ => Err(crate::Error::validation(format!(
                "invalid resource kind: {s}, expected one of: Backend, Provider, Module"
            ))),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend => write!(f, "Backend"),
            Self::Provider => write!(f, "Provider"),
            Self::Module => write!(f, "Module"),
        }
    }
}

/// Concrete custom resource kind within a category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubKind {
    /// etcd v3 state backend
    EtcdV3,
    /// Google Cloud provider
    Google,
    /// Google Cloud Storage bucket module
    Gcs,
}

impl SubKind {
    /// Category this sub-kind belongs to
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::EtcdV3 => ResourceKind::Backend,
            Self::Google => ResourceKind::Provider,
            Self::Gcs => ResourceKind::Module,
        }
    }

    /// Key the rendered spec is nested under in the configuration document
    pub fn discriminator(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl std::str::FromStr for SubKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EtcdV3" => Ok(Self::EtcdV3),
            "Google" => Ok(Self::Google),
            "GCS" => Ok(Self::Gcs),
            _ => Err(crate::Error::validation(format!(
                "invalid sub-kind: {s}, expected one of: EtcdV3, Google, GCS"
            ))),
        }
    }
}

impl std::fmt::Display for SubKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EtcdV3 => write!(f, "EtcdV3"),
            Self::Google => write!(f, "Google"),
            Self::Gcs => write!(f, "GCS"),
        }
    }
}

/// Reference to another resource in the same namespace
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct DependencyRef {
    /// Category of the referenced resource
    pub kind: ResourceKind,
    /// Name of the referenced resource
    pub name: String,
}

impl DependencyRef {
    /// Create a reference to the named resource of the given category
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Outcome of the most recent lifecycle step
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing recorded yet
    #[default]
    #[serde(rename = "")]
    Unset,
    /// The step completed
    Success,
    /// The step is blocked or failed
    Failure,
}

/// Lifecycle step the state refers to
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ResourcePhase {
    /// Nothing recorded yet
    #[default]
    #[serde(rename = "")]
    Unset,
    /// Dependency gate
    Dependency,
    /// Configuration document rendered and written
    Output,
}

/// Status shared by every Terraform resource
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TerraformStatus {
    /// Outcome of the current phase
    #[serde(default)]
    pub state: ResourceState,

    /// Current lifecycle phase
    #[serde(default)]
    pub phase: ResourcePhase,

    /// Human-readable detail about the current state
    ///
    /// Serialized as `null` when absent so a merge patch clears a stale message.
    #[serde(default)]
    pub message: Option<String>,

    /// Generation last acted upon
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl TerraformStatus {
    /// Create a status with the given state and phase
    pub fn new(state: ResourceState, phase: ResourcePhase) -> Self {
        Self {
            state,
            phase,
            ..Default::default()
        }
    }

    /// Blocked at the dependency gate
    pub fn waiting() -> Self {
        Self::new(ResourceState::Failure, ResourcePhase::Dependency)
    }

    /// Dependency gate passed
    pub fn dependencies_met() -> Self {
        Self::new(ResourceState::Success, ResourcePhase::Dependency)
    }

    /// Configuration document written
    pub fn materialized() -> Self {
        Self::new(ResourceState::Success, ResourcePhase::Output)
    }

    /// Set the message and return self for chaining
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Set the observed generation and return self for chaining
    pub fn observed_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }

    /// True once the dependency gate has been passed at least once
    pub fn has_passed_dependency_gate(&self) -> bool {
        self.state == ResourceState::Success
            && matches!(self.phase, ResourcePhase::Dependency | ResourcePhase::Output)
    }

    /// True once the configuration document has been written
    pub fn is_materialized(&self) -> bool {
        self.state == ResourceState::Success && self.phase == ResourcePhase::Output
    }

    /// True if a dependent may rely on this resource
    pub fn is_success(&self) -> bool {
        self.state == ResourceState::Success
    }
}
