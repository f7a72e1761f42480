//! Provider - Trait abstracting resource operations
//!
//! A Provider translates declarative resources into imperative calls
//! against a platform's management API, and translates the platform's
//! current state back into the declarative model for drift detection.
//!
//! The remote client is held by the provider and threaded through every
//! call explicitly; lifecycle callbacks are pure functions of
//! (declarative state, remote client) with no hidden singletons.

use async_trait::async_trait;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "host_port_group")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// Each infrastructure provider implements this trait. All operations are
/// async and involve side effects. There are exactly two meaningful remote
/// states, absent and present: create and delete are the transitions,
/// update is an in-place present-to-present change, and read only
/// reconciles drift.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "vsphere")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current remote state of a resource
    ///
    /// Takes the last tracked state, since addressing the remote object may
    /// need attributes beyond the identifier (a host id, a name).
    /// Returns `State::not_found()` if the resource does not exist.
    async fn read(&self, current: &State) -> ProviderResult<State>;

    /// Create a resource
    ///
    /// Returns State populated by a follow-up read, with the durable
    /// platform-assigned identifier set.
    async fn create(&self, resource: &Resource) -> ProviderResult<State>;

    /// Update a resource in place
    async fn update(&self, from: &State, to: &Resource) -> ProviderResult<State>;

    /// Delete a resource
    async fn delete(&self, current: &State) -> ProviderResult<()>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
#[async_trait]
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        (**self).read(current).await
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        (**self).create(resource).await
    }

    async fn update(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        (**self).update(from, to).await
    }

    async fn delete(&self, current: &State) -> ProviderResult<()> {
        (**self).delete(current).await
    }
}
