//! Client traits and error types for the vSphere management API

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::vim::types::{Datacenter, HostPortGroup, HostPortGroupSpec, ManagedObjectReference};

/// Errors that can occur when talking to the platform
#[derive(Debug, Clone, Error)]
pub enum VimError {
    /// The host system could not be located
    #[error("Host system not found: {0}")]
    HostNotFound(String),

    /// The datacenter could not be located
    #[error("Datacenter not found: {0}")]
    DatacenterNotFound(String),

    /// A remote call failed (including per-call timeout expiry)
    #[error("Remote call '{operation}' failed: {message}")]
    Remote { operation: String, message: String },
}

impl VimError {
    /// Create a remote-call error
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type for vim operations
pub type VimResult<T> = Result<T, VimError>;

/// Fixed deadline applied independently to each remote call
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(300);

/// Run a remote call under the fixed per-call timeout.
///
/// Expiry surfaces as a generic remote-call error for the named operation,
/// not a distinguished timeout variant. No retries are attempted.
pub async fn with_api_timeout<T, F>(operation: &str, fut: F) -> VimResult<T>
where
    F: Future<Output = VimResult<T>>,
{
    match tokio::time::timeout(DEFAULT_API_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(VimError::remote(operation, "call timed out")),
    }
}

/// Session-scoped handle to the platform
///
/// Resolves management handles and runs by-name finder searches. The
/// client is passed to the provider explicitly; there is no ambient
/// session state.
#[async_trait]
pub trait VimClient: Send + Sync {
    /// Resolve the network-management handle for a host by its managed
    /// object ID
    async fn host_network_system(
        &self,
        host_system_id: &str,
    ) -> VimResult<Box<dyn HostNetworkSystem>>;

    /// Resolve a datacenter by its managed object ID
    async fn datacenter(&self, datacenter_id: &str) -> VimResult<Datacenter>;

    /// List network objects matching a name, optionally scoped to a
    /// datacenter
    async fn network_list(
        &self,
        name: &str,
        datacenter: Option<&Datacenter>,
    ) -> VimResult<Vec<ManagedObjectReference>>;
}

/// The network-management handle for a single host
#[async_trait]
pub trait HostNetworkSystem: Send + Sync {
    /// Add a port group to the host
    async fn add_port_group(&self, spec: HostPortGroupSpec) -> VimResult<()>;

    /// Replace the spec of an existing port group
    async fn update_port_group(&self, name: &str, spec: HostPortGroupSpec) -> VimResult<()>;

    /// Remove a port group from the host
    async fn remove_port_group(&self, name: &str) -> VimResult<()>;

    /// Fetch the live port group object by name
    ///
    /// Returns `None` if no port group with that name exists on the host
    async fn port_group_by_name(&self, name: &str) -> VimResult<Option<HostPortGroup>>;
}
