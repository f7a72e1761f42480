//! Halyard vSphere Provider
//!
//! Translates declarative host networking resources into calls against
//! the vSphere management API. The remote client is injected explicitly,
//! so any transport (or the in-memory simulator) can back the provider.

pub mod host_port_group;
pub mod policy;
pub mod sim;
pub mod vim;

use std::sync::Arc;

use async_trait::async_trait;

use halyard_core::provider::{Provider, ProviderError, ProviderResult, ResourceType};
use halyard_core::resource::{Resource, State};

use crate::host_port_group::{HOST_PORT_GROUP, HostPortGroupType};
use crate::vim::VimClient;

/// vSphere Provider
pub struct VsphereProvider {
    pub(crate) client: Arc<dyn VimClient>,
}

impl VsphereProvider {
    /// Create a provider over the given client
    pub fn new(client: Arc<dyn VimClient>) -> Self {
        Self { client }
    }

    fn unsupported(resource_type: &str) -> ProviderError {
        ProviderError::new(format!("Unsupported resource type: {}", resource_type))
    }
}

#[async_trait]
impl Provider for VsphereProvider {
    fn name(&self) -> &'static str {
        "vsphere"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        vec![Box::new(HostPortGroupType)]
    }

    async fn read(&self, current: &State) -> ProviderResult<State> {
        match current.id.resource_type.as_str() {
            HOST_PORT_GROUP => self.read_host_port_group(current).await,
            other => Err(Self::unsupported(other).for_resource(current.id.clone())),
        }
    }

    async fn create(&self, resource: &Resource) -> ProviderResult<State> {
        match resource.id.resource_type.as_str() {
            HOST_PORT_GROUP => self.create_host_port_group(resource).await,
            other => Err(Self::unsupported(other).for_resource(resource.id.clone())),
        }
    }

    async fn update(&self, from: &State, to: &Resource) -> ProviderResult<State> {
        match to.id.resource_type.as_str() {
            HOST_PORT_GROUP => self.update_host_port_group(from, to).await,
            other => Err(Self::unsupported(other).for_resource(to.id.clone())),
        }
    }

    async fn delete(&self, current: &State) -> ProviderResult<()> {
        match current.id.resource_type.as_str() {
            HOST_PORT_GROUP => self.delete_host_port_group(current).await,
            other => Err(Self::unsupported(other).for_resource(current.id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimClient;

    #[test]
    fn provider_registers_host_port_group() {
        let provider = VsphereProvider::new(Arc::new(SimClient::new()));
        assert_eq!(provider.name(), "vsphere");

        let types = provider.resource_types();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name(), HOST_PORT_GROUP);
        assert!(types[0].schema().attributes.contains_key("host_system_id"));
    }

    #[tokio::test]
    async fn unknown_resource_type_is_rejected() {
        let provider = VsphereProvider::new(Arc::new(SimClient::new()));
        let resource = Resource::new("virtual_switch", "sw");

        let err = provider.create(&resource).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported resource type"));
    }
}
