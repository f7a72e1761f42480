//! Host port group resource
//!
//! A port group on a host-level virtual switch. Create and delete are the
//! only transitions between the two remote states, absent and present;
//! update is an in-place change and read reconciles drift.
//!
//! The resource's durable identifier is the platform-assigned reference
//! value of the backing network object, discovered during read. During
//! create a locally composed `host_system_id:name` key stands in until the
//! first read completes.

use log::debug;

use halyard_core::provider::{ProviderError, ProviderResult, ResourceType};
use halyard_core::resource::{Resource, State, Value};
use halyard_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::VsphereProvider;
use crate::policy::{
    computed_policy_attributes, expand_host_port_group_spec, flatten_host_port_group_spec,
    port_attributes, port_group_spec_schema, port_schema,
};
use crate::vim::with_api_timeout;

pub const HOST_PORT_GROUP: &str = "host_port_group";

/// Host port group resource type
pub struct HostPortGroupType;

impl ResourceType for HostPortGroupType {
    fn name(&self) -> &'static str {
        HOST_PORT_GROUP
    }

    fn schema(&self) -> ResourceSchema {
        host_port_group_schema()
    }
}

/// Build the host port group schema: the resource's own attributes merged
/// with the shared port group spec sub-schema, with the NIC lists relaxed
/// to optional so teaming can fall back to the switch-level order.
pub fn host_port_group_schema() -> ResourceSchema {
    ResourceSchema::new(HOST_PORT_GROUP)
        .with_description("A port group on a host-level virtual switch.")
        .attribute(
            AttributeSchema::new("host_system_id", AttributeType::String)
                .required()
                .force_new()
                .with_description(
                    "The managed object ID of the host to set the port group up on.",
                ),
        )
        .attribute(
            AttributeSchema::new("datacenter_id", AttributeType::String)
                .required()
                .force_new()
                .with_description("The managed object ID of the datacenter the host is in."),
        )
        .attribute(
            AttributeSchema::new(
                "computed_policy",
                AttributeType::Map(Box::new(AttributeType::String)),
            )
            .computed()
            .with_description(
                "The effective network policy after inheritance. Note that this will look \
                 similar to, but is not the same, as the policy attributes defined in this \
                 resource.",
            ),
        )
        .attribute(
            AttributeSchema::new("key", AttributeType::String)
                .computed()
                .with_description("The linkable identifier for this port group."),
        )
        .attribute(
            AttributeSchema::new(
                "ports",
                AttributeType::List(Box::new(AttributeType::Nested(Box::new(port_schema())))),
            )
            .computed()
            .with_max_items(1)
            .with_description("The ports that currently exist and are used on this port group."),
        )
        .merge(port_group_spec_schema())
        .override_optional("active_nics")
        .override_optional("standby_nics")
}

impl VsphereProvider {
    pub(crate) async fn create_host_port_group(
        &self,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let name = resource.get_string("name").ok_or_else(|| {
            ProviderError::new("Port group name is required").for_resource(resource.id.clone())
        })?;
        let host_id = resource.get_string("host_system_id").ok_or_else(|| {
            ProviderError::new("Host system ID is required").for_resource(resource.id.clone())
        })?;

        let ns = self
            .client
            .host_network_system(host_id)
            .await
            .map_err(|e| {
                ProviderError::new(format!("error loading network system: {}", e))
                    .for_resource(resource.id.clone())
            })?;

        let spec = expand_host_port_group_spec(&resource.attributes)
            .map_err(|e| e.for_resource(resource.id.clone()))?;
        with_api_timeout("add port group", ns.add_port_group(spec))
            .await
            .map_err(|e| {
                ProviderError::new(format!("error adding port group: {}", e))
                    .for_resource(resource.id.clone())
            })?;

        // Transitional key until read discovers the network reference
        let provisional_id = format!("{}:{}", host_id, name);
        let seed = State::existing(resource.id.clone(), resource.attributes.clone())
            .with_provisional_id(provisional_id);
        self.read_host_port_group(&seed).await
    }

    pub(crate) async fn read_host_port_group(&self, current: &State) -> ProviderResult<State> {
        let id = current.id.clone();
        let name = current.get_string("name").ok_or_else(|| {
            ProviderError::new("Port group name is required").for_resource(id.clone())
        })?;
        let host_id = current.get_string("host_system_id").ok_or_else(|| {
            ProviderError::new("Host system ID is required").for_resource(id.clone())
        })?;

        let ns = self.client.host_network_system(host_id).await.map_err(|e| {
            ProviderError::new(format!("error loading host network system: {}", e))
                .for_resource(id.clone())
        })?;

        let pg = with_api_timeout("fetch port group", ns.port_group_by_name(name))
            .await
            .map_err(|e| {
                ProviderError::new(format!("error fetching port group data: {}", e))
                    .for_resource(id.clone())
            })?;
        let Some(pg) = pg else {
            // Gone remotely; report absence so the caller can drop the
            // resource from tracked state
            return Ok(State::not_found(id));
        };

        let mut attrs = flatten_host_port_group_spec(&pg.spec);
        attrs.insert(
            "host_system_id".to_string(),
            Value::String(host_id.to_string()),
        );
        attrs.insert("key".to_string(), Value::String(pg.key.clone()));

        let datacenter = match current.get_string("datacenter_id") {
            Some(dc_id) => {
                attrs.insert(
                    "datacenter_id".to_string(),
                    Value::String(dc_id.to_string()),
                );
                let dc = self.client.datacenter(dc_id).await.map_err(|e| {
                    ProviderError::new(format!("cannot locate datacenter: {}", e))
                        .for_resource(id.clone())
                })?;
                Some(dc)
            }
            None => None,
        };

        let networks = with_api_timeout(
            "network list",
            self.client.network_list(name, datacenter.as_ref()),
        )
        .await
        .map_err(|e| ProviderError::new(e.to_string()).for_resource(id.clone()))?;
        let Some(network) = networks.first() else {
            return Err(
                ProviderError::new(format!("Network {} not found", name)).for_resource(id),
            );
        };
        debug!("network ID is {}", network.value);

        attrs.insert(
            "computed_policy".to_string(),
            computed_policy_attributes(&pg.computed_policy),
        );
        attrs.insert("ports".to_string(), port_attributes(&pg.ports));

        let mut state = State::existing(id, attrs).with_identifier(network.value.clone());
        // Keep the transitional key from create; the durable identifier
        // takes precedence
        state.provisional_id = current.provisional_id.clone();
        Ok(state)
    }

    pub(crate) async fn update_host_port_group(
        &self,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let name = to.get_string("name").ok_or_else(|| {
            ProviderError::new("Port group name is required").for_resource(to.id.clone())
        })?;
        let host_id = to.get_string("host_system_id").ok_or_else(|| {
            ProviderError::new("Host system ID is required").for_resource(to.id.clone())
        })?;

        let ns = self.client.host_network_system(host_id).await.map_err(|e| {
            ProviderError::new(format!("error loading host network system: {}", e))
                .for_resource(to.id.clone())
        })?;

        let spec =
            expand_host_port_group_spec(&to.attributes).map_err(|e| e.for_resource(to.id.clone()))?;
        with_api_timeout("update port group", ns.update_port_group(name, spec))
            .await
            .map_err(|e| {
                ProviderError::new(format!("error updating port group: {}", e))
                    .for_resource(to.id.clone())
            })?;

        let seed = State::existing(to.id.clone(), to.attributes.clone());
        self.read_host_port_group(&seed).await
    }

    pub(crate) async fn delete_host_port_group(&self, current: &State) -> ProviderResult<()> {
        let id = current.id.clone();
        let name = current.get_string("name").ok_or_else(|| {
            ProviderError::new("Port group name is required").for_resource(id.clone())
        })?;
        let host_id = current.get_string("host_system_id").ok_or_else(|| {
            ProviderError::new("Host system ID is required").for_resource(id.clone())
        })?;

        let ns = self.client.host_network_system(host_id).await.map_err(|e| {
            ProviderError::new(format!("error loading host network system: {}", e))
                .for_resource(id.clone())
        })?;

        with_api_timeout("remove port group", ns.remove_port_group(name))
            .await
            .map_err(|e| {
                ProviderError::new(format!("error deleting port group: {}", e)).for_resource(id)
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use halyard_core::provider::Provider;
    use halyard_core::resource::{Resource, ResourceId, State, Value};

    use super::*;
    use crate::sim::SimClient;
    use crate::vim::types::{HostNetworkPolicy, HostPortGroupPort, SecurityPolicy};
    use crate::vim::{HostNetworkSystem as _, VimClient as _};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn sim_with_host() -> (SimClient, VsphereProvider) {
        let sim = SimClient::new();
        sim.add_datacenter("datacenter-1", "dc1");
        sim.add_host("host-1", "datacenter-1");
        let provider = VsphereProvider::new(Arc::new(sim.clone()));
        (sim, provider)
    }

    fn pg_resource(name: &str) -> Resource {
        Resource::new(HOST_PORT_GROUP, name)
            .with_attribute("host_system_id", Value::String("host-1".to_string()))
            .with_attribute("datacenter_id", Value::String("datacenter-1".to_string()))
            .with_attribute("name", Value::String(name.to_string()))
            .with_attribute(
                "virtual_switch_name",
                Value::String("vSwitch0".to_string()),
            )
            .with_attribute("vlan_id", Value::Int(1000))
            .with_attribute("allow_promiscuous", Value::Bool(true))
            .with_attribute(
                "active_nics",
                Value::List(vec![Value::String("vmnic0".to_string())]),
            )
            .with_attribute(
                "standby_nics",
                Value::List(vec![Value::String("vmnic1".to_string())]),
            )
    }

    #[test]
    fn schema_relaxes_nic_lists_to_optional() {
        let schema = host_port_group_schema();

        // Required in the shared sub-schema, optional here
        assert!(!schema.attributes["active_nics"].required);
        assert!(!schema.attributes["standby_nics"].required);

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("pg".to_string()));
        attrs.insert(
            "virtual_switch_name".to_string(),
            Value::String("vSwitch0".to_string()),
        );
        attrs.insert(
            "host_system_id".to_string(),
            Value::String("host-1".to_string()),
        );
        attrs.insert(
            "datacenter_id".to_string(),
            Value::String("datacenter-1".to_string()),
        );
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn ports_element_type_matches_emitted_shape() {
        let schema = host_port_group_schema();
        let ports = port_attributes(&[HostPortGroupPort {
            key: "key-vim.host.PortGroup.Port-1".to_string(),
            mac: vec!["00:50:56:aa:bb:cc".to_string()],
            port_type: "virtualMachine".to_string(),
        }]);

        // The computed list the provider emits validates against the
        // declared nested port schema
        assert!(schema.attributes["ports"].attr_type.validate(&ports).is_ok());
    }

    #[test]
    fn schema_rejects_computed_fields_as_input() {
        let schema = host_port_group_schema();

        let mut attrs = HashMap::new();
        attrs.insert("key".to_string(), Value::String("key-123".to_string()));
        attrs.insert(
            "computed_policy".to_string(),
            Value::Map(HashMap::new()),
        );
        attrs.insert("ports".to_string(), Value::List(vec![]));

        let errors = schema.validate(&attrs).unwrap_err();
        // All three computed attributes rejected, plus missing required ones
        assert!(errors.len() >= 3);
    }

    #[tokio::test]
    async fn create_then_read_round_trips_policy() {
        init_logging();
        let (_sim, provider) = sim_with_host();
        let resource = pg_resource("pg-test");

        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);

        // Policy fields survive the expand/flatten round trip unchanged
        for attr in [
            "name",
            "virtual_switch_name",
            "vlan_id",
            "allow_promiscuous",
            "active_nics",
            "standby_nics",
        ] {
            assert_eq!(
                state.attributes.get(attr),
                resource.attributes.get(attr),
                "attribute {} drifted through create/read",
                attr
            );
        }
        assert_eq!(
            state.get_string("key"),
            Some("key-vim.host.PortGroup-pg-test")
        );
    }

    #[tokio::test]
    async fn create_assigns_provisional_then_durable_identifier() {
        let (_sim, provider) = sim_with_host();

        let state = provider.create(&pg_resource("pg-test")).await.unwrap();
        assert_eq!(state.provisional_id.as_deref(), Some("host-1:pg-test"));
        // The durable network reference wins
        let identifier = state.identifier.as_deref().unwrap();
        assert!(identifier.starts_with("network-"));
        assert_eq!(state.effective_id(), Some(identifier));
    }

    #[tokio::test]
    async fn create_fails_when_host_unknown() {
        let (_sim, provider) = sim_with_host();
        let resource = pg_resource("pg-test")
            .with_attribute("host_system_id", Value::String("host-nope".to_string()));

        let err = provider.create(&resource).await.unwrap_err();
        assert!(err.to_string().contains("error loading network system"));
    }

    #[tokio::test]
    async fn create_wraps_remote_failure() {
        let (sim, provider) = sim_with_host();
        sim.fail_next("add_port_group");

        let err = provider.create(&pg_resource("pg-test")).await.unwrap_err();
        assert!(err.to_string().contains("error adding port group"));
    }

    #[tokio::test]
    async fn read_drops_provisional_id_when_gone() {
        let (_sim, provider) = sim_with_host();

        // A create-time seed whose port group never materialized remotely
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("pg-test".to_string()));
        attrs.insert(
            "host_system_id".to_string(),
            Value::String("host-1".to_string()),
        );
        let seed = State::existing(ResourceId::new(HOST_PORT_GROUP, "pg-test"), attrs)
            .with_provisional_id("host-1:pg-test");

        let read = provider.read(&seed).await.unwrap();
        assert!(!read.exists);
        assert!(read.provisional_id.is_none());
        assert!(read.effective_id().is_none());
    }

    #[tokio::test]
    async fn read_reports_not_found_when_port_group_gone() {
        let (sim, provider) = sim_with_host();
        let state = provider.create(&pg_resource("pg-test")).await.unwrap();

        // Deleted outside the tool
        let ns = sim.host_network_system("host-1").await.unwrap();
        ns.remove_port_group("pg-test").await.unwrap();

        let read = provider.read(&state).await.unwrap();
        assert!(!read.exists);
        assert!(read.identifier.is_none());
    }

    #[tokio::test]
    async fn read_fails_when_network_missing() {
        let (sim, provider) = sim_with_host();
        let state = provider.create(&pg_resource("pg-test")).await.unwrap();

        sim.orphan_network("pg-test");

        let err = provider.read(&state).await.unwrap_err();
        assert!(err.to_string().contains("Network pg-test not found"));
    }

    #[tokio::test]
    async fn read_fails_when_datacenter_invalid() {
        let (_sim, provider) = sim_with_host();
        let mut state = provider.create(&pg_resource("pg-test")).await.unwrap();
        state.attributes.insert(
            "datacenter_id".to_string(),
            Value::String("datacenter-nope".to_string()),
        );

        let err = provider.read(&state).await.unwrap_err();
        assert!(err.to_string().contains("cannot locate datacenter"));
    }

    #[tokio::test]
    async fn read_overwrites_computed_fields() {
        let (sim, provider) = sim_with_host();
        let created = provider.create(&pg_resource("pg-test")).await.unwrap();

        sim.seed_ports(
            "host-1",
            "pg-test",
            vec![HostPortGroupPort {
                key: "key-vim.host.PortGroup.Port-100".to_string(),
                mac: vec!["00:50:56:aa:bb:cc".to_string()],
                port_type: "virtualMachine".to_string(),
            }],
        );

        // Stale values in tracked state must not survive a read
        let mut stale = created.clone();
        stale
            .attributes
            .insert("key".to_string(), Value::String("key-stale".to_string()));
        stale.attributes.insert(
            "computed_policy".to_string(),
            Value::Map(HashMap::new()),
        );
        stale
            .attributes
            .insert("ports".to_string(), Value::List(vec![]));

        let read = provider.read(&stale).await.unwrap();
        assert_eq!(
            read.get_string("key"),
            Some("key-vim.host.PortGroup-pg-test")
        );
        let Some(Value::List(ports)) = read.attributes.get("ports") else {
            panic!("expected ports list");
        };
        assert_eq!(ports.len(), 1);
        let Some(Value::Map(computed)) = read.attributes.get("computed_policy") else {
            panic!("expected computed policy map");
        };
        assert!(!computed.is_empty());
    }

    #[tokio::test]
    async fn update_resets_fields_absent_from_new_config() {
        let (sim, provider) = sim_with_host();
        sim.set_switch_defaults(
            "host-1",
            HostNetworkPolicy {
                security: Some(SecurityPolicy {
                    allow_promiscuous: Some(false),
                    forged_transmits: Some(true),
                    mac_changes: None,
                }),
                ..Default::default()
            },
        );

        let created = provider.create(&pg_resource("pg-test")).await.unwrap();
        assert_eq!(
            created.attributes.get("allow_promiscuous"),
            Some(&Value::Bool(true))
        );

        // New config changes the VLAN and drops the promiscuous override
        let mut to = pg_resource("pg-test").with_attribute("vlan_id", Value::Int(2000));
        to.attributes.remove("allow_promiscuous");

        let updated = provider.update(&created, &to).await.unwrap();
        assert_eq!(updated.attributes.get("vlan_id"), Some(&Value::Int(2000)));
        // Unspecified locally, so the switch-level default is in force again
        assert!(!updated.attributes.contains_key("allow_promiscuous"));
        let Some(Value::Map(computed)) = updated.attributes.get("computed_policy") else {
            panic!("expected computed policy map");
        };
        assert_eq!(
            computed.get("allow_promiscuous"),
            Some(&Value::String("false".to_string()))
        );
    }

    #[tokio::test]
    async fn update_wraps_remote_failure() {
        let (sim, provider) = sim_with_host();
        let created = provider.create(&pg_resource("pg-test")).await.unwrap();

        sim.fail_next("update_port_group");
        let err = provider
            .update(&created, &pg_resource("pg-test"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("error updating port group"));
    }

    #[tokio::test]
    async fn delete_then_read_reports_not_found() {
        let (_sim, provider) = sim_with_host();
        let state = provider.create(&pg_resource("pg-test")).await.unwrap();

        provider.delete(&state).await.unwrap();

        let read = provider.read(&state).await.unwrap();
        assert!(!read.exists);
    }

    #[tokio::test]
    async fn delete_wraps_remote_failure() {
        let (sim, provider) = sim_with_host();
        let state = provider.create(&pg_resource("pg-test")).await.unwrap();

        sim.fail_next("remove_port_group");
        let err = provider.delete(&state).await.unwrap_err();
        assert!(err.to_string().contains("error deleting port group"));
    }

    #[tokio::test]
    async fn read_requires_host_system_id() {
        let (_sim, provider) = sim_with_host();
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("pg-test".to_string()));
        let state = State::existing(ResourceId::new(HOST_PORT_GROUP, "pg-test"), attrs);

        let err = provider.read(&state).await.unwrap_err();
        assert!(err.to_string().contains("Host system ID is required"));
    }
}
