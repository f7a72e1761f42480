//! In-memory vSphere simulator
//!
//! A test double implementing the vim client traits over an in-memory
//! host/datacenter/network inventory. Supports seeding hosts and switch
//! defaults, assigns network references the way the platform does when a
//! port group is added, and can inject failures on the next matching
//! remote call to exercise error paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::vim::types::{
    Datacenter, FailureCriteria, HostNetworkPolicy, HostPortGroup, HostPortGroupPort,
    HostPortGroupSpec, ManagedObjectReference, NicTeamingPolicy, SecurityPolicy,
    TrafficShapingPolicy,
};
use crate::vim::{HostNetworkSystem, VimClient, VimError, VimResult};

#[derive(Default)]
struct SimHost {
    datacenter_id: String,
    switch_defaults: HostNetworkPolicy,
    port_groups: HashMap<String, HostPortGroupSpec>,
    ports: HashMap<String, Vec<HostPortGroupPort>>,
}

struct SimNetwork {
    reference: ManagedObjectReference,
    datacenter_id: String,
}

#[derive(Default)]
struct Inventory {
    hosts: HashMap<String, SimHost>,
    /// Datacenter managed object ID to display name
    datacenters: HashMap<String, String>,
    /// Port group name to the backing network object
    networks: HashMap<String, SimNetwork>,
    next_network: u32,
    /// Operations that fail on their next invocation
    fail_ops: Vec<String>,
}

impl Inventory {
    fn take_failure(&mut self, operation: &str) -> bool {
        if let Some(pos) = self.fail_ops.iter().position(|op| op == operation) {
            self.fail_ops.remove(pos);
            true
        } else {
            false
        }
    }
}

/// Simulated session handle
#[derive(Clone)]
pub struct SimClient {
    inner: Arc<Mutex<Inventory>>,
}

impl Default for SimClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClient {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inventory::default())),
        }
    }

    fn inventory(&self) -> MutexGuard<'_, Inventory> {
        self.inner.lock().expect("sim inventory lock poisoned")
    }

    /// Register a datacenter
    pub fn add_datacenter(&self, datacenter_id: &str, name: &str) {
        self.inventory()
            .datacenters
            .insert(datacenter_id.to_string(), name.to_string());
    }

    /// Register a host inside a datacenter
    pub fn add_host(&self, host_system_id: &str, datacenter_id: &str) {
        self.inventory().hosts.insert(
            host_system_id.to_string(),
            SimHost {
                datacenter_id: datacenter_id.to_string(),
                ..Default::default()
            },
        );
    }

    /// Set the switch-level default policy a host's port groups inherit from
    pub fn set_switch_defaults(&self, host_system_id: &str, defaults: HostNetworkPolicy) {
        if let Some(host) = self.inventory().hosts.get_mut(host_system_id) {
            host.switch_defaults = defaults;
        }
    }

    /// Attach live ports to an existing port group
    pub fn seed_ports(&self, host_system_id: &str, name: &str, ports: Vec<HostPortGroupPort>) {
        if let Some(host) = self.inventory().hosts.get_mut(host_system_id) {
            host.ports.insert(name.to_string(), ports);
        }
    }

    /// Make the next invocation of the named operation fail
    pub fn fail_next(&self, operation: &str) {
        self.inventory().fail_ops.push(operation.to_string());
    }

    /// Drop the backing network object while keeping the port group,
    /// simulating a port group whose network reference has gone missing
    pub fn orphan_network(&self, name: &str) {
        self.inventory().networks.remove(name);
    }
}

#[async_trait]
impl VimClient for SimClient {
    async fn host_network_system(
        &self,
        host_system_id: &str,
    ) -> VimResult<Box<dyn HostNetworkSystem>> {
        let inventory = self.inventory();
        if !inventory.hosts.contains_key(host_system_id) {
            return Err(VimError::HostNotFound(host_system_id.to_string()));
        }
        Ok(Box::new(SimHostNetworkSystem {
            host_system_id: host_system_id.to_string(),
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn datacenter(&self, datacenter_id: &str) -> VimResult<Datacenter> {
        let inventory = self.inventory();
        let name = inventory
            .datacenters
            .get(datacenter_id)
            .ok_or_else(|| VimError::DatacenterNotFound(datacenter_id.to_string()))?;
        Ok(Datacenter {
            name: name.clone(),
            reference: ManagedObjectReference::new("Datacenter", datacenter_id),
        })
    }

    async fn network_list(
        &self,
        name: &str,
        datacenter: Option<&Datacenter>,
    ) -> VimResult<Vec<ManagedObjectReference>> {
        let inventory = self.inventory();
        Ok(inventory
            .networks
            .get(name)
            .filter(|network| match datacenter {
                Some(dc) => network.datacenter_id == dc.reference.value,
                None => true,
            })
            .map(|network| vec![network.reference.clone()])
            .unwrap_or_default())
    }
}

struct SimHostNetworkSystem {
    host_system_id: String,
    inner: Arc<Mutex<Inventory>>,
}

impl SimHostNetworkSystem {
    fn inventory(&self) -> MutexGuard<'_, Inventory> {
        self.inner.lock().expect("sim inventory lock poisoned")
    }
}

#[async_trait]
impl HostNetworkSystem for SimHostNetworkSystem {
    async fn add_port_group(&self, spec: HostPortGroupSpec) -> VimResult<()> {
        let mut inventory = self.inventory();
        if inventory.take_failure("add_port_group") {
            return Err(VimError::remote("add_port_group", "injected failure"));
        }

        inventory.next_network += 1;
        let reference =
            ManagedObjectReference::new("Network", format!("network-{}", inventory.next_network));

        let host = inventory
            .hosts
            .get_mut(&self.host_system_id)
            .ok_or_else(|| VimError::HostNotFound(self.host_system_id.clone()))?;
        if host.port_groups.contains_key(&spec.name) {
            return Err(VimError::remote(
                "add_port_group",
                format!("port group {} already exists", spec.name),
            ));
        }
        let name = spec.name.clone();
        let datacenter_id = host.datacenter_id.clone();
        host.port_groups.insert(name.clone(), spec);

        inventory.networks.insert(
            name,
            SimNetwork {
                reference,
                datacenter_id,
            },
        );
        Ok(())
    }

    async fn update_port_group(&self, name: &str, spec: HostPortGroupSpec) -> VimResult<()> {
        let mut inventory = self.inventory();
        if inventory.take_failure("update_port_group") {
            return Err(VimError::remote("update_port_group", "injected failure"));
        }

        let host = inventory
            .hosts
            .get_mut(&self.host_system_id)
            .ok_or_else(|| VimError::HostNotFound(self.host_system_id.clone()))?;
        let entry = host.port_groups.get_mut(name).ok_or_else(|| {
            VimError::remote(
                "update_port_group",
                format!("port group {} does not exist", name),
            )
        })?;
        *entry = spec;
        Ok(())
    }

    async fn remove_port_group(&self, name: &str) -> VimResult<()> {
        let mut inventory = self.inventory();
        if inventory.take_failure("remove_port_group") {
            return Err(VimError::remote("remove_port_group", "injected failure"));
        }

        let host = inventory
            .hosts
            .get_mut(&self.host_system_id)
            .ok_or_else(|| VimError::HostNotFound(self.host_system_id.clone()))?;
        if host.port_groups.remove(name).is_none() {
            return Err(VimError::remote(
                "remove_port_group",
                format!("port group {} does not exist", name),
            ));
        }
        host.ports.remove(name);
        inventory.networks.remove(name);
        Ok(())
    }

    async fn port_group_by_name(&self, name: &str) -> VimResult<Option<HostPortGroup>> {
        let mut inventory = self.inventory();
        if inventory.take_failure("port_group_by_name") {
            return Err(VimError::remote("port_group_by_name", "injected failure"));
        }

        let host = inventory
            .hosts
            .get(&self.host_system_id)
            .ok_or_else(|| VimError::HostNotFound(self.host_system_id.clone()))?;
        Ok(host.port_groups.get(name).map(|spec| HostPortGroup {
            key: format!("key-vim.host.PortGroup-{}", name),
            spec: spec.clone(),
            computed_policy: effective_policy(&spec.policy, &host.switch_defaults),
            ports: host.ports.get(name).cloned().unwrap_or_default(),
        }))
    }
}

/// Merge a port group's local policy overrides with the switch-level
/// defaults: locally set fields win, inherited defaults fill the gaps.
pub fn effective_policy(
    local: &HostNetworkPolicy,
    defaults: &HostNetworkPolicy,
) -> HostNetworkPolicy {
    HostNetworkPolicy {
        security: merge_security(local.security.as_ref(), defaults.security.as_ref()),
        nic_teaming: merge_teaming(local.nic_teaming.as_ref(), defaults.nic_teaming.as_ref()),
        shaping: merge_shaping(local.shaping.as_ref(), defaults.shaping.as_ref()),
    }
}

fn merge_security(
    local: Option<&SecurityPolicy>,
    defaults: Option<&SecurityPolicy>,
) -> Option<SecurityPolicy> {
    match (local, defaults) {
        (Some(l), Some(d)) => Some(SecurityPolicy {
            allow_promiscuous: l.allow_promiscuous.or(d.allow_promiscuous),
            forged_transmits: l.forged_transmits.or(d.forged_transmits),
            mac_changes: l.mac_changes.or(d.mac_changes),
        }),
        (Some(policy), None) | (None, Some(policy)) => Some(policy.clone()),
        (None, None) => None,
    }
}

fn merge_teaming(
    local: Option<&NicTeamingPolicy>,
    defaults: Option<&NicTeamingPolicy>,
) -> Option<NicTeamingPolicy> {
    match (local, defaults) {
        (Some(l), Some(d)) => Some(NicTeamingPolicy {
            policy: l.policy.clone().or_else(|| d.policy.clone()),
            notify_switches: l.notify_switches.or(d.notify_switches),
            rolling_order: l.rolling_order.or(d.rolling_order),
            failure_criteria: match (&l.failure_criteria, &d.failure_criteria) {
                (Some(lf), Some(df)) => Some(FailureCriteria {
                    check_beacon: lf.check_beacon.or(df.check_beacon),
                }),
                (Some(criteria), None) | (None, Some(criteria)) => Some(criteria.clone()),
                (None, None) => None,
            },
            // An explicit NIC order overrides the switch order entirely
            nic_order: l.nic_order.clone().or_else(|| d.nic_order.clone()),
        }),
        (Some(policy), None) | (None, Some(policy)) => Some(policy.clone()),
        (None, None) => None,
    }
}

fn merge_shaping(
    local: Option<&TrafficShapingPolicy>,
    defaults: Option<&TrafficShapingPolicy>,
) -> Option<TrafficShapingPolicy> {
    match (local, defaults) {
        (Some(l), Some(d)) => Some(TrafficShapingPolicy {
            enabled: l.enabled.or(d.enabled),
            average_bandwidth: l.average_bandwidth.or(d.average_bandwidth),
            peak_bandwidth: l.peak_bandwidth.or(d.peak_bandwidth),
            burst_size: l.burst_size.or(d.burst_size),
        }),
        (Some(policy), None) | (None, Some(policy)) => Some(policy.clone()),
        (None, None) => None,
    }
}
