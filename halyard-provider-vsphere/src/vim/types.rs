//! Wire-shaped data types for the vSphere management API
//!
//! These mirror the platform's host networking objects closely enough for
//! the provider to round-trip them. Optional policy fields left as `None`
//! are unset on the platform side and inherit the virtual switch defaults.

use serde::{Deserialize, Serialize};

/// Opaque reference to a managed object on the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedObjectReference {
    /// Managed object type (e.g., "Network", "HostSystem")
    #[serde(rename = "type")]
    pub kind: String,
    /// Platform-assigned opaque reference value
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// A datacenter handle, used to scope finder searches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datacenter {
    pub name: String,
    pub reference: ManagedObjectReference,
}

/// Layer-2 security overrides for a port group or switch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub allow_promiscuous: Option<bool>,
    pub forged_transmits: Option<bool>,
    pub mac_changes: Option<bool>,
}

/// Explicit NIC failover order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NicOrderPolicy {
    pub active_nic: Vec<String>,
    pub standby_nic: Vec<String>,
}

/// Criteria for detecting an uplink failure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureCriteria {
    pub check_beacon: Option<bool>,
}

/// NIC teaming configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NicTeamingPolicy {
    /// Teaming algorithm (e.g., "loadbalance_srcid", "failover_explicit")
    pub policy: Option<String>,
    pub notify_switches: Option<bool>,
    /// When true, failed NICs are not restored to active duty on recovery
    pub rolling_order: Option<bool>,
    pub failure_criteria: Option<FailureCriteria>,
    pub nic_order: Option<NicOrderPolicy>,
}

/// Outbound traffic shaping configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficShapingPolicy {
    pub enabled: Option<bool>,
    pub average_bandwidth: Option<i64>,
    pub peak_bandwidth: Option<i64>,
    pub burst_size: Option<i64>,
}

/// The network policy carried by a port group or virtual switch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostNetworkPolicy {
    pub security: Option<SecurityPolicy>,
    pub nic_teaming: Option<NicTeamingPolicy>,
    pub shaping: Option<TrafficShapingPolicy>,
}

/// Specification sent to the platform when adding or updating a port group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPortGroupSpec {
    pub name: String,
    pub vlan_id: i32,
    pub vswitch_name: String,
    pub policy: HostNetworkPolicy,
}

/// A port currently in use on a port group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostPortGroupPort {
    pub key: String,
    pub mac: Vec<String>,
    /// Connectee type (e.g., "virtualMachine", "host")
    pub port_type: String,
}

/// The platform's live representation of a port group
///
/// `computed_policy` is the policy actually in force: the spec's local
/// overrides merged with the virtual switch's inherited defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPortGroup {
    /// Linkable key for this port group
    pub key: String,
    pub spec: HostPortGroupSpec,
    pub computed_policy: HostNetworkPolicy,
    pub ports: Vec<HostPortGroupPort>,
}
