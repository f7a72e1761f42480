//! Shared port group spec: schema, expand, and flatten
//!
//! The attributes declared here describe the platform's port group spec
//! (name, virtual switch, VLAN, and the embedded network policy) and are
//! shared between the resources that carry such a spec. `expand` turns the
//! declarative attribute map into the wire spec; `flatten` is its inverse.
//! Optional policy attributes left unset expand to `None`, which the
//! platform treats as "inherit the switch-level default".

use std::collections::HashMap;

use halyard_core::provider::{ProviderError, ProviderResult};
use halyard_core::resource::Value;
use halyard_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::vim::types::{
    FailureCriteria, HostNetworkPolicy, HostPortGroupPort, HostPortGroupSpec, NicOrderPolicy,
    NicTeamingPolicy, SecurityPolicy, TrafficShapingPolicy,
};

fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

/// Shared sub-schema for the port group spec and its embedded policy
///
/// `active_nics` and `standby_nics` are required here; resources that can
/// fall back to switch-level teaming override them to optional.
pub fn port_group_spec_schema() -> ResourceSchema {
    ResourceSchema::new("port_group_spec")
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new()
                .with_description("The name of the port group."),
        )
        .attribute(
            AttributeSchema::new("virtual_switch_name", AttributeType::String)
                .required()
                .force_new()
                .with_description("The name of the virtual switch to bind this port group to."),
        )
        .attribute(
            AttributeSchema::new("vlan_id", AttributeType::Int)
                .with_description("The VLAN ID/trunk mode for this port group."),
        )
        .attribute(
            AttributeSchema::new("allow_promiscuous", AttributeType::Bool).with_description(
                "Enable promiscuous mode on the network. This flag indicates whether or not all \
                 traffic is seen on a given port.",
            ),
        )
        .attribute(
            AttributeSchema::new("allow_forged_transmits", AttributeType::Bool).with_description(
                "Controls whether or not the virtual network adapter is allowed to send network \
                 traffic with a different MAC address than that of its own.",
            ),
        )
        .attribute(
            AttributeSchema::new("allow_mac_changes", AttributeType::Bool).with_description(
                "Controls whether or not the Media Access Control (MAC) address can be changed.",
            ),
        )
        .attribute(
            AttributeSchema::new("teaming_policy", AttributeType::String).with_description(
                "The network adapter teaming policy. Can be one of loadbalance_ip, \
                 loadbalance_srcmac, loadbalance_srcid, or failover_explicit.",
            ),
        )
        .attribute(
            AttributeSchema::new("notify_switches", AttributeType::Bool).with_description(
                "If true, the teaming policy will notify the broadcast network of a NIC failover, \
                 triggering cache updates.",
            ),
        )
        .attribute(
            AttributeSchema::new("failback", AttributeType::Bool).with_description(
                "If true, the teaming policy will re-activate failed interfaces higher in \
                 precedence when they come back up.",
            ),
        )
        .attribute(
            AttributeSchema::new("check_beacon", AttributeType::Bool).with_description(
                "Enable beacon probing. Requires that the vSwitch has been configured to use a \
                 beacon. If disabled, link status is used only.",
            ),
        )
        .attribute(
            AttributeSchema::new("active_nics", string_list())
                .required()
                .with_description("List of active network adapters used for load balancing."),
        )
        .attribute(
            AttributeSchema::new("standby_nics", string_list())
                .required()
                .with_description("List of standby network adapters used for failover."),
        )
        .attribute(
            AttributeSchema::new("shaping_enabled", AttributeType::Bool)
                .with_description("Enable traffic shaping on this virtual switch or port group."),
        )
        .attribute(
            AttributeSchema::new("shaping_average_bandwidth", AttributeType::Int)
                .with_description("The average bandwidth in bits per second if shaping is enabled."),
        )
        .attribute(
            AttributeSchema::new("shaping_peak_bandwidth", AttributeType::Int)
                .with_description("The peak bandwidth during bursts in bits per second if shaping is enabled."),
        )
        .attribute(
            AttributeSchema::new("shaping_burst_size", AttributeType::Int)
                .with_description("The maximum burst size allowed in bytes if shaping is enabled."),
        )
}

/// Nested schema for a single entry of the computed `ports` list
pub fn port_schema() -> ResourceSchema {
    ResourceSchema::new("port")
        .attribute(
            AttributeSchema::new("key", AttributeType::String)
                .computed()
                .with_description("The linkable identifier for this port entry."),
        )
        .attribute(
            AttributeSchema::new("mac_addresses", string_list())
                .computed()
                .with_description("The MAC addresses of the network service of the virtual machine connected on this port."),
        )
        .attribute(
            AttributeSchema::new("type", AttributeType::String)
                .computed()
                .with_description("The type of the entity connected on this port."),
        )
}

fn get_bool(attrs: &HashMap<String, Value>, key: &str) -> Option<bool> {
    attrs.get(key).and_then(Value::as_bool)
}

fn get_int(attrs: &HashMap<String, Value>, key: &str) -> Option<i64> {
    attrs.get(key).and_then(Value::as_int)
}

fn get_string_list(attrs: &HashMap<String, Value>, key: &str) -> Option<Vec<String>> {
    match attrs.get(key) {
        Some(Value::List(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
        ),
        _ => None,
    }
}

/// Expand a declarative attribute map into a port group spec
pub fn expand_host_port_group_spec(
    attrs: &HashMap<String, Value>,
) -> ProviderResult<HostPortGroupSpec> {
    let name = attrs
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::new("Port group name is required"))?;
    let vswitch_name = attrs
        .get("virtual_switch_name")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::new("Virtual switch name is required"))?;

    let vlan_id = match get_int(attrs, "vlan_id") {
        Some(vlan) => i32::try_from(vlan)
            .map_err(|_| ProviderError::new(format!("VLAN ID {} is out of range", vlan)))?,
        None => 0,
    };

    Ok(HostPortGroupSpec {
        name: name.to_string(),
        vlan_id,
        vswitch_name: vswitch_name.to_string(),
        policy: expand_host_network_policy(attrs),
    })
}

fn expand_host_network_policy(attrs: &HashMap<String, Value>) -> HostNetworkPolicy {
    let allow_promiscuous = get_bool(attrs, "allow_promiscuous");
    let forged_transmits = get_bool(attrs, "allow_forged_transmits");
    let mac_changes = get_bool(attrs, "allow_mac_changes");
    let security = if allow_promiscuous.is_some() || forged_transmits.is_some() || mac_changes.is_some()
    {
        Some(SecurityPolicy {
            allow_promiscuous,
            forged_transmits,
            mac_changes,
        })
    } else {
        None
    };

    let policy = attrs.get("teaming_policy").and_then(Value::as_str);
    let notify_switches = get_bool(attrs, "notify_switches");
    // The declarative surface exposes failback, the platform stores its inverse
    let rolling_order = get_bool(attrs, "failback").map(|failback| !failback);
    let failure_criteria = get_bool(attrs, "check_beacon").map(|check_beacon| FailureCriteria {
        check_beacon: Some(check_beacon),
    });
    let active_nic = get_string_list(attrs, "active_nics");
    let standby_nic = get_string_list(attrs, "standby_nics");
    let nic_order = if active_nic.is_some() || standby_nic.is_some() {
        Some(NicOrderPolicy {
            active_nic: active_nic.unwrap_or_default(),
            standby_nic: standby_nic.unwrap_or_default(),
        })
    } else {
        None
    };
    let nic_teaming = if policy.is_some()
        || notify_switches.is_some()
        || rolling_order.is_some()
        || failure_criteria.is_some()
        || nic_order.is_some()
    {
        Some(NicTeamingPolicy {
            policy: policy.map(String::from),
            notify_switches,
            rolling_order,
            failure_criteria,
            nic_order,
        })
    } else {
        None
    };

    let enabled = get_bool(attrs, "shaping_enabled");
    let average_bandwidth = get_int(attrs, "shaping_average_bandwidth");
    let peak_bandwidth = get_int(attrs, "shaping_peak_bandwidth");
    let burst_size = get_int(attrs, "shaping_burst_size");
    let shaping = if enabled.is_some()
        || average_bandwidth.is_some()
        || peak_bandwidth.is_some()
        || burst_size.is_some()
    {
        Some(TrafficShapingPolicy {
            enabled,
            average_bandwidth,
            peak_bandwidth,
            burst_size,
        })
    } else {
        None
    };

    HostNetworkPolicy {
        security,
        nic_teaming,
        shaping,
    }
}

/// Flatten a port group spec back into declarative attributes
///
/// Inverse of [`expand_host_port_group_spec`]: only fields set on the wire
/// spec appear in the attribute map, so unset platform defaults never show
/// up as drift.
pub fn flatten_host_port_group_spec(spec: &HostPortGroupSpec) -> HashMap<String, Value> {
    let mut attrs = HashMap::new();
    attrs.insert("name".to_string(), Value::String(spec.name.clone()));
    attrs.insert(
        "virtual_switch_name".to_string(),
        Value::String(spec.vswitch_name.clone()),
    );
    attrs.insert("vlan_id".to_string(), Value::Int(spec.vlan_id as i64));
    flatten_host_network_policy(&spec.policy, &mut attrs);
    attrs
}

fn insert_bool(attrs: &mut HashMap<String, Value>, key: &str, value: Option<bool>) {
    if let Some(b) = value {
        attrs.insert(key.to_string(), Value::Bool(b));
    }
}

fn insert_int(attrs: &mut HashMap<String, Value>, key: &str, value: Option<i64>) {
    if let Some(n) = value {
        attrs.insert(key.to_string(), Value::Int(n));
    }
}

fn nic_list(nics: &[String]) -> Value {
    Value::List(nics.iter().cloned().map(Value::String).collect())
}

fn flatten_host_network_policy(policy: &HostNetworkPolicy, attrs: &mut HashMap<String, Value>) {
    if let Some(security) = &policy.security {
        insert_bool(attrs, "allow_promiscuous", security.allow_promiscuous);
        insert_bool(attrs, "allow_forged_transmits", security.forged_transmits);
        insert_bool(attrs, "allow_mac_changes", security.mac_changes);
    }

    if let Some(teaming) = &policy.nic_teaming {
        if let Some(policy_name) = &teaming.policy {
            attrs.insert(
                "teaming_policy".to_string(),
                Value::String(policy_name.clone()),
            );
        }
        insert_bool(attrs, "notify_switches", teaming.notify_switches);
        insert_bool(
            attrs,
            "failback",
            teaming.rolling_order.map(|rolling| !rolling),
        );
        if let Some(criteria) = &teaming.failure_criteria {
            insert_bool(attrs, "check_beacon", criteria.check_beacon);
        }
        if let Some(order) = &teaming.nic_order {
            attrs.insert("active_nics".to_string(), nic_list(&order.active_nic));
            attrs.insert("standby_nics".to_string(), nic_list(&order.standby_nic));
        }
    }

    if let Some(shaping) = &policy.shaping {
        insert_bool(attrs, "shaping_enabled", shaping.enabled);
        insert_int(attrs, "shaping_average_bandwidth", shaping.average_bandwidth);
        insert_int(attrs, "shaping_peak_bandwidth", shaping.peak_bandwidth);
        insert_int(attrs, "shaping_burst_size", shaping.burst_size);
    }
}

/// Flatten the effective post-inheritance policy into a string map for the
/// computed_policy attribute
pub fn computed_policy_attributes(policy: &HostNetworkPolicy) -> Value {
    let mut flat = HashMap::new();
    flatten_host_network_policy(policy, &mut flat);

    let mut map = HashMap::new();
    for (key, value) in flat {
        let rendered = match value {
            Value::String(s) => s,
            Value::Int(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(items) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => continue,
        };
        map.insert(key, Value::String(rendered));
    }
    Value::Map(map)
}

/// Derive the computed `ports` attribute from the live port list
pub fn port_attributes(ports: &[HostPortGroupPort]) -> Value {
    Value::List(
        ports
            .iter()
            .map(|port| {
                let mut map = HashMap::new();
                map.insert("key".to_string(), Value::String(port.key.clone()));
                map.insert(
                    "mac_addresses".to_string(),
                    Value::List(port.mac.iter().cloned().map(Value::String).collect()),
                );
                map.insert("type".to_string(), Value::String(port.port_type.clone()));
                Value::Map(map)
            })
            .collect(),
    )
}
