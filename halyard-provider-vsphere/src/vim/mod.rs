//! vim - Client abstraction over the vSphere management API
//!
//! The provider talks to the platform exclusively through the traits in
//! this module, so lifecycle code stays independent of the transport and
//! tests can substitute an in-memory implementation.

pub mod client;
pub mod types;

pub use client::{
    DEFAULT_API_TIMEOUT, HostNetworkSystem, VimClient, VimError, VimResult, with_api_timeout,
};
pub use types::{
    Datacenter, FailureCriteria, HostNetworkPolicy, HostPortGroup, HostPortGroupPort,
    HostPortGroupSpec, ManagedObjectReference, NicOrderPolicy, NicTeamingPolicy, SecurityPolicy,
    TrafficShapingPolicy,
};
