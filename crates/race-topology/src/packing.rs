//! Topology builder: pack nodes onto instances sized by their resource needs.
//!
//! First-fit-descending over [`NodeRole::ALL`]: each node goes to the first
//! existing host (in creation order) that can take it, and a new host of the
//! role's instance type is created only when none can.

use tracing::{debug, info};

use crate::error::{TopologyError, TopologyResult};
use crate::host::{HostInstance, HostRestriction, NodeUnit};
use crate::resources::{InstanceTypeDetails, InstanceTypes, NodeResourceRequirements, ResourceConstraints};
use crate::roles::{InstanceKind, NodeCounts, NodeRole, Platform};
use crate::topology::NodeInstanceTopology;

/// Build a topology by bin packing `node_counts` onto the selected instance types.
///
/// Every selected type is validated against its role first. A node that
/// cannot fit on a brand-new, empty instance of its type is an
/// [`TopologyError::Infeasible`] error; no other type is tried.
pub fn create_topology_from_resource_requirements(
    node_counts: &NodeCounts,
    instance_types: &InstanceTypes,
    resources: &ResourceConstraints,
    allow_colocation: bool,
) -> TopologyResult<NodeInstanceTopology> {
    instance_types.validate()?;

    let mut hosts: Vec<HostInstance> = Vec::new();
    for role in NodeRole::ALL {
        let count = node_counts[role];
        if count == 0 {
            continue;
        }
        let instance_role = role.instance_role();
        let details = instance_types.get(instance_role).ok_or_else(|| {
            TopologyError::config_with_hint(
                format!("{count} {role} nodes requested but no {instance_role} instance type was selected"),
                format!("set {}", instance_role.type_flag()),
            )
        })?;

        let unit = NodeUnit {
            role,
            requirements: resources.requirements(role.kind),
        };
        for _ in 0..count {
            if hosts.iter_mut().any(|host| host.add_if_able_to_host(&unit)) {
                continue;
            }
            let restriction = restriction_for(role, allow_colocation);
            let mut host = HostInstance::new(instance_role, details.clone(), restriction);
            if !host.add_if_able_to_host(&unit) {
                return Err(TopologyError::Infeasible {
                    role,
                    instance_type: details.name.clone(),
                    reason: shortfall(details, &unit.requirements),
                });
            }
            debug!(
                instance_type = %details.name,
                %instance_role,
                ?restriction,
                index = hosts.len(),
                "created host instance"
            );
            hosts.push(host);
        }
    }

    let mut topology = NodeInstanceTopology::default();
    for host in &hosts {
        topology.get_mut(host.role()).push(host.capacity());
    }

    info!(
        instances = hosts.len(),
        nodes = node_counts.total(),
        allow_colocation,
        "built topology from resource requirements"
    );
    Ok(topology)
}

/// Restriction applied to a host created for `role`.
///
/// Without colocation a host only takes the role that created it. With
/// colocation, Android hosts stay Android-only and GPU hosts stay GPU-only so
/// cheaper nodes never occupy them; plain Linux hosts take anything they can.
pub fn restriction_for(role: NodeRole, allow_colocation: bool) -> HostRestriction {
    if !allow_colocation {
        return HostRestriction::Role(role);
    }
    match role.kind.instance_kind() {
        InstanceKind::Android => HostRestriction::Platform(Platform::Android),
        InstanceKind::LinuxGpu => HostRestriction::GpuOnly,
        InstanceKind::Linux => HostRestriction::None,
    }
}

fn shortfall(details: &InstanceTypeDetails, requirements: &NodeResourceRequirements) -> String {
    let usable_ram = details.usable_ram_mb();
    if requirements.ram_mb > usable_ram {
        return format!(
            "needs {} MB of RAM but only {usable_ram:.0} MB is usable after the management reserve",
            requirements.ram_mb
        );
    }
    if requirements.cpus > f64::from(details.cpu_count) {
        return format!("needs {} CPUs but the instance has {}", requirements.cpus, details.cpu_count);
    }
    if requirements.gpus > f64::from(details.gpu_count) {
        return format!("needs {} GPUs but the instance has {}", requirements.gpus, details.gpu_count);
    }
    "resource requirements exceed the instance type".to_string()
}
