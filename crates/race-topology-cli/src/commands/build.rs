use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use race_topology::{
    InstanceRole, NodeInstanceTopology, PlanConfig, create_topology_from_instance_counts,
    create_topology_from_nodes_per_instance, create_topology_from_resource_requirements, write_topology_to_file,
};

pub fn spread(plan_path: &Path, out: &Path, colocation: Option<bool>) -> anyhow::Result<()> {
    let plan = load_plan(plan_path)?;
    let instance_counts = plan
        .instance_counts
        .as_ref()
        .context("plan has no [instance_counts] section")?;
    let node_counts = plan.node_counts.as_ref().context("plan has no [node_counts] section")?;

    let topology = create_topology_from_instance_counts(
        instance_counts,
        node_counts,
        colocation.unwrap_or(plan.allow_colocation),
    )?;
    save(out, &topology)
}

pub fn density(plan_path: &Path, out: &Path, colocation: Option<bool>) -> anyhow::Result<()> {
    let plan = load_plan(plan_path)?;
    let nodes_per_instance = plan
        .nodes_per_instance
        .as_ref()
        .context("plan has no [nodes_per_instance] section")?;

    let topology = create_topology_from_nodes_per_instance(
        plan.instance_counts.as_ref(),
        plan.node_counts.as_ref(),
        nodes_per_instance,
        colocation.unwrap_or(plan.allow_colocation),
    )?;
    save(out, &topology)
}

pub fn pack(
    plan_path: &Path,
    out: &Path,
    colocation: Option<bool>,
    type_overrides: &BTreeMap<InstanceRole, String>,
) -> anyhow::Result<()> {
    let plan = load_plan(plan_path)?;
    let node_counts = plan.node_counts.as_ref().context("plan has no [node_counts] section")?;
    let instance_types = plan.resolve_instance_types(type_overrides)?;

    let topology = create_topology_from_resource_requirements(
        node_counts,
        &instance_types,
        &plan.resources,
        colocation.unwrap_or(plan.allow_colocation),
    )?;
    save(out, &topology)
}

pub(crate) fn load_plan(path: &Path) -> anyhow::Result<PlanConfig> {
    PlanConfig::from_file(path).with_context(|| format!("failed to load plan {}", path.display()))
}

fn save(out: &Path, topology: &NodeInstanceTopology) -> anyhow::Result<()> {
    write_topology_to_file(out, topology)?;
    println!(
        "✓ Wrote {} ({} instances, {} nodes)",
        out.display(),
        topology.total_instances(),
        topology.total_node_counts().total()
    );
    Ok(())
}
