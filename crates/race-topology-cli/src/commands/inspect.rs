use std::path::Path;

use anyhow::Context;
use race_topology::file::to_sorted_json;
use race_topology::{NodeKind, is_topology_compatible_with, read_topology_from_file};

use super::build::load_plan;

pub fn validate(topology_path: &Path, plan_path: &Path) -> anyhow::Result<()> {
    let topology = read_topology_from_file(topology_path)?;
    let plan = load_plan(plan_path)?;
    let max_instance_counts = plan
        .max_instance_counts
        .as_ref()
        .or(plan.instance_counts.as_ref())
        .context("plan has neither [max_instance_counts] nor [instance_counts]")?;
    let min_node_counts = plan.node_counts.clone().unwrap_or_default();

    if !is_topology_compatible_with(&topology, max_instance_counts, &min_node_counts) {
        anyhow::bail!(
            "topology {} is not compatible with plan {}",
            topology_path.display(),
            plan_path.display()
        );
    }
    println!("✓ {} is compatible with {}", topology_path.display(), plan_path.display());
    Ok(())
}

pub fn show(topology_path: &Path, format: &str) -> anyhow::Result<()> {
    let topology = read_topology_from_file(topology_path)?;

    match format {
        "json" => {
            println!("{}", to_sorted_json(&topology)?);
        }
        _ => {
            for (role, instances) in topology.iter() {
                for (index, capacity) in instances.iter().enumerate() {
                    let counts: Vec<String> = NodeKind::ALL
                        .iter()
                        .filter(|kind| capacity.count(**kind) > 0)
                        .map(|kind| format!("{kind}={}", capacity.count(*kind)))
                        .collect();
                    println!("{role} #{index}: {} ({} nodes)", counts.join(" "), capacity.total());
                }
            }
        }
    }

    Ok(())
}
