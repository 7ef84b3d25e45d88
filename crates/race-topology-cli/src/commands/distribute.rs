use std::path::Path;

use race_topology::{
    distribute_personas_to_instances, generate_personas, read_personas_from_file, read_topology_from_file,
    write_distribution_to_file,
};
use tracing::info;

pub fn distribute(topology_path: &Path, personas_path: Option<&Path>, out: &Path) -> anyhow::Result<()> {
    let topology = read_topology_from_file(topology_path)?;
    let personas = match personas_path {
        Some(path) => read_personas_from_file(path)?,
        None => {
            info!("no persona file given, generating names from topology capacity");
            generate_personas(&topology.total_node_counts())
        }
    };

    let distribution = distribute_personas_to_instances(&personas, &topology)?;
    write_distribution_to_file(out, &distribution)?;
    println!(
        "✓ Wrote {} ({} personas on {} instances)",
        out.display(),
        distribution.total_personas(),
        distribution.total_instances()
    );
    Ok(())
}
