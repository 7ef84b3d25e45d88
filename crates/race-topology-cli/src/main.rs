use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use race_topology::{Architecture, InstanceKind, InstanceRole};

mod commands;

#[derive(Parser)]
#[command(
    name = "race-topology",
    about = "Plan which cloud instances host which RACE nodes",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spread nodes evenly across the plan's fixed instance counts
    Spread {
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Size instances from a nodes-per-instance density.
    ///
    /// Reads [nodes_per_instance] plus exactly one of [instance_counts]
    /// or [node_counts] from the plan.
    Density {
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Bin-pack nodes onto instance types by their resource requirements
    Pack {
        #[command(flatten)]
        build: BuildArgs,
        #[command(flatten)]
        types: InstanceTypeArgs,
    },
    /// Assign persona names to the instances of a topology
    Distribute {
        /// Topology file to distribute onto
        #[arg(short, long)]
        topology: PathBuf,
        /// JSON file of persona names keyed by node role.
        /// Generated from the topology's capacity if not given.
        #[arg(short, long)]
        personas: Option<PathBuf>,
        /// Where to write the distribution file
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Check whether a saved topology still satisfies a plan
    Validate {
        #[arg(short, long)]
        topology: PathBuf,
        #[arg(short, long)]
        plan: PathBuf,
    },
    /// Print the per-instance node counts of a topology
    Show {
        #[arg(short, long)]
        topology: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Plan file (TOML)
    #[arg(short, long)]
    plan: PathBuf,
    /// Where to write the topology file
    #[arg(short, long)]
    out: PathBuf,
    /// Let clients and servers share instances, overriding the plan
    #[arg(long, conflicts_with = "no_colocation")]
    allow_colocation: bool,
    /// Keep clients and servers on separate instances, overriding the plan
    #[arg(long)]
    no_colocation: bool,
}

impl BuildArgs {
    fn colocation(&self) -> Option<bool> {
        if self.allow_colocation {
            Some(true)
        } else if self.no_colocation {
            Some(false)
        } else {
            None
        }
    }
}

/// Instance type per instance role, overriding the plan's [instance_types].
#[derive(Args, Default)]
struct InstanceTypeArgs {
    #[arg(long = "android-arm64-instance-type")]
    android_arm64: Option<String>,
    #[arg(long = "android-x86_64-instance-type")]
    android_x86_64: Option<String>,
    #[arg(long = "linux-gpu-arm64-instance-type")]
    linux_gpu_arm64: Option<String>,
    #[arg(long = "linux-gpu-x86_64-instance-type")]
    linux_gpu_x86_64: Option<String>,
    #[arg(long = "linux-arm64-instance-type")]
    linux_arm64: Option<String>,
    #[arg(long = "linux-x86_64-instance-type")]
    linux_x86_64: Option<String>,
}

impl InstanceTypeArgs {
    fn overrides(&self) -> BTreeMap<InstanceRole, String> {
        use Architecture::*;
        use InstanceKind::*;
        [
            (InstanceRole::new(Android, Arm64), &self.android_arm64),
            (InstanceRole::new(Android, X86_64), &self.android_x86_64),
            (InstanceRole::new(LinuxGpu, Arm64), &self.linux_gpu_arm64),
            (InstanceRole::new(LinuxGpu, X86_64), &self.linux_gpu_x86_64),
            (InstanceRole::new(Linux, Arm64), &self.linux_arm64),
            (InstanceRole::new(Linux, X86_64), &self.linux_x86_64),
        ]
        .into_iter()
        .filter_map(|(role, name)| name.clone().map(|name| (role, name)))
        .collect()
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("race_topology=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Spread { build } => {
            commands::build::spread(&build.plan, &build.out, build.colocation())
        }
        Commands::Density { build } => {
            commands::build::density(&build.plan, &build.out, build.colocation())
        }
        Commands::Pack { build, types } => {
            commands::build::pack(&build.plan, &build.out, build.colocation(), &types.overrides())
        }
        Commands::Distribute { topology, personas, out } => {
            commands::distribute::distribute(&topology, personas.as_deref(), &out)
        }
        Commands::Validate { topology, plan } => {
            commands::inspect::validate(&topology, &plan)
        }
        Commands::Show { topology, format } => {
            commands::inspect::show(&topology, &format)
        }
    }
}
