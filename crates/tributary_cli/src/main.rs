//! Tributary CLI
//!
//! Compiles XML execution plans into topologies.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tributary_core::{DeploymentConfig, StreamDefinitionParser};
use tributary_plan::{Topology, TopologyAssembler, Wiring, parse_plan};

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Tributary - compile streaming execution plans into wired topologies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a plan and print the topology as JSON
    Compile {
        /// Path to plan file
        #[arg(short, long)]
        plan: PathBuf,
        /// Write the topology here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        deployment: DeploymentArgs,
    },
    /// Resolve a plan and list its edges
    Check {
        /// Path to plan file
        #[arg(short, long)]
        plan: PathBuf,
        #[command(flatten)]
        deployment: DeploymentArgs,
    },
}

#[derive(Args, Default)]
struct DeploymentArgs {
    /// Deployment config JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Execution plan name (defaults to the plan file stem)
    #[arg(long)]
    name: Option<String>,
    /// Tenant id
    #[arg(long)]
    tenant: Option<i32>,
    /// Management heartbeat interval in milliseconds
    #[arg(long)]
    heartbeat_ms: Option<u64>,
}

impl DeploymentArgs {
    fn resolve(&self, plan: &Path) -> Result<DeploymentConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .wrap_err_with(|| format!("reading config {}", path.display()))?;
                DeploymentConfig::from_json(&json)?
            }
            None => DeploymentConfig::new(
                plan.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
        };
        if let Some(name) = &self.name {
            config.execution_plan_name = name.clone();
        }
        if let Some(tenant) = self.tenant {
            config = config.with_tenant_id(tenant);
        }
        if let Some(interval) = self.heartbeat_ms {
            config = config.with_heartbeat_interval(interval);
        }
        Ok(config)
    }
}

fn read_plan(path: &Path) -> Result<String> {
    fs::read_to_string(path).wrap_err_with(|| format!("reading plan {}", path.display()))
}

fn compile(plan: &Path, deployment: &DeploymentArgs) -> Result<Topology> {
    let document = read_plan(plan)?;
    let assembler = TopologyAssembler::new(deployment.resolve(plan)?);
    let topology = assembler
        .assemble_xml(&document, Topology::new())
        .wrap_err_with(|| format!("compiling {}", plan.display()))?;
    Ok(topology)
}

fn check(plan: &Path, deployment: &DeploymentArgs) -> Result<Wiring> {
    let document = read_plan(plan)?;
    let assembler = TopologyAssembler::new(deployment.resolve(plan)?);
    let parsed = parse_plan(&document, &StreamDefinitionParser::new())?;
    let wiring = assembler
        .wire(&parsed)
        .wrap_err_with(|| format!("resolving {}", plan.display()))?;
    Ok(wiring)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tributary_plan=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            plan,
            output,
            deployment,
        } => {
            let topology = compile(&plan, &deployment)?;
            let json = serde_json::to_string_pretty(&topology)?;
            match output {
                Some(path) => {
                    fs::write(&path, json).wrap_err_with(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), "wrote topology");
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Commands::Check { plan, deployment } => {
            let wiring = check(&plan, &deployment)?;
            for edge in &wiring.edges {
                println!("{}", edge);
            }
            println!("{}: {} edges", plan.display(), wiring.len());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"<execution-plan>
  <event-receiver name="A" parallel="1">
    <streams><stream>define stream s1 (userId string);</stream></streams>
  </event-receiver>
  <event-publisher name="C" parallel="1">
    <input-streams><stream partition="userId">define stream s1 (userId string);</stream></input-streams>
  </event-publisher>
</execution-plan>"#;

    fn write_plan(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("orders.xml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_cli_parses_compile() {
        let cli = Cli::try_parse_from([
            "tributary", "compile", "--plan", "p.xml", "--name", "n", "--tenant", "3",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Compile { .. }));
    }

    #[test]
    fn test_deployment_defaults_to_file_stem() {
        let config = DeploymentArgs::default()
            .resolve(Path::new("/plans/orders.xml"))
            .unwrap();
        assert_eq!(config.execution_plan_name, "orders");
    }

    #[test]
    fn test_deployment_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("deploy.json");
        fs::write(&config_path, r#"{"execution_plan_name": "from-file", "tenant_id": 1}"#).unwrap();

        let args = DeploymentArgs {
            config: Some(config_path),
            tenant: Some(9),
            ..Default::default()
        };
        let config = args.resolve(Path::new("orders.xml")).unwrap();

        assert_eq!(config.execution_plan_name, "from-file");
        assert_eq!(config.tenant_id, 9);
    }

    #[test]
    fn test_compile_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plan(&dir, PLAN);

        let topology = compile(&path, &DeploymentArgs::default()).unwrap();
        assert_eq!(topology.node_count(), 2);
        assert_eq!(topology.dependencies("C"), vec!["A"]);
    }

    #[test]
    fn test_check_reports_unresolved_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plan(
            &dir,
            r#"<execution-plan>
  <event-publisher name="C" parallel="1">
    <input-streams><stream>define stream s9 (a int);</stream></input-streams>
  </event-publisher>
</execution-plan>"#,
        );

        let err = check(&path, &DeploymentArgs::default()).unwrap_err();
        let core = err.downcast_ref::<tributary_core::CoreError>().unwrap();
        assert!(core.is_resolution_failure());
    }

    #[test]
    fn test_compile_missing_file() {
        let result = compile(Path::new("/nonexistent/plan.xml"), &DeploymentArgs::default());
        assert!(result.is_err());
    }
}
