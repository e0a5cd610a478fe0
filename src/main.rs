//! emctl shadow controller (v1)
//!
//! Watches the cluster for mesh services and creates shadow copies of them.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                        SHADOW CONTROLLER                         │
//!   │                                                                  │
//!   │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//!   │  │ ServiceSource│──▶│SearchHandler │──▶│   CallbackRegistry   │  │
//!   │  │ kube | mesh  │   │ (ticker loop)│   │ pending/cloned/failed│  │
//!   │  └──────────────┘   └──────┬───────┘   └──────────▲───────────┘  │
//!   │                            │ CloneJob             │ mark_done    │
//!   │                            ▼                      │              │
//!   │                    ┌───────────────┐   ┌──────────┴───────────┐  │
//!   │                    │ bounded queue │──▶│ CloneHandler         │──┼──▶ Kubernetes API
//!   │                    └───────────────┘   └──────────────────────┘  │
//!   │                                                                  │
//!   │  config · lifecycle (signals, shutdown) · observability · resilience
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use emctl_shadow::cluster::{KubeServiceSource, KubeShadowApi, MeshServiceSource, ServiceSource};
use emctl_shadow::config::loader::resolve_config;
use emctl_shadow::config::SourceKind;
use emctl_shadow::lifecycle::signals::shutdown_on_signal;
use emctl_shadow::observability::{logging, metrics};
use emctl_shadow::{Controller, ControllerState, Shutdown};

#[derive(Parser)]
#[command(name = "emctl-shadow")]
#[command(about = "Discovers mesh services and maintains shadow copies of them", long_about = None)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "emctl-shadow.toml")]
    config: PathBuf,

    /// Mesh control-plane address; overrides the config file.
    #[arg(long, env = "EMCTL_MESH_SERVER")]
    mesh_server: Option<String>,

    /// Only watch this namespace.
    #[arg(short, long)]
    namespace: Option<String>,

    /// Discovery source.
    #[arg(long, value_enum)]
    source: Option<SourceArg>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SourceArg {
    Kubernetes,
    Mesh,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Kubernetes => SourceKind::Kubernetes,
            SourceArg::Mesh => SourceKind::Mesh,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = resolve_config(Some(&cli.config), cli.mesh_server.as_deref())
        .context("Failed to resolve configuration")?;
    if let Some(ns) = cli.namespace {
        config.discovery.namespace = ns;
    }
    if let Some(source) = cli.source {
        config.discovery.source = source.into();
    }

    logging::init_logging(&config.observability);
    tracing::info!("emctl-shadow v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let namespace = Some(config.discovery.namespace.as_str()).filter(|ns| !ns.is_empty());
    let source: Arc<dyn ServiceSource> = match config.discovery.source {
        SourceKind::Kubernetes => Arc::new(KubeServiceSource::new(
            client.clone(),
            namespace,
            &config.discovery.label_selector,
        )),
        SourceKind::Mesh => Arc::new(
            MeshServiceSource::new(&config.mesh_server, namespace).context("Invalid mesh server address")?,
        ),
    };

    let controller = Controller::builder(config)
        .source(source)
        .api(Arc::new(KubeShadowApi::new(client)))
        .build()
        .context("Failed to build shadow controller")?;

    let shutdown = Shutdown::new();
    let mut handle = controller.start(&shutdown);
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let state = handle.done().await;
    let summary = handle.registry().summary();
    tracing::info!(
        pending = summary.pending,
        cloned = summary.cloned,
        failed = summary.failed,
        "Shutdown complete"
    );

    if state == ControllerState::Crashed {
        anyhow::bail!("shadow controller crashed");
    }
    Ok(())
}
