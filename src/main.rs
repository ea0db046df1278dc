//! crag-edge CLI entry point.
//!
//! Loads the prebuilt SSR bundle and serves every request through it.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crag_edge_common::ConfigFile;
use crag_edge_core::{CompiledBundle, WasmEngine};
use crag_edge_server::{EdgeServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "crag-edge")]
#[command(version)]
#[command(about = "Serve the climbing-location SSR bundle at the edge", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CRAG_EDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overrides `server.bind_addr`
    #[arg(short, long, env = "BIND_ADDR")]
    bind: Option<SocketAddr>,

    /// SSR bundle (.wasm, or .cwasm with `bundle.precompiled`), overrides `bundle.path`
    #[arg(long, env = "CRAG_EDGE_BUNDLE")]
    bundle: Option<PathBuf>,

    /// Enable JSON logging
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crag_edge=debug".into()),
        )
        .with(args.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting crag-edge");

    // Load configuration
    let file = match &args.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => ConfigFile::default(),
    };

    let mut server_config =
        ServerConfig::from_file(&file.server).context("Invalid [server] configuration")?;
    if let Some(bind_addr) = args.bind {
        server_config = server_config.with_bind_addr(bind_addr);
    }

    let Some(bundle_path) = args.bundle.or_else(|| file.bundle.path.map(PathBuf::from)) else {
        bail!("No SSR bundle configured. Pass --bundle or set bundle.path in the config file");
    };

    info!(
        bind_addr = %server_config.bind_addr,
        bundle = %bundle_path.display(),
        precompiled = file.bundle.precompiled,
        "Configuration loaded"
    );

    // Compile the bundle once, up front
    let engine =
        WasmEngine::new(&file.runtime.engine).context("Failed to create the Wasm engine")?;

    let bundle = if file.bundle.precompiled {
        CompiledBundle::from_precompiled(engine.inner(), &bundle_path)
    } else {
        CompiledBundle::from_file(engine.inner(), &bundle_path)
    }
    .with_context(|| format!("Failed to load SSR bundle {}", bundle_path.display()))?;

    if !bundle.has_entry_point() {
        warn!(
            hash = bundle.content_hash(),
            "Bundle does not export `_start`; every render will fail"
        );
    }

    info!(hash = bundle.content_hash(), "SSR bundle loaded");

    let server = EdgeServer::for_bundle(engine, bundle, file.runtime.execution, server_config)?;

    info!("Server initialized. Available endpoints:");
    info!("  GET  /_edge/health        - Health check");
    info!("  GET  /_edge/ready         - Readiness check");
    info!("  ANY  /*                   - Rendered by the SSR bundle");

    server.run().await?;

    Ok(())
}
