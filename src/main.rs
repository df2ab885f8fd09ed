//! targetd Operator
//!
//! Parses connection settings, initializes logging, constructs both
//! backend provisioners, and runs a connectivity self-test against the
//! targetd endpoint. The reconciliation loop that drives provision and
//! delete calls is an external collaborator; this binary verifies that
//! the bridge it drives is correctly configured and reachable.

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use targetd_operator::{
    BackendConfig, BackendFactory, Client, IscsiConfig, RpcTransport, TargetdConfig,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Volume provisioning bridge for the targetd storage daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scheme of the targetd connection, http or https
    #[arg(long, env = "TARGETD_SCHEME", default_value = "http")]
    targetd_scheme: String,

    /// Username for the targetd connection
    #[arg(long, env = "TARGETD_USERNAME", default_value = "admin")]
    targetd_username: String,

    /// Password for the targetd connection
    #[arg(long, env = "TARGETD_PASSWORD", default_value = "")]
    targetd_password: String,

    /// IP or DNS name of the targetd server
    #[arg(long, env = "TARGETD_ADDRESS", default_value = "localhost")]
    targetd_address: String,

    /// Port on which targetd is listening
    #[arg(long, env = "TARGETD_PORT", default_value = "18700")]
    targetd_port: u16,

    /// Per-call request timeout in seconds
    #[arg(long, env = "TARGETD_TIMEOUT_SECS", default_value = "30")]
    targetd_timeout_secs: u64,

    /// Name of this provisioner, used to derive the CHAP secret name
    #[arg(long, env = "PROVISIONER_NAME", default_value = "iscsi-targetd")]
    provisioner_name: String,

    /// Filesystem to use when not specified by the caller
    #[arg(long, env = "DEFAULT_FS", default_value = "xfs")]
    default_fs: String,

    /// Path where the credential for session CHAP authentication can be found
    #[arg(
        long,
        env = "SESSION_CHAP_CREDENTIAL_FILE_PATH",
        default_value = "/var/run/secrets/iscsi-provisioner/session-chap-credential.properties"
    )]
    session_chap_credential_file_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting targetd operator");
    info!("  Version: {}", targetd_operator::VERSION);
    info!(
        "  Endpoint: {}://{}:{}/targetrpc",
        args.targetd_scheme, args.targetd_address, args.targetd_port
    );

    let config = TargetdConfig {
        scheme: args.targetd_scheme.clone(),
        username: args.targetd_username.clone(),
        password: args.targetd_password.clone(),
        address: args.targetd_address.clone(),
        port: args.targetd_port,
        timeout: Duration::from_secs(args.targetd_timeout_secs),
    };
    let client: Arc<dyn RpcTransport> = Arc::new(Client::new(config));

    let backend_config = BackendConfig {
        iscsi: IscsiConfig {
            default_fs: args.default_fs.clone(),
            chap_credential_path: args.session_chap_credential_file_path.clone(),
            provisioner_name: args.provisioner_name.clone(),
        },
    };

    let iscsi = BackendFactory::create("iscsi", client.clone(), backend_config.clone())
        .context("failed to create iscsi provisioner")?;
    info!("iscsi provisioner created (block: {})", iscsi.supports_block());

    let nfs = BackendFactory::create("nfs", client.clone(), backend_config)
        .context("failed to create nfs provisioner")?;
    info!("nfs provisioner created (block: {})", nfs.supports_block());

    self_test(client.as_ref())
        .await
        .context("targetd connectivity check failed")?;
    info!("targetd connectivity verified");

    Ok(())
}

// =============================================================================
// Connectivity Self-Test
// =============================================================================

async fn self_test(client: &dyn RpcTransport) -> anyhow::Result<()> {
    let exports = client.call("export_list", Value::Null).await?;
    info!("  iscsi exports: {}", list_len(&exports));

    let volumes = client.call("fs_list", Value::Null).await?;
    info!("  filesystem volumes: {}", list_len(&volumes));

    let nfs_exports = client.call("nfs_export_list", Value::Null).await?;
    info!("  nfs exports: {}", list_len(&nfs_exports));

    Ok(())
}

fn list_len(value: &Value) -> usize {
    value.as_array().map_or(0, Vec::len)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=info".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
