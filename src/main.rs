//! mcp-tool-server: serves the built-in MCP tools over stdio or HTTP.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use mcp_tool_server::config::{self, Config};
use mcp_tool_server::error::TransportError;
use mcp_tool_server::mcp::{
    HttpTransport, McpServer, ServerLifecycle, StdioTransport, ToolRegistry, Transport,
};
use mcp_tool_server::tools;

/// Embeddable MCP tool server.
///
/// Speaks JSON-RPC 2.0 over stdin/stdout by default, or over a
/// single-session HTTP endpoint with `--http`.
#[derive(Parser, Debug)]
#[command(name = "mcp-tool-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Serve over HTTP instead of stdio
    #[arg(long)]
    http: bool,

    /// HTTP port (overrides the configuration file)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Logs go to stderr; stdout carries protocol messages.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves when the process is asked to terminate.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to install signal handlers");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Resolves when the process is asked to terminate.
#[cfg(windows)]
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(e) => {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Builds the server for `cfg`, runs it until shutdown, and cleans up.
async fn serve(cfg: Config, args: &Args) -> Result<(), TransportError> {
    let mut options = cfg.server;
    if args.http {
        options.http_enabled = true;
    }
    if let Some(port) = args.port {
        options.http_port = port;
    }

    let mut registry = ToolRegistry::new();
    let count = tools::register_builtin(&mut registry, &options);
    info!(tools = count, "Registered tools");

    let http = if options.http_enabled {
        let transport = Arc::new(HttpTransport::new(&options));
        transport.start().await?;
        if let Some(endpoint) = transport.endpoint() {
            info!(endpoint = %endpoint, "MCP server ready, accepting HTTP requests");
        }
        Some(transport)
    } else {
        info!("MCP server ready, waiting for client connection on stdio...");
        None
    };

    let transport: Arc<dyn Transport> = match &http {
        Some(http) => Arc::clone(http) as Arc<dyn Transport>,
        None => Arc::new(StdioTransport::stdio()),
    };

    let server = McpServer::new(transport, Arc::new(registry), options);
    let lifecycle = ServerLifecycle::new(Arc::new(server));
    lifecycle.start();

    tokio::select! {
        () = shutdown_signal() => lifecycle.stop().await,
        () = lifecycle.finished() => {}
    }

    if let Some(http) = http {
        http.close().await;
    }
    Ok(())
}

/// Entry point for the mcp-tool-server binary.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting mcp-tool-server"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(serve(cfg, &args));

    // a blocked stdin read would otherwise hold the runtime open
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn http_flags_parse() {
        let args = Args::parse_from(["mcp-tool-server", "--http", "--port", "4000", "-vv"]);
        assert!(args.http);
        assert_eq!(args.port, Some(4000));
        assert_eq!(args.verbose, 2);
        assert!(args.config.is_none());
    }

    #[test]
    fn log_level_precedence() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(1, false, "error"), Level::INFO);
        assert_eq!(get_log_level(3, false, "warn"), Level::TRACE);
    }
}
