//! resguard
//!
//! Role-based access control decision service for REST APIs.

use clap::{Parser, Subcommand};
use resguard::{
    access_control::AccessResolver,
    config::{AppConfig, LogFormat, load_config},
    server::{AppState, run_server},
};
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// resguard - Role-based access control for REST paths
#[derive(Parser, Debug)]
#[command(name = "resguard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "RESGUARD_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides logging.level
    #[arg(long, env = "RESGUARD_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP decision service (default)
    Serve {
        /// HTTP server host
        #[arg(long, env = "RESGUARD_HTTP_HOST")]
        host: Option<String>,

        /// HTTP server port
        #[arg(long, env = "RESGUARD_HTTP_PORT")]
        port: Option<u16>,
    },

    /// Decide a single request; exits 0 when allowed, 1 when denied
    Check {
        /// Role of the subject
        #[arg(short, long)]
        role: String,

        /// HTTP method (POST, GET, PUT, PATCH, DELETE)
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path, e.g. /api/v1/course/20/unit
        path: String,
    },

    /// Print the canonical template of each path
    Canonicalize {
        /// Request paths
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn init_logging(config: &AppConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Pick up a local .env before reading RESGUARD_* variables
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(args.config.as_deref())?;

    // Initialize logging
    init_logging(&config, args.log_level.as_deref());

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                "Starting resguard decision service"
            );

            let state = AppState::from_config(&config)
                .inspect_err(|e| error!(error = %e, "Failed to build access resolver"))?;

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind: SocketAddr = format!("{}:{}", host, port).parse()?;

            run_server(state, bind)
                .await
                .inspect_err(|e| error!(error = %e, "Decision service failed"))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { role, method, path } => {
            let resolver = AccessResolver::from_config(&config.access_control)?;
            let decision = resolver.evaluate(&role, &method, &path)?;

            match decision.denial_reason() {
                None => {
                    println!("allow {} {} ({})", decision.intent, decision.template, role);
                    Ok(ExitCode::SUCCESS)
                }
                Some(reason) => {
                    println!(
                        "deny {} {} ({}): {}",
                        decision.intent, decision.template, role, reason
                    );
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Canonicalize { paths } => {
            let base_path = &config.access_control.base_path;
            for path in &paths {
                println!(
                    "{}\t{}",
                    path,
                    resguard::access_control::canonicalize(path, base_path)
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
