mod auth;
mod config;
mod error;
mod listing;
mod port;
mod render;
mod resolve;
mod serve;
mod theme;
mod web_assets;

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::{AuthMode, AuthSettings, ServerConfig};
use error::StartupError;

/// Explicit subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Serve a directory over HTTP
    #[command(visible_aliases = ["start", "run"])]
    Serve(ServeArgs),
    /// List the available directory listing themes
    Themes,
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Directory to serve
    #[arg(short, long, default_value = ".", env = "SERVERGO_DIR")]
    dir: PathBuf,
    /// Port to listen on; 0 picks a free one
    #[arg(short, long, default_value_t = 0, env = "SERVERGO_PORT")]
    port: u16,
    /// Interface address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,
    /// Authentication mode
    #[arg(short, long, value_enum, default_value_t = AuthMode::None)]
    auth: AuthMode,
    /// Username for basic and form authentication
    #[arg(short, long, default_value = "admin")]
    username: String,
    /// Password for basic and form authentication; generated when omitted
    #[arg(short = 'w', long, env = "SERVERGO_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Token for token authentication; generated when omitted
    #[arg(short, long, env = "SERVERGO_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Serve the HTML login page (form authentication)
    #[arg(short, long)]
    login_page: bool,
    /// Disable directory listings
    #[arg(long)]
    no_dir_list: bool,
    /// Directory listing theme (see `servergo themes`)
    #[arg(short = 'm', long, default_value = theme::DEFAULT_THEME, env = "SERVERGO_THEME")]
    theme: String,
    /// Per-request deadline in seconds; 0 disables it
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,
    /// Log verbosity when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Parser)]
#[command(
    name = "servergo",
    version,
    about = "A static file server with themed directory listings and pluggable authentication"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Logs go to stderr so stdout carries only the startup banner.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("servergo={level},tower_http={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: ServeArgs) -> Result<(), StartupError> {
    let auth = AuthSettings::new(
        args.auth,
        args.username,
        args.password,
        args.token,
        args.login_page,
    );
    let config = ServerConfig::new(
        &args.dir,
        args.bind,
        args.port,
        auth,
        !args.no_dir_list,
        args.theme,
        Some(Duration::from_secs(args.request_timeout)),
    )?;
    tracing::debug!(?config, "configuration");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(serve::run_serve(config))
}

fn main() -> ExitCode {
    match Cli::parse().command {
        Commands::Themes => {
            for name in theme::supported_themes() {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Commands::Serve(args) => {
            init_tracing(&args.log_level);
            match run(args) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
