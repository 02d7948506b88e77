use anyhow::Result;
use casebot::{CasebotApp, CasebotConfig};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "casebot")]
#[command(about = "Chat bot service with supervised component lifecycles")]
#[command(version)]
#[command(long_about = "Runs the casebot service: a chat gateway, a language-model client and a \
cache, each managed by a supervisor that polls component health and recovers failed \
components automatically.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "casebot.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the service")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize components, report, then shut them down
    #[arg(long, help = "Initialize all components, print a health report and exit")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    // Loaded before logging so the filter can follow the configuration
    let config = match CasebotConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load configuration from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config)?;

    info!("Starting casebot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded from {} (check interval: {}s, status server: {})",
        args.config,
        config.monitor.check_interval_seconds,
        if config.http.enabled { "on" } else { "off" }
    );

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut app = CasebotApp::new(config).map_err(|e| {
        error!("Failed to build application: {}", e);
        e
    })?;

    let all_up = app.initialize().await;

    if args.dry_run {
        let not_healthy = app.supervisor().log_health_report().await;
        let exit_code = app.shutdown().await;
        if all_up && not_healthy == 0 {
            println!("✓ Dry run completed successfully - all components initialized");
        } else {
            println!("✗ Dry run completed - {} components not healthy", not_healthy);
        }
        std::process::exit(if all_up { exit_code } else { 1 });
    }

    app.start().await.map_err(|e| {
        error!("Failed to start casebot: {}", e);
        e
    })?;

    let exit_code = app.run().await.map_err(|e| {
        error!("Casebot error during execution: {}", e);
        e
    })?;

    info!("Casebot exited with code: {}", exit_code);

    std::process::exit(exit_code);
}

fn log_level(args: &Args) -> &'static str {
    if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    }
}

/// `casebot=<level>`, plus axum's own events when the status server runs.
/// Lifecycle transitions are logged at info, so `--verbose` shows every
/// initialize, recovery and shutdown.
fn default_filter(args: &Args, config: &CasebotConfig) -> String {
    let level = log_level(args);
    if config.http.enabled {
        format!("casebot={},axum={}", level, level)
    } else {
        format!("casebot={}", level)
    }
}

fn init_logging(args: &Args, config: &CasebotConfig) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(args, config)));

    // Targets carry the component module, e.g. casebot::adapters::chat
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_target(true)
            .boxed(),
        Some("compact") => fmt::layer().compact().with_target(false).boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Casebot Configuration File");
    println!("# Every value can be overridden with CASEBOT_<SECTION>__<KEY>, e.g.");
    println!("# CASEBOT_MONITOR__CHECK_INTERVAL_SECONDS=30");
    println!("#");
    println!("# Optional keys (unset by default):");
    println!("#   monitor.hook_timeout_seconds, monitor.max_recovery_attempts,");
    println!("#   monitor.recovery_backoff_base_seconds, chat.token, model.api_key");
    println!();
    println!("{}", toml::to_string_pretty(&CasebotConfig::default())?);
    Ok(())
}
