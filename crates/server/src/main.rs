use clap::{Parser, Subcommand};
use gearspin_manifest::{CheckOutcome, TestReport};
use gearspin_server::session::Session;
use gearspin_server::{DEFAULT_PORT, FALLBACK_PORT};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "gearspin-server",
    about = "Local dev server and asset checker for Steampunk Slot Machine RPG"
)]
struct Cli {
    /// Port to serve on. `serve` scans upward from here; `test` retries once
    /// on the fallback port if this one is taken.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory containing the game tree (index.html, css/, js/, assets/).
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the game server and hold until Ctrl+C.
    Serve,
    /// Start the server, verify every expected asset, then hold or exit.
    Test {
        /// Run the checks once and exit instead of keeping the server up.
        #[arg(long)]
        once: bool,
        /// Print the test report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Serve => run_serve(cli.port, cli.root).await,
        Command::Test { once, json } => run_test(cli.port, cli.root, once, json).await,
    }
}

fn init_logger(verbose: bool) {
    let default = if verbose {
        "gearspin_server=debug,gearspin_harness=debug,info"
    } else {
        "gearspin_server=info,gearspin_harness=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}

async fn run_serve(port: u16, root: PathBuf) -> anyhow::Result<()> {
    let mut session = Session::new(root);
    session.start_scanning(port).await?;
    let url = session.base_url().unwrap_or_default();

    println!("[gearspin] game server listening on {url}");
    println!("[gearspin] serving files from {}", session.root().display());
    println!("[gearspin] controls: SPACE spin | H help | S settings | ESC close dialogs");
    println!("[gearspin] press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    println!("[gearspin] shutting down...");
    session.stop().await;
    println!("[gearspin] server stopped, thanks for playing");
    Ok(())
}

async fn run_test(port: u16, root: PathBuf, once: bool, json: bool) -> anyhow::Result<()> {
    let mut session = Session::new(root);
    session.start_with_fallback(port, FALLBACK_PORT).await?;
    let url = session.base_url().unwrap_or_default();
    println!("[gearspin] server started on {url}");

    let report = session.verify().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !once && report.is_pass() {
        println!("\n[gearspin] ready to play at {url} - press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
        println!("[gearspin] shutting down...");
    }
    session.stop().await;

    if !report.is_pass() {
        // Exit status carries the verdict for scripted callers.
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &TestReport) {
    println!("\nContent validation:");
    if report.content.is_empty() {
        println!("  (root page unreachable, content checks skipped)");
    }
    for check in &report.content {
        match &check.outcome {
            CheckOutcome::Passed { .. } => println!("  PASS  {}", check.description),
            CheckOutcome::Failed { reason } => {
                println!("  FAIL  {}: {reason}", check.description)
            }
        }
    }

    println!("\nAsset checks:");
    for check in &report.assets {
        match &check.outcome {
            CheckOutcome::Passed { bytes } => println!(
                "  PASS  {}: {} bytes",
                check.description,
                bytes.unwrap_or(0)
            ),
            CheckOutcome::Failed { reason } => {
                println!("  FAIL  {}: {reason}", check.description)
            }
        }
    }

    println!(
        "\n{}/{} assets accessible",
        report.passed(),
        report.total()
    );
    println!(
        "server status: {}",
        if report.server_ok { "PASS" } else { "FAIL" }
    );
    println!(
        "assets status: {}",
        if report.assets_ok() { "PASS" } else { "FAIL" }
    );
    println!(
        "overall: {}",
        if report.is_pass() { "PASS" } else { "FAIL" }
    );
}
