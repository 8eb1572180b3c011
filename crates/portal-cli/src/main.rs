// ============================================================================
// portal — command-line driver for the course portal access gate
// ============================================================================
// Usage:
//   portal status                            Show the resolved access state
//   portal account [--path P] [--html]       Load the account page and render it
//   portal pay                               Start checkout, print redirect URL
//   portal watch                             Poll until payment is verified
//   portal reset-notice                      Forget the one-time unlock notice
// ============================================================================

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use portal_core::access::{AccessGateController, AccountView, PageOutcome, PollOutcome};
use portal_core::{
    FlagStore, HttpPortalApi, PageLocation, PortalConfig, RedbFlagStore, TracingNotifier,
};
use std::sync::Arc;
use tracing::info;

/// Course portal access gate tool
#[derive(Parser)]
#[command(name = "portal", version, about = "Check and drive payment-gated course access")]
struct Cli {
    /// Backend origin (default: PORTAL_BASE_URL or http://localhost:5000)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Session cookie header, e.g. "session=..." (default: PORTAL_SESSION_COOKIE)
    #[arg(long, global = true)]
    cookie: Option<String>,

    /// Path to the flag database (default: ~/.portal/flags.redb)
    #[arg(long, global = true)]
    state_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and print the current access state
    Status,

    /// Run the account page load and print the rendered view
    Account {
        /// Page path including query, e.g. "/account?payment=callback"
        #[arg(long, default_value = "/account")]
        path: String,

        /// Print HTML instead of a text summary
        #[arg(long)]
        html: bool,
    },

    /// Start a payment session and print the provider URL
    Pay,

    /// Re-check at a fixed interval until access is unlocked
    Watch {
        /// Override the poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Give up after this many checks (0 = no limit)
        #[arg(long)]
        max_checks: Option<u32>,
    },

    /// Clear the persisted "payment verified" notice flag
    ResetNotice,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portal=info".parse()?)
                .add_directive("portal_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);

    match cli.command {
        Commands::Status => cmd_status(config).await,
        Commands::Account { ref path, html } => cmd_account(config, path, html).await,
        Commands::Pay => cmd_pay(config).await,
        Commands::Watch {
            interval_ms,
            max_checks,
        } => cmd_watch(config, interval_ms, max_checks).await,
        Commands::ResetNotice => cmd_reset_notice(config),
    }
}

fn build_config(cli: &Cli) -> PortalConfig {
    let mut config = PortalConfig::from_env();
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(cookie) = &cli.cookie {
        config.session_cookie = Some(cookie.clone());
    }
    if let Some(path) = &cli.state_path {
        config.state_path = Some(path.clone());
    }
    config
}

fn open_flags(config: &PortalConfig) -> Result<Arc<RedbFlagStore>> {
    Ok(Arc::new(RedbFlagStore::open(config.state_path.as_deref())?))
}

fn build_gate(config: PortalConfig, path: &str) -> Result<AccessGateController> {
    let api = HttpPortalApi::new(config.clone()).map_err(|e| anyhow!("{}", e))?;
    let flags = open_flags(&config)?;
    let location = PageLocation::parse_on(&config.base_url, path)?;

    Ok(AccessGateController::new(
        Arc::new(api),
        flags,
        Arc::new(TracingNotifier),
        config,
        location,
    ))
}

async fn cmd_status(config: PortalConfig) -> Result<()> {
    let gate = build_gate(config, "/account")?;
    let state = gate.resolve_access_state().await;

    println!("Access state: {:?}", state);
    println!("Unlocked:     {}", state.is_unlocked());
    Ok(())
}

async fn cmd_account(config: PortalConfig, path: &str, html: bool) -> Result<()> {
    let mut gate = build_gate(config, path)?;

    match gate.load_page().await {
        PageOutcome::RedirectToLogin => {
            println!("Not signed in. Redirect: /login-page");
            return Ok(());
        }
        PageOutcome::Rendered(state) => info!("Account page rendered ({:?})", state),
    }

    if let Some(user) = gate.user() {
        println!("User:       {} ({}, level {})", user.name, user.department, user.level);
    }
    println!("Location:   {}", gate.location().href());

    if html {
        println!("{}", gate.view().to_html());
    } else {
        print_summary(gate.view());
    }
    Ok(())
}

fn print_summary(view: &AccountView) {
    println!("Status:     {}", view.status_label);
    if let Some(amount) = view.amount_due {
        println!("Amount due: {:.2}", amount);
    }
    if view.pay_button_visible {
        println!("Run `portal pay` to unlock your courses.");
    }
    println!();

    let mut any = false;
    for course in view.courses.courses() {
        any = true;
        let marker = if course.target.is_navigable() { " " } else { "🔒" };
        println!("{} {}", marker, course.label);
        for material in &course.materials {
            let target = match &material.target {
                portal_core::access::LinkTarget::Href { href } => href.as_str(),
                portal_core::access::LinkTarget::Locked { .. } => "locked",
            };
            println!(
                "     - [{}] {} ({})",
                material.file_type.as_str(),
                material.label,
                target
            );
        }
    }

    if !any {
        for item in &view.courses.items {
            if let portal_core::access::ListItem::Placeholder { text } = item {
                println!("{}", text);
            }
        }
    }
}

async fn cmd_pay(config: PortalConfig) -> Result<()> {
    let mut gate = build_gate(config, "/account")?;
    gate.refresh().await;

    let url = gate.start_payment().await?;
    println!("Complete payment at:\n{}", url);
    println!("Afterwards run: portal account --path \"/account?payment=callback\"");
    Ok(())
}

async fn cmd_watch(
    mut config: PortalConfig,
    interval_ms: Option<u64>,
    max_checks: Option<u32>,
) -> Result<()> {
    if let Some(ms) = interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(max) = max_checks {
        config.poll_max_checks = if max == 0 { None } else { Some(max) };
    }

    let mut gate = build_gate(config, "/account")?;
    if gate.load_page().await == PageOutcome::RedirectToLogin {
        println!("Not signed in. Redirect: /login-page");
        return Ok(());
    }

    match gate.poll_until_unlocked().await {
        PollOutcome::Unlocked(state) => {
            println!("Access unlocked: {}", state.label());
            print_summary(gate.view());
        }
        PollOutcome::Exhausted(checks) => {
            println!("Still locked after {} checks ({})", checks, gate.state().label());
        }
    }
    Ok(())
}

fn cmd_reset_notice(config: PortalConfig) -> Result<()> {
    let flags = open_flags(&config)?;
    flags.clear(&config.toast_flag_key)?;
    println!(
        "Cleared '{}' in {}",
        config.toast_flag_key,
        flags.path().display()
    );
    Ok(())
}
