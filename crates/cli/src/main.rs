use advisor_core::advice::http::HttpAdvisorClient;
use advisor_core::advice::submit::{submit_profile, SubmitError, GENERIC_FAILURE_MESSAGE};
use advisor_core::cooldown::{CooldownController, CooldownState, FileCooldownStore, SystemClock};
use advisor_core::domain::profile::{ProfileInput, RiskTolerance, KNOWN_GOALS, KNOWN_TIMELINES};
use advisor_core::tasks::{self, LoadingMessages};
use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

type Controller = CooldownController<FileCooldownStore, SystemClock>;

#[derive(Debug, Parser)]
#[command(name = "advisor_cli", about = "Personalised mutual fund recommendations")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a financial profile and print the recommendations.
    Submit(SubmitArgs),
    /// Show whether a new submission is currently allowed.
    Status,
    /// Count down until a new submission is allowed.
    Wait,
    /// Normalize a saved service reply body (JSON file) without calling the service.
    Normalize { path: PathBuf },
}

#[derive(Debug, ClapArgs)]
struct SubmitArgs {
    /// conservative, moderate or aggressive.
    #[arg(long, default_value = "moderate")]
    risk_tolerance: RiskTolerance,

    /// Financial goal, e.g. retirement, education, wealth, property, business.
    #[arg(long, default_value = "retirement")]
    goal: String,

    /// Investment timeline: short, medium or long.
    #[arg(long, default_value = "medium")]
    timeline: String,

    #[arg(long, default_value = "5000")]
    income: String,

    #[arg(long, default_value = "3000")]
    expenses: String,

    #[arg(long, default_value = "20000")]
    savings: String,

    #[arg(long, default_value = "10000")]
    debt: String,

    /// Print the normalized recommendation as JSON instead of a summary.
    #[arg(long)]
    json: bool,

    /// Stay and show the cooldown countdown after the result.
    #[arg(long)]
    wait: bool,
}

impl From<&SubmitArgs> for ProfileInput {
    fn from(args: &SubmitArgs) -> Self {
        Self {
            risk_tolerance: args.risk_tolerance,
            financial_goal: args.goal.clone(),
            investment_timeline: args.timeline.clone(),
            monthly_income: args.income.clone(),
            monthly_expenses: args.expenses.clone(),
            total_savings: args.savings.clone(),
            total_debt: args.debt.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = advisor_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Submit(submit) => run_submit(&settings, submit).await,
        Command::Status => {
            let controller = load_controller(&settings)?;
            match controller.state() {
                CooldownState::CooldownActive { .. } => println!(
                    "Cooling down: next submission allowed in {}s",
                    controller.seconds_remaining()
                ),
                _ => println!("Ready: a new submission is allowed"),
            }
            Ok(())
        }
        Command::Wait => {
            let mut controller = load_controller(&settings)?;
            countdown(&mut controller).await
        }
        Command::Normalize { path } => {
            let body = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let rec = advisor_core::advice::json::normalize_service_body(&body)?;
            println!("{}", serde_json::to_string_pretty(&rec)?);
            Ok(())
        }
    }
}

async fn run_submit(
    settings: &advisor_core::config::Settings,
    args: SubmitArgs,
) -> anyhow::Result<()> {
    let profile = ProfileInput::from(&args);
    if !KNOWN_GOALS.contains(&profile.financial_goal.as_str()) {
        tracing::warn!(goal = %profile.financial_goal, "unlisted financial goal");
    }
    if !KNOWN_TIMELINES.contains(&profile.investment_timeline.as_str()) {
        tracing::warn!(timeline = %profile.investment_timeline, "unlisted investment timeline");
    }

    let mut controller = load_controller(settings)?;
    let client = HttpAdvisorClient::from_settings(settings)?;

    let loading = LoadingMessages::default();
    let rotation = loading.start(tasks::LOADING_ROTATION_PERIOD, |message| {
        eprintln!("{message}");
    });
    let result = submit_profile(&client, &mut controller, profile).await;
    drop(rotation);

    match result {
        Ok(rec) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rec)?);
            } else {
                print!("{}", render::summary(&rec));
            }
        }
        Err(err) if err.started_cooldown() => {
            let report = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&report);
            tracing::error!(error = %report, "submission failed");
            eprintln!("Error: {GENERIC_FAILURE_MESSAGE}");
        }
        Err(err @ SubmitError::CoolingDown { .. }) if args.wait => {
            eprintln!("{}", err.user_message());
        }
        Err(err) => anyhow::bail!("{}", err.user_message()),
    }

    if args.wait {
        countdown(&mut controller).await?;
    } else if controller.seconds_remaining() > 0 {
        eprintln!(
            "Next submission allowed in {}s",
            controller.seconds_remaining()
        );
    }
    Ok(())
}

fn load_controller(settings: &advisor_core::config::Settings) -> anyhow::Result<Controller> {
    let state_dir = settings.resolve_state_dir()?;
    let store = FileCooldownStore::in_dir(&state_dir);
    tracing::debug!(path = %store.path().display(), "using cooldown store");
    CooldownController::load(store, SystemClock, settings.cooldown_window)
}

async fn countdown(controller: &mut Controller) -> anyhow::Result<()> {
    let ticking = tasks::run_countdown(controller, tasks::COUNTDOWN_TICK, |remaining| {
        if remaining > 0 {
            eprint!("\rCooling down: {remaining:>3}s ");
        } else {
            eprintln!("\rReady to submit again.   ");
        }
    });

    tokio::select! {
        res = ticking => res,
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            tracing::info!("countdown interrupted; cooldown deadline kept");
            Ok(())
        }
    }
}

fn init_sentry(settings: &advisor_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
