use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sapflow::{Record, ScreenOrder};
use sapflow_agent::{run_batch, va01, BatchJob, Settings, SimSession};
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "sapflow agent - batch sales order entry against an ERP GUI"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SequenceKind {
    /// Line items through the item overview table.
    Default,
    /// Configurable materials through the fast data entry tab.
    FastEntry,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate configuration and screen maps, then exit.
    Check,
    /// Run a batch over a working file and print the JSON summary.
    Run {
        /// Working file, relative to the network root.
        #[arg(long)]
        input: PathBuf,

        /// Header field values shared by every order, as a JSON object.
        #[arg(long)]
        header: Option<String>,

        /// Screen sequence override, as a JSON array of screen orders.
        #[arg(long, conflicts_with = "sequence")]
        screens: Option<String>,

        /// Built-in screen sequence to use.
        #[arg(long, value_enum, default_value = "default")]
        sequence: SequenceKind,

        /// Drive the built-in simulator session instead of a live client.
        #[arg(long)]
        simulate: bool,
    },
}

fn init_logging() -> Result<()> {
    let log_level = env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let problems = cli.settings.validate();
    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!("{problem}");
        }
        std::process::exit(2);
    }

    match cli.command {
        Command::Check => {
            let registry = va01::screen_registry();
            registry.validate_sequence(&va01::default_sequence())?;
            registry.validate_sequence(&va01::fast_entry_sequence())?;
            tracing::info!(screens = registry.len(), "configuration ok");
            Ok(())
        }
        Command::Run {
            input,
            header,
            screens,
            sequence,
            simulate,
        } => {
            let header_fields: Record = match header {
                Some(json) => serde_json::from_str(&json).context("parsing --header")?,
                None => Record::new(),
            };
            let screen_sequence: Vec<ScreenOrder> = match screens {
                Some(json) => serde_json::from_str(&json).context("parsing --screens")?,
                None => match sequence {
                    SequenceKind::Default => va01::default_sequence(),
                    SequenceKind::FastEntry => va01::fast_entry_sequence(),
                },
            };
            let job = BatchJob {
                header_fields,
                screen_sequence,
                ..BatchJob::new(input)
            };

            if !simulate {
                bail!(
                    "no live ERP bridge is linked into this binary; the hosting \
                     worker owns the session. Pass --simulate for a dry run."
                );
            }
            let session = SimSession::new();
            let cancel = CancellationToken::new();
            let summary = run_batch(
                &session,
                &job,
                va01::screen_registry(),
                &cli.settings,
                &cancel,
            )
            .await?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}
