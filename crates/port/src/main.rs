use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use port_core::flow::{run_flow, ConsentFlow, FlowOutcome, Platform};
use port_ddp::platforms::{all_platforms, platform_by_name, platform_names};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod host;

use config::{PortConfig, Protocol};
use host::{render_table, DonationSink, JsonLinesHost, TerminalHost};

/// Donate data from platform exports after reviewing it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file (defaults to $PORT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the donation flow for every platform
    Run(RunArgs),
    /// Check whether a file is a recognized export
    Validate(FileArgs),
    /// Print the tables that would be offered for donation
    Extract(FileArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[arg(long, value_enum)]
    protocol: Option<Protocol>,
    #[arg(long)]
    session_id: Option<String>,
    #[arg(long)]
    donations_dir: Option<PathBuf>,
    /// Split consent tables taller than this
    #[arg(long)]
    chunk_rows: Option<usize>,
    #[arg(long)]
    locale: Option<String>,
}

#[derive(Args, Debug)]
struct FileArgs {
    file: PathBuf,
    #[arg(long, default_value = "slack")]
    platform: String,
    #[arg(long)]
    locale: Option<String>,
}

impl RunArgs {
    fn apply(self, config: &mut PortConfig) {
        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(session_id) = self.session_id {
            config.flow.session_id = session_id;
        }
        if let Some(dir) = self.donations_dir {
            config.donations_dir = dir;
        }
        if let Some(rows) = self.chunk_rows {
            config.flow.chunk_rows = rows;
        }
        if let Some(locale) = self.locale {
            config.locale = locale;
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let mut config = config::load(cli.config)?;

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            config.validate()?;
            let outcome = run(&config);
            if outcome.code != 0 {
                warn!("flow exited with {}: {}", outcome.code, outcome.info);
                std::process::exit(outcome.code);
            }
            Ok(())
        }
        Command::Validate(args) => validate(&args),
        Command::Extract(args) => {
            let locale = args.locale.clone().unwrap_or(config.locale);
            extract(&args, &locale)
        }
    }
}

fn run(config: &PortConfig) -> FlowOutcome {
    info!(
        "starting flow {} for {:?}",
        config.flow.session_id,
        platform_names()
    );
    let mut flow = ConsentFlow::new(config.flow.clone(), all_platforms());
    let sink = DonationSink::new(&config.donations_dir);
    info!("donations are stored in {}", sink.dir().display());
    let stdin = io::stdin().lock();

    match config.protocol {
        Protocol::Terminal => {
            let mut host = TerminalHost::new(stdin, io::stdout(), sink, config.locale.clone());
            run_flow(&mut flow, &mut host)
        }
        Protocol::JsonLines => {
            let mut host = JsonLinesHost::new(stdin, BufWriter::new(io::stdout()), sink);
            run_flow(&mut flow, &mut host)
        }
    }
}

fn find_platform(name: &str) -> Result<Box<dyn Platform>> {
    match platform_by_name(name) {
        Some(platform) => Ok(platform),
        None => bail!(
            "unknown platform '{}', expected one of: {}",
            name,
            platform_names().join(", ")
        ),
    }
}

fn file_arg(args: &FileArgs) -> Result<String> {
    let file = args
        .file
        .to_str()
        .with_context(|| format!("path '{}' is not valid UTF-8", args.file.display()))?;
    Ok(file.to_string())
}

fn validate(args: &FileArgs) -> Result<()> {
    let platform = find_platform(&args.platform)?;
    let validation = platform.validate(&file_arg(args)?);

    match &validation.status_code {
        Some(status) => println!("{}: {}", platform.name(), status),
        None => println!("{}: not validated", platform.name()),
    }
    if let Some(category) = &validation.ddp_category {
        println!("category: {}", category.id);
    }
    if !validation.is_valid() {
        bail!("'{}' is not a valid {} export", args.file.display(), platform.name());
    }
    Ok(())
}

fn extract(args: &FileArgs, locale: &str) -> Result<()> {
    let platform = find_platform(&args.platform)?;
    let file = file_arg(args)?;
    let validation = platform.validate(&file);
    if !validation.is_valid() {
        bail!("'{}' is not a valid {} export", args.file.display(), platform.name());
    }

    let tables = platform.extract(&file, &validation);
    if tables.is_empty() {
        println!("No data found");
        return Ok(());
    }
    for table in tables {
        println!("{} ({} rows)", table.title.text(locale), table.data_frame.height());
        println!("{}", render_table(&table.data_frame, table.data_frame.height()));
    }
    Ok(())
}
