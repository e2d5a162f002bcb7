use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chanvault_api::types::Snowflake;
use chanvault::{
    entry::MessageEntry,
    index::ArchiveIndex,
    reader::ArchiveReader,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "chanvault")]
#[command(author, version, about = "Chat channel archive tool", long_about = None)]
pub struct Cli {
    /// Directory holding snapshot files and attachment bodies
    #[arg(
        short = 'd',
        long,
        env = "CHANVAULT_ARCHIVE_DIR",
        default_value = "archive",
        global = true
    )]
    pub archive_dir: PathBuf,

    /// Print machine-readable output where applicable
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose mode (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a channel's finalized snapshots and the ranges they cover
    List(ChannelArgs),

    /// Show the id ranges still missing from a channel's archive
    Gaps(ChannelArgs),

    /// Dump a snapshot's entries as JSON lines
    Show(SnapshotArgs),

    /// Point queries against one snapshot
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct ChannelArgs {
    /// Channel id
    pub channel: u64,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Snapshot file path
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Snapshot file path
    pub path: PathBuf,

    /// Print the newest archived message (the file's first line)
    #[arg(long, conflicts_with = "last")]
    pub first: bool,

    /// Print the oldest archived message (the file's last line)
    #[arg(long)]
    pub last: bool,
}

pub fn parse_cli_from_env() -> Cli {
    Cli::parse()
}

pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::List(args) => handle_list(cli, args),
        Commands::Gaps(args) => handle_gaps(cli, args),
        Commands::Show(args) => handle_show(args),
        Commands::Inspect(args) => handle_inspect(cli, args),
    }
}

#[derive(Serialize)]
struct SnapshotRow {
    path: PathBuf,
    newest: Option<Snowflake>,
    oldest_bound: Option<Snowflake>,
}

fn handle_list(cli: &Cli, args: &ChannelArgs) -> Result<()> {
    let index = scan(cli, args.channel)?;
    let rows: Vec<SnapshotRow> = index
        .snapshots()
        .iter()
        .chain(index.empty_snapshots())
        .map(|meta| SnapshotRow {
            path: meta.path.clone(),
            newest: meta.newest(),
            oldest_bound: meta.oldest_bound(),
        })
        .collect();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("no snapshots for channel {}", args.channel);
        return Ok(());
    }
    for row in rows {
        match (row.newest, row.oldest_bound) {
            (Some(newest), Some(oldest_bound)) => {
                println!("{}  [{oldest_bound}, {newest}]", row.path.display());
            }
            _ => println!("{}  (empty run)", row.path.display()),
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct GapRow {
    after: Option<Snowflake>,
    before: Option<Snowflake>,
}

fn handle_gaps(cli: &Cli, args: &ChannelArgs) -> Result<()> {
    let index = scan(cli, args.channel)?;
    let gaps = index.missing_ranges();
    if cli.json {
        let rows: Vec<GapRow> = gaps
            .iter()
            .map(|gap| GapRow {
                after: gap.after,
                before: gap.before,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for gap in gaps {
        println!("{gap}");
    }
    Ok(())
}

fn handle_show(args: &SnapshotArgs) -> Result<()> {
    let reader = open(&args.path)?;
    for entry in reader
        .entries()
        .with_context(|| format!("reading {}", args.path.display()))?
    {
        let entry = entry?;
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}

fn handle_inspect(cli: &Cli, args: &InspectArgs) -> Result<()> {
    let reader = open(&args.path)?;
    let entry: MessageEntry = if args.first {
        reader.first_entry()?
    } else if args.last {
        reader.last_entry()?
    } else {
        bail!("pass --first or --last");
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!(
            "{}  {}  {}",
            entry.id, entry.author.username, entry.content
        );
    }
    Ok(())
}

fn scan(cli: &Cli, channel: u64) -> Result<ArchiveIndex> {
    ArchiveIndex::scan(&cli.archive_dir, Snowflake(channel))
        .with_context(|| format!("scanning {}", cli.archive_dir.display()))
}

fn open(path: &std::path::Path) -> Result<ArchiveReader> {
    ArchiveReader::open(path).with_context(|| format!("opening {}", path.display()))
}
