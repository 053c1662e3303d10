use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cdc",
    about = "Item change-data-capture relay: diff, offload, publish",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a stream batch file through the relay
    Process(ProcessArgs),
    /// Show the attribute diff between two item images
    Diff(DiffArgs),
    /// Validate partition-key patterns and print the stream filter criteria
    Filter(FilterArgs),
    /// Remove offloaded blobs whose retention has lapsed
    Purge(PurgeArgs),
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Batch file in the stream's `{"Records": [...]}` shape
    pub batch: PathBuf,
    /// TOML config file. Without it the environment is used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory holding offloaded blobs
    #[arg(long, default_value = ".cdc-blobs")]
    pub blob_dir: PathBuf,
    /// Append published events to this file instead of stdout
    #[arg(long)]
    pub events: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Before-image (JSON object)
    pub old: PathBuf,
    /// After-image (JSON object)
    pub new: PathBuf,
    /// Images use the typed attribute encoding (`{"S": ...}`)
    #[arg(long)]
    pub typed: bool,
}

#[derive(Args)]
pub struct FilterArgs {
    #[arg(required = true)]
    pub patterns: Vec<String>,
    /// Partition-key attribute name
    #[arg(long, default_value = "pk")]
    pub key: String,
}

#[derive(Args)]
pub struct PurgeArgs {
    #[arg(long, default_value = ".cdc-blobs")]
    pub blob_dir: PathBuf,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_process() {
        let cli = Cli::try_parse_from(["cdc", "process", "batch.json"]).unwrap();
        let Command::Process(args) = cli.command else {
            panic!("expected process command");
        };
        assert_eq!(args.batch, PathBuf::from("batch.json"));
        assert_eq!(args.blob_dir, PathBuf::from(".cdc-blobs"));
        assert!(args.config.is_none());
        assert!(args.events.is_none());
    }

    #[test]
    fn parse_process_with_options() {
        let cli = Cli::try_parse_from([
            "cdc",
            "process",
            "b.json",
            "-c",
            "cdc.toml",
            "--blob-dir",
            "/tmp/blobs",
            "--events",
            "out.jsonl",
        ])
        .unwrap();
        let Command::Process(args) = cli.command else {
            panic!("expected process command");
        };
        assert_eq!(args.config, Some(PathBuf::from("cdc.toml")));
        assert_eq!(args.blob_dir, PathBuf::from("/tmp/blobs"));
        assert_eq!(args.events, Some(PathBuf::from("out.jsonl")));
    }

    #[test]
    fn parse_diff_typed() {
        let cli = Cli::try_parse_from(["cdc", "diff", "old.json", "new.json", "--typed"]).unwrap();
        let Command::Diff(args) = cli.command else {
            panic!("expected diff command");
        };
        assert!(args.typed);
        assert_eq!(args.new, PathBuf::from("new.json"));
    }

    #[test]
    fn parse_filter_requires_patterns() {
        assert!(Cli::try_parse_from(["cdc", "filter"]).is_err());
        let cli = Cli::try_parse_from(["cdc", "filter", "a", "b*", "--key", "PK"]).unwrap();
        let Command::Filter(args) = cli.command else {
            panic!("expected filter command");
        };
        assert_eq!(args.patterns, vec!["a", "b*"]);
        assert_eq!(args.key, "PK");
    }

    #[test]
    fn global_flags() {
        let cli = Cli::try_parse_from(["cdc", "purge", "--format", "json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Purge(_)));
    }
}
