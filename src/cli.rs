use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dateprefix")]
#[command(author, version, about, long_about = None)]
#[command(about = "Prefix files and directories with their creation date (YYYY-MM-DD_)")]
pub struct Args {
    /// Directory whose contents should be prefixed
    #[arg(required_unless_present = "revert")]
    pub target_dir: Option<PathBuf>,

    /// Simulate changes without modifying the filesystem
    #[arg(short, long)]
    pub dry: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Revert changes using a history file
    #[arg(short, long, value_name = "HISTORY_FILE", conflicts_with = "target_dir")]
    pub revert: Option<PathBuf>,

    /// Maximum name length after prefixing [default: 255]
    #[arg(short = 'l', long, value_parser = clap::value_parser!(usize))]
    pub max_length: Option<usize>,

    /// Also rename hidden (dot) entries
    #[arg(long)]
    pub include_hidden: bool,

    /// Do not write a history file after renaming
    #[arg(long)]
    pub no_history: bool,

    /// Skip entries whose name or relative path matches a glob (repeatable)
    #[arg(short = 'e', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Only rename top-level files with these extensions (comma-separated)
    #[arg(long = "ext", value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Descend at most this many levels below the target directory
    #[arg(long, value_name = "DEPTH")]
    pub max_depth: Option<usize>,

    /// Use modification time instead of birth time
    #[arg(long)]
    pub mtime: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
