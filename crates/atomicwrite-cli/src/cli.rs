use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "atomicwrite",
    about = "Write files and objects all at once, or not at all",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Atomically write stdin or a file to a destination
    Write(WriteArgs),
    /// Print an object's contents
    Cat(CatArgs),
    /// Show how an address resolves to a store and key
    Resolve(ResolveArgs),
}

#[derive(Args)]
pub struct WriteArgs {
    /// Destination path or URI
    pub dest: String,
    /// Read from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// Always promote by copying, even where rename is available
    #[arg(long)]
    pub copy: bool,
}

#[derive(Args)]
pub struct CatArgs {
    pub uri: String,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub uri: String,
}
