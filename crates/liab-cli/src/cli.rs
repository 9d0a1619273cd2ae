use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "liab", about = "Inspect and edit a liab object store", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Database file (overrides the config file's `path`)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Schema file (TOML)
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Store config file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Issue a fresh identifier
    NextId(NextIdArgs),
    /// Insert an item into a hash
    Insert(InsertArgs),
    /// Show one item
    Show(ItemArgs),
    /// List a hash, newest first
    List(ListArgs),
    /// Append an entry to an item's stream
    Append(AppendArgs),
    /// Show an item's stream, newest first
    Log(LogArgs),
    /// Add an item to another item's bucket
    Link(LinkArgs),
    /// List the members of an item's bucket
    Members(FieldArgs),
    /// Print the loaded schema
    Schema(SchemaArgs),
}

#[derive(Args)]
pub struct NextIdArgs {
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,
}

#[derive(Args)]
pub struct InsertArgs {
    #[arg(value_name = "TYPE")]
    pub type_name: String,
    /// JSON payload
    pub payload: String,
}

#[derive(Args)]
pub struct ItemArgs {
    #[arg(value_name = "TYPE")]
    pub type_name: String,
    /// Item identifier (hex)
    pub id: String,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(value_name = "TYPE")]
    pub type_name: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct FieldArgs {
    #[command(flatten)]
    pub item: ItemArgs,
    pub field: String,
}

#[derive(Args)]
pub struct AppendArgs {
    #[command(flatten)]
    pub target: FieldArgs,
    /// JSON payload
    pub payload: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[command(flatten)]
    pub target: FieldArgs,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct LinkArgs {
    #[command(flatten)]
    pub target: FieldArgs,
    /// Identifier of the member to add (hex)
    pub member: String,
    /// Remove the member instead
    #[arg(short = 'd', long)]
    pub delete: bool,
}

#[derive(Args)]
pub struct SchemaArgs {}
