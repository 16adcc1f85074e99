use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use oppsql_query::AttrFilter;

#[derive(Parser)]
#[command(
    name = "oppsql",
    about = "Merge and query OMNeT++ SQLite result files",
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

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge all .sca/.vec files of a directory into one database
    Merge(MergeArgs),
    /// Show the value of a parameter shared by all runs
    Param(ParamArgs),
    /// Print the samples of output vectors
    Vector(VectorArgs),
}

#[derive(Args)]
pub struct MergeArgs {
    /// Directory containing the result files
    pub dir: PathBuf,
    /// Output database (default: <DIR>/<common prefix>.db)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Replace the output database if it exists
    #[arg(short, long)]
    pub force: bool,
    /// Strip double quotes from run attribute and parameter values
    #[arg(long)]
    pub strip_quotes: bool,
    /// TOML file overriding merge settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct ParamArgs {
    pub db: PathBuf,
    pub name: String,
}

#[derive(Args)]
pub struct VectorArgs {
    pub db: PathBuf,
    /// Vector names
    #[arg(required = true)]
    pub names: Vec<String>,
    /// Group or filter by a run attribute: NAME or NAME=V1,V2
    #[arg(long)]
    pub by: Vec<AttrFilter>,
    /// Show the simulation time of each sample
    #[arg(long)]
    pub time: bool,
    /// Show the module that recorded each sample
    #[arg(long)]
    pub module: bool,
}
