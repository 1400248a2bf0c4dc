use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "entwine")]
#[command(about = "entwine - typed entity graph over SQLite, demo walkthrough")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults to ~/.config/entwine/config.toml when present)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Store DSN, e.g. `file:ent?mode=memory&cache=shared&_fk=1` (overrides config file)
    #[arg(long, global = true)]
    pub dsn: Option<String>,

    /// Enable verbose logging (debug level, shows rendered SQL)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Cancel the run after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the DDL for the demo registry
    Schema {
        /// Also create the structures and report what was created
        #[arg(long)]
        apply: bool,
    },

    /// Create a user and cars, then query them back
    Basics,

    /// Build the users/cars/groups graph and traverse it
    Graph,

    /// Run basics then graph against one store
    All,
}
