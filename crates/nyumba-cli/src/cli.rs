use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "nyumba",
    about = "Listings marketplace service bring-up and state core",
    version
)]
pub struct Cli {
    /// Path to the settings file. Absent file means defaults.
    #[arg(long, env = "NYUMBA_SETTINGS", default_value = "nyumba.yml", global = true)]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Bring every service up and show readiness plus a state summary.
    Boot,

    /// Bring the services up, apply filters, and list the matches.
    Listings {
        /// Case-insensitive location substring.
        #[arg(long)]
        location: Option<String>,

        /// Listing kind.
        #[arg(long)]
        kind: Option<KindArg>,

        /// Inclusive lower price bound.
        #[arg(long)]
        min_price: Option<u64>,

        /// Inclusive upper price bound.
        #[arg(long)]
        max_price: Option<u64>,

        /// Required amenity; repeatable.
        #[arg(long = "amenity")]
        amenities: Vec<String>,
    },

    /// Show the readiness status of every tracked service.
    Status {
        /// Output format.
        #[arg(long, default_value = "text")]
        output: StatusOutput,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    House,
    Bnb,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusOutput {
    Text,
    Json,
}
