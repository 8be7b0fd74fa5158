use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Read users and content from this JSON snapshot
    /// instead of the configured backend
    #[clap(long, global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print content suggestions for a user
    Suggest {
        /// User id
        #[clap(short, long)]
        user: String,

        /// Maximum number of suggestions.
        /// Defaults to suggestions.default_limit from config
        #[clap(short, long)]
        limit: Option<usize>,
    },

    /// Print the interest centroid computed for a user
    Centroid {
        /// User id
        #[clap(short, long)]
        user: String,

        /// How many leading components to print
        #[clap(short, long, default_value = "8")]
        preview: usize,
    },

    /// Serve the suggestion API over http
    Daemon {
        /// Address to listen on.
        /// Defaults to daemon.listen from config
        #[clap(short, long)]
        listen: Option<String>,
    },
}
