use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Headless portfolio renderer and stats poller
#[derive(Parser)]
#[command(name = "showcase")]
#[command(about = "Render the portfolio page and keep its live stats current", long_about = None)]
pub struct Cli {
    /// Config file; defaults to showcase.toml in the platform config dir
    #[arg(long, global = true, env = "SHOWCASE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the page once and print or save the HTML
    Render {
        /// Section to open, e.g. `#animations`
        #[arg(short, long)]
        fragment: Option<String>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Keep the page live and rewrite the HTML file whenever it changes
    Watch {
        #[arg(short, long)]
        out: PathBuf,
        #[arg(short, long)]
        fragment: Option<String>,
    },
    /// Query the stats endpoints directly
    Stats {
        #[command(subcommand)]
        target: StatsTarget,
    },
}

#[derive(Subcommand)]
pub enum StatsTarget {
    /// Playing and visit counts for universe ids
    Games {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Member count of one group
    Group { id: String },
}
