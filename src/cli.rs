use anyhow::anyhow;
use clap::{Parser, Subcommand};

use crate::ranking::BoostConfig;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding config.yaml and trained models
    #[clap(long, default_value = "./data")]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the search service.
    Serve {
        /// Address to bind
        #[clap(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on. Falls back to $PORT, then 8080
        #[clap(short, long)]
        port: Option<u16>,
    },

    /// Train a shop's model from a feed file
    Train {
        /// Shop id (letters and digits only)
        #[clap(short, long)]
        shop: String,

        /// Path to the product feed XML
        feed: std::path::PathBuf,
    },

    /// Search a trained shop
    Search {
        /// Shop id (letters and digits only)
        #[clap(short, long)]
        shop: String,

        /// Free-text query
        query: String,

        /// Maximum results to print
        #[clap(short, long)]
        limit: Option<usize>,

        /// Drop results scoring below this after boosts
        #[clap(short, long)]
        threshold: Option<f32>,

        /// Attribute boost as name=weight, repeatable.
        /// e.g. --boost category=0.2 --boost color=0.1
        #[clap(short, long)]
        boost: Vec<String>,
    },

    /// Show whether a shop has a trained model
    Status {
        /// Shop id
        #[clap(short, long)]
        shop: String,
    },

    /// List every shop with a persisted model
    Shops {},
}

/// Parse repeated `--boost name=weight` flags into a [`BoostConfig`].
pub fn parse_boosts(args: &[String]) -> anyhow::Result<BoostConfig> {
    let mut boosts = BoostConfig::default();

    for arg in args {
        let Some((attribute, weight)) = arg.split_once('=') else {
            return Err(anyhow!("boost must look like attribute=weight, got {arg:?}"));
        };
        let weight: f32 = weight
            .parse()
            .map_err(|_| anyhow!("boost weight in {arg:?} is not a number"))?;
        if weight < 0.0 {
            return Err(anyhow!("boost weight in {arg:?} cannot be negative"));
        }
        if !boosts.set(attribute, weight) {
            return Err(anyhow!("unknown boost attribute {attribute:?}"));
        }
    }

    Ok(boosts)
}
