use std::sync::Arc;

use clap::Parser;

mod cli;
mod config;
mod embedding;
mod errors;
mod feed;
mod fuzzy;
mod index;
mod ranking;
mod registry;
mod store;
#[cfg(test)]
mod tests;
mod trainer;
mod web;

use config::Config;
use ranking::SearchParams;
use registry::SearchRegistry;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let config = Config::load_with(&args.data_dir);
    let registry = Arc::new(SearchRegistry::new(config)?);

    match args.command {
        cli::Command::Serve { host, port } => {
            let port = port
                .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
                .unwrap_or(8080);
            web::start_daemon(registry, &host, port);
            Ok(())
        }

        cli::Command::Train { shop, feed } => {
            errors::validate_shop_id(&shop)?;
            let feed_xml = std::fs::read_to_string(&feed)?;

            let index = trainer::run_training(&registry, &shop, &feed_xml)?;
            println!("trained {} products for shop {shop}", index.len());
            Ok(())
        }

        cli::Command::Search {
            shop,
            query,
            limit,
            threshold,
            boost,
        } => {
            errors::validate_shop_id(&shop)?;
            let boosts = cli::parse_boosts(&boost)?;

            let search_config = &registry.config().search;
            let params = SearchParams {
                limit: limit.unwrap_or(search_config.default_limit),
                min_threshold: threshold.unwrap_or(0.0).max(0.0),
                boosts,
                semantic_weight: search_config.semantic_weight,
                lexical_weight: search_config.lexical_weight,
            };

            let hits = registry.search(&shop, &query, &params)?;
            println!("{}", serde_json::to_string_pretty(&hits).unwrap());
            Ok(())
        }

        cli::Command::Status { shop } => {
            errors::validate_shop_id(&shop)?;

            let response = match registry.get_or_load(&shop)? {
                Some(index) => web::StatusResponse {
                    shop_id: shop,
                    trained: true,
                    products_count: Some(index.len()),
                    trained_at: Some(index.trained_at),
                },
                None => web::StatusResponse {
                    shop_id: shop,
                    trained: false,
                    products_count: None,
                    trained_at: None,
                },
            };
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
            Ok(())
        }

        cli::Command::Shops {} => {
            let shops = registry.shops()?;
            let count = shops.len();
            println!(
                "{}",
                serde_json::to_string_pretty(&web::ShopsResponse { shops, count }).unwrap()
            );
            Ok(())
        }
    }
}
