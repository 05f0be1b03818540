use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use std::{fs, io, path::PathBuf};
use url::Url;

use loja_rust::config::{strip_api_suffix, ClientOptions, API_URL_ENV};
use loja_rust::Loja;

#[derive(Parser, Debug)]
#[clap(name = "loja-configure-api", version)]
#[clap(about = "Point the Loja client at a hosted API", long_about = None)]
struct Cli {
    /// Base URL of the hosted API, with or without the trailing /api
    url: String,

    /// Env file to rewrite
    #[clap(long, default_value = ".env")]
    env_file: PathBuf,

    /// Call the catalog endpoint after writing to check the API answers
    #[clap(long)]
    check: bool,

    /// Output debug logs to stderr
    #[clap(long)]
    debug: bool,
}

async fn run() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut logger = pretty_env_logger::formatted_builder();
    if let Ok(filter) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filter);
    }
    if cli.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let base = strip_api_suffix(&cli.url);
    Url::parse(base).with_context(|| format!("Not a valid URL: {}", cli.url))?;
    let api_url = format!("{}/api", base);

    let contents = match fs::read_to_string(&cli.env_file) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("{:?} does not exist yet", cli.env_file);
            String::new()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {:?}", cli.env_file));
        }
    };

    let rewritten = loja_rust::config::rewrite_env_var(&contents, API_URL_ENV, &api_url);
    fs::write(&cli.env_file, rewritten)
        .with_context(|| format!("Failed to write {:?}", cli.env_file))?;
    info!("wrote {}={} to {:?}", API_URL_ENV, api_url, cli.env_file);

    println!("API URL configured: {}", api_url);

    if cli.check {
        println!("Checking {} ...", api_url);
        let loja = Loja::new(ClientOptions::default().with_api_url(&api_url))?;
        let categories = loja
            .catalog()
            .categories()
            .await
            .map_err(|err| anyhow::anyhow!(err.user_message()))
            .context("API check failed")?;
        println!("API is up ({} categories)", categories.len());
    }

    println!("Restart the app to pick up the new address.");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
