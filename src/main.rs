use std::io::Error;

use clap::Parser;
use tokio::main;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use whatsapi::{
    Config, DispatchResult, MessageComposer, Whatsapi,
    infrastructure::messaging::dry_run::DryRunGateway,
};

/// Send a batch of chat messages through the dispatch pipeline.
#[derive(Debug, Parser)]
#[command(name = "whatsapi", version)]
struct Cli {
    /// Recipient numbers; repeat the flag or separate with commas.
    #[arg(long = "to", required = true, value_delimiter = ',')]
    to: Vec<String>,
    #[arg(long, default_value = "")]
    text: String,
    #[arg(long)]
    image: Option<String>,
    #[arg(long)]
    audio: Option<String>,
    #[arg(long)]
    video: Option<String>,
    /// Caption for media and location messages.
    #[arg(long)]
    caption: Option<String>,
    /// `longitude,latitude`
    #[arg(long, value_parser = parse_location, allow_hyphen_values = true)]
    location: Option<(f64, f64)>,
}

fn parse_location(value: &str) -> Result<(f64, f64), String> {
    let (longitude, latitude) = value
        .split_once(',')
        .ok_or_else(|| "expected longitude,latitude".to_string())?;
    let parse = |part: &str| part.trim().parse::<f64>().map_err(|err| err.to_string());
    Ok((parse(longitude)?, parse(latitude)?))
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

async fn compose(cli: &Cli, composer: &mut MessageComposer) -> DispatchResult<()> {
    composer.set_recipients(cli.to.clone())?;
    let caption = cli.caption.as_deref();
    if let Some(image) = &cli.image {
        composer.add_image(image, caption).await?;
    }
    if let Some(audio) = &cli.audio {
        composer.add_audio(audio, caption).await?;
    }
    if let Some(video) = &cli.video {
        composer.add_video(video, caption).await?;
    }
    if let Some((longitude, latitude)) = cli.location {
        composer.add_location(longitude, latitude, caption, None);
    }
    Ok(())
}

#[main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::try_parse().map_err(Error::other)?;

    let gateway = DryRunGateway::new(config.account.number.clone());
    let mut client = Whatsapi::builder(config, gateway)
        .build()
        .map_err(Error::other)?;

    let mut composer = client.composer();
    composer.add_text(cli.text.as_str());
    compose(&cli, &mut composer).await.map_err(Error::other)?;

    let records = client.dispatch(&mut composer).await.map_err(Error::other)?;
    for record in &records {
        println!("{}", record.raw);
    }
    info!(sent = records.len(), "done");

    client.disconnect().await.map_err(Error::other)?;
    Ok(())
}
