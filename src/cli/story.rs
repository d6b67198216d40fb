use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use timewarp::capsule::NewCapsule;
use timewarp::config::TimewarpConfig;
use timewarp::era::Era;
use timewarp::geo::resolver::GeoResolver;
use timewarp::story::relay::StoryRelay;
use timewarp::story::{QuestionRequest, StoryRequest, StoryStream};

/// Generate a story and print it as it arrives. With `save`, the finished
/// narrative is stored as a capsule.
pub async fn story(
    config: &TimewarpConfig,
    location: Option<String>,
    era: Era,
    save: bool,
) -> Result<()> {
    let location = resolve_location(config, location).await?;
    let settings = super::open_settings(config)?.snapshot();
    let request = StoryRequest::from_settings(&location, era, &settings)?;
    let relay = StoryRelay::new(config.providers.clone())?;

    eprintln!("{} · {} ({})", location, era.display_name(), era.descriptor().date_range);
    let deltas = relay.stream_story(&request, &settings.api_keys).await?;
    let content = print_stream(deltas).await?;

    if save {
        let store = super::open_capsules(config)?;
        let capsule = NewCapsule::new(location, era, content);
        let saved = tokio::task::spawn_blocking(move || store.add(capsule)).await??;
        eprintln!("Saved capsule {}", saved.id);
    }
    Ok(())
}

/// Ask a question about a place and era and print the answer.
pub async fn ask(
    config: &TimewarpConfig,
    location: Option<String>,
    era: Era,
    question: &str,
) -> Result<()> {
    let location = resolve_location(config, location).await?;
    let settings = super::open_settings(config)?.snapshot();
    let request = QuestionRequest::new(
        StoryRequest::from_settings(location, era, &settings)?,
        question,
    )?;
    let relay = StoryRelay::new(config.providers.clone())?;

    let deltas = relay.ask(&request, &settings.api_keys).await?;
    print_stream(deltas).await?;
    Ok(())
}

async fn resolve_location(config: &TimewarpConfig, location: Option<String>) -> Result<String> {
    if let Some(location) = location.filter(|l| !l.trim().is_empty()) {
        return Ok(location);
    }
    let geo = GeoResolver::from_config(&config.geo)?.resolve().await;
    let place = geo.place_name().to_string();
    anyhow::ensure!(!place.is_empty(), "could not determine a location; pass one explicitly");
    eprintln!("Using detected location: {place} (via {})", geo.edge_node);
    Ok(place)
}

/// Write deltas to stdout as they arrive. Returns the full text.
async fn print_stream(mut deltas: StoryStream) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    let mut content = String::new();
    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        stdout
            .write_all(delta.as_bytes())
            .await
            .context("failed to write to stdout")?;
        stdout.flush().await?;
        content.push_str(&delta);
    }
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(content)
}
