use anyhow::{bail, Result};

use timewarp::capsule::MAX_CAPSULES;
use timewarp::config::TimewarpConfig;

pub async fn list(config: &TimewarpConfig) -> Result<()> {
    let store = super::open_capsules(config)?;
    let capsules = tokio::task::spawn_blocking(move || store.list()).await??;

    if capsules.is_empty() {
        println!("No saved capsules.");
        return Ok(());
    }

    println!("Time capsules ({}/{MAX_CAPSULES})", capsules.len());
    println!("{}", "=".repeat(40));
    for capsule in &capsules {
        println!(
            "{}  {}  {} · {}",
            capsule.id,
            capsule.created_at,
            capsule.location,
            capsule.era.display_name()
        );
        println!("    {}", super::preview(&capsule.content, 60));
    }
    Ok(())
}

pub async fn show(config: &TimewarpConfig, id: String) -> Result<()> {
    let store = super::open_capsules(config)?;
    let lookup = id.clone();
    match tokio::task::spawn_blocking(move || store.get(&lookup)).await?? {
        Some(capsule) => {
            println!("{} · {}", capsule.location, capsule.era.display_name());
            println!("Saved {}", capsule.created_at);
            println!();
            println!("{}", capsule.content);
            Ok(())
        }
        None => bail!("no capsule with id {id}"),
    }
}

pub async fn remove(config: &TimewarpConfig, id: String) -> Result<()> {
    let store = super::open_capsules(config)?;
    let lookup = id.clone();
    if tokio::task::spawn_blocking(move || store.remove(&lookup)).await?? {
        println!("Removed capsule {id}");
    } else {
        println!("No capsule with id {id}; nothing removed");
    }
    Ok(())
}
