pub mod capsules;
pub mod catalog;
pub mod locate;
pub mod settings;
pub mod story;

use anyhow::Result;
use std::sync::Arc;

use timewarp::capsule::CapsuleStore;
use timewarp::config::TimewarpConfig;
use timewarp::settings::SettingsStore;

fn open_settings(config: &TimewarpConfig) -> Result<SettingsStore> {
    SettingsStore::load(config.resolved_settings_path())
}

fn open_capsules(config: &TimewarpConfig) -> Result<Arc<CapsuleStore>> {
    Ok(Arc::new(CapsuleStore::open(config.resolved_capsule_db())?))
}

/// First `max` characters of `text`, with an ellipsis when truncated.
fn preview(text: &str, max: usize) -> String {
    let flat: String = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if flat.chars().count() > max {
        format!("{}…", flat.chars().take(max).collect::<String>())
    } else {
        flat
    }
}
