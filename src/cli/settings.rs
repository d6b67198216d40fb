use anyhow::Result;

use timewarp::config::TimewarpConfig;
use timewarp::provider::Provider;
use timewarp::settings::Settings;

/// A single settings mutation requested on the command line.
#[derive(Debug, Clone)]
pub enum SettingsChange {
    Provider(Provider),
    /// `None` clears the key.
    Key(Provider, Option<String>),
    /// `None` reverts to the provider default.
    Model(Option<String>),
    Temperature(f32),
    MaxTokens(u32),
    Stream(bool),
}

pub fn show(config: &TimewarpConfig) -> Result<()> {
    let settings = super::open_settings(config)?.snapshot();
    print_settings(config, &settings);
    Ok(())
}

pub fn update(config: &TimewarpConfig, change: SettingsChange) -> Result<()> {
    let store = super::open_settings(config)?;
    let settings = store.update(|s| match change {
        SettingsChange::Provider(provider) => s.set_provider(provider),
        SettingsChange::Key(provider, key) => s.api_keys.set(provider, key),
        SettingsChange::Model(model) => s.selected_model = model,
        SettingsChange::Temperature(t) => s.set_temperature(t),
        SettingsChange::MaxTokens(n) => s.set_max_tokens(n),
        SettingsChange::Stream(enabled) => s.stream_enabled = enabled,
    })?;
    print_settings(config, &settings);
    Ok(())
}

fn print_settings(config: &TimewarpConfig, settings: &Settings) {
    println!("Settings ({})", config.resolved_settings_path().display());
    println!("{}", "=".repeat(40));
    println!("  Provider:     {}", settings.provider);
    println!("  Model:        {}", settings.effective_model());
    println!("  Stream:       {}", if settings.stream_enabled { "on" } else { "off" });
    println!("  Temperature:  {:.2}", settings.temperature);
    println!("  Max tokens:   {}", settings.max_tokens);
    println!();
    println!("API keys:");
    for provider in Provider::ALL {
        let state = if settings.api_keys.get(provider).is_some() { "set" } else { "not set" };
        println!("  {:<12} {}", provider.as_str(), state);
    }
}
