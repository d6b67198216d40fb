use timewarp::era::Era;
use timewarp::provider::Provider;

/// Print the era catalogue.
pub fn eras() {
    for era in Era::ALL {
        let d = era.descriptor();
        println!("{} {} ({}) [{}]", d.icon, d.display_name, d.date_range, d.id);
        println!("    {}", d.summary);
        println!("    Features: {}", d.features.join(", "));
        println!("    Figures:  {}", d.figures.join(", "));
    }
}

/// Print the selectable models per provider.
pub fn models() {
    for provider in Provider::ALL {
        println!("{provider} (default: {})", provider.default_model());
        for model in provider.models() {
            println!("  {:<18} {} - {}", model.id, model.name, model.description);
        }
    }
}
