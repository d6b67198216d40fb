use anyhow::Result;

use timewarp::config::TimewarpConfig;
use timewarp::geo::resolver::GeoResolver;

/// Resolve the current location through the fallback chain and print it.
pub async fn locate(config: &TimewarpConfig, json: bool) -> Result<()> {
    let geo = GeoResolver::from_config(&config.geo)?.resolve().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&geo)?);
        return Ok(());
    }

    println!("Location");
    println!("{}", "=".repeat(40));
    println!("  Place:       {}", geo.place_name());
    println!("  City:        {}", geo.city);
    println!("  Region:      {}", geo.region);
    println!("  Country:     {} ({})", geo.country_name, geo.country_code);
    if let (Some(lat), Some(lon)) = (geo.latitude, geo.longitude) {
        println!("  Coordinates: {lat:.4}, {lon:.4}");
    }
    println!("  Timezone:    {}", geo.timezone);
    println!("  Source:      {}", geo.edge_node);
    println!();

    println!("Suggested stories:");
    for rec in &geo.recommendations {
        println!("  [{:<12}] {} - {}", rec.era.as_str(), rec.title, rec.description);
    }
    Ok(())
}
