use std::path::PathBuf;

use anyhow::Result;
use nyumba_app::{bootstrap, App};
use nyumba_backend::LocalBackend;
use nyumba_config::{load_seed_listings, load_settings};
use nyumba_domain::{FilterSpec, Listing, ListingId, ListingKind};

use crate::cli::{KindArg, StatusOutput};
use crate::output;

pub async fn boot(settings_path: PathBuf) -> Result<()> {
    let app = bring_up(&settings_path).await?;
    println!("{}", output::render_status(&app.coordinator.status()));
    println!("{}", output::render_state_summary(&app.store.get_state()));
    Ok(())
}

pub async fn listings(
    settings_path: PathBuf,
    location: Option<String>,
    kind: Option<KindArg>,
    min_price: Option<u64>,
    max_price: Option<u64>,
    amenities: Vec<String>,
) -> Result<()> {
    let app = bring_up(&settings_path).await?;

    let spec = FilterSpec {
        location: location.unwrap_or_default(),
        kind: kind.map(|k| match k {
            KindArg::House => ListingKind::House,
            KindArg::Bnb => ListingKind::Bnb,
        }),
        price_min: min_price.unwrap_or(0),
        price_max: max_price,
        amenities,
    };

    let matches = app.store.apply_filters(Some(&spec));
    println!("{}", output::render_listings(&matches));
    Ok(())
}

pub async fn status(settings_path: PathBuf, format: StatusOutput) -> Result<()> {
    let app = bring_up(&settings_path).await?;
    let report = app.coordinator.status();
    match format {
        StatusOutput::Text => println!("{}", output::render_status(&report)),
        StatusOutput::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

async fn bring_up(settings_path: &PathBuf) -> Result<App> {
    let settings = load_settings(settings_path)?;

    let backend = LocalBackend::open();
    let seed = match &settings.seed_path {
        Some(path) => load_seed_listings(path)?,
        None => demo_listings(),
    };
    backend.seed_listings(&seed).await?;

    Ok(bootstrap(&settings, backend).await)
}

/// Built-in seed data used when no seed file is configured.
fn demo_listings() -> Vec<Listing> {
    vec![
        Listing {
            id: ListingId::new("h-ngong-1"),
            title: "Four-bedroom maisonette off Ngong Road".to_string(),
            location: "Nairobi".to_string(),
            price: 850,
            kind: ListingKind::House,
            images: vec!["img/h-ngong-1.jpg".to_string()],
            amenities: vec!["parking".to_string(), "garden".to_string()],
        },
        Listing {
            id: ListingId::new("h-nyali-2"),
            title: "Nyali family home with ocean view".to_string(),
            location: "Mombasa".to_string(),
            price: 1200,
            kind: ListingKind::House,
            images: vec![],
            amenities: vec!["parking".to_string(), "pool".to_string()],
        },
        Listing {
            id: ListingId::new("b-kilimani-1"),
            title: "Kilimani studio, walk to Yaya Centre".to_string(),
            location: "Nairobi".to_string(),
            price: 45,
            kind: ListingKind::Bnb,
            images: vec![],
            amenities: vec!["wifi".to_string()],
        },
        Listing {
            id: ListingId::new("b-diani-3"),
            title: "Diani beach banda, steps from the sand".to_string(),
            location: "Diani".to_string(),
            price: 80,
            kind: ListingKind::Bnb,
            images: vec![],
            amenities: vec!["wifi".to_string(), "breakfast".to_string()],
        },
    ]
}
