use std::path::Path;
use std::time::Duration;

use nyumba_domain::{Listing, ListingId, ListingKind};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::{RawCoordinatorTimings, RawListing, RawSettings};
use crate::settings::{CoordinatorTimings, Settings};

/// Load the settings file. An absent file yields the defaults; a present but
/// malformed file is an error.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "settings file absent, using defaults");
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: RawSettings = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Settings {
        timings: convert_timings(raw.coordinator),
        durable_path: raw.durable_path.map(Into::into),
        seed_path: raw.seed_path.map(Into::into),
    })
}

fn convert_timings(raw: RawCoordinatorTimings) -> CoordinatorTimings {
    let defaults = CoordinatorTimings::default();
    let ms = |value: Option<u64>, fallback: Duration| {
        value.map(Duration::from_millis).unwrap_or(fallback)
    };
    CoordinatorTimings {
        poll_interval: ms(raw.poll_interval_ms, defaults.poll_interval),
        monitor_timeout: ms(raw.monitor_timeout_ms, defaults.monitor_timeout),
        backend_wait: ms(raw.backend_wait_ms, defaults.backend_wait),
        auth_wait: ms(raw.auth_wait_ms, defaults.auth_wait),
        aggregate_wait: ms(raw.aggregate_wait_ms, defaults.aggregate_wait),
        wait_poll: ms(raw.wait_poll_ms, defaults.wait_poll),
    }
}

/// Load a YAML list of seed listings for the local backend.
pub fn load_seed_listings(path: &Path) -> Result<Vec<Listing>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: Vec<RawListing> =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.display().to_string(),
            source: e,
        })?;

    let listings = raw
        .into_iter()
        .map(convert_listing)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), count = listings.len(), "loaded seed listings");
    Ok(listings)
}

fn convert_listing(raw: RawListing) -> Result<Listing, ConfigError> {
    let kind = ListingKind::parse(&raw.kind)?;
    Ok(Listing {
        id: ListingId::new(raw.id),
        title: raw.title,
        location: raw.location,
        price: raw.price,
        kind,
        images: raw.images,
        amenities: raw.amenities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn absent_settings_file_means_defaults() {
        let settings = load_settings(Path::new("/definitely/not/there.yml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_settings_keep_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "settings.yml",
            "coordinator:\n  poll_interval_ms: 50\ndurable_path: /tmp/session.json\n",
        );
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.timings.poll_interval, Duration::from_millis(50));
        assert_eq!(settings.timings.monitor_timeout, Duration::from_secs(15));
        assert_eq!(
            settings.durable_path.as_deref(),
            Some(Path::new("/tmp/session.json"))
        );
        assert!(settings.seed_path.is_none());
    }

    #[test]
    fn seed_listings_convert_and_tag_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "seed.yml",
            "- id: h1\n  title: Garden House\n  location: Nairobi\n  price: 500\n  type: house\n- id: b1\n  title: Beach Room\n  location: Mombasa\n  price: 80\n  type: bnb\n  amenities: [wifi]\n",
        );
        let listings = load_seed_listings(&path).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].kind, ListingKind::House);
        assert_eq!(listings[1].kind, ListingKind::Bnb);
        assert_eq!(listings[1].amenities, vec!["wifi".to_string()]);
    }

    #[test]
    fn unknown_seed_kind_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "seed.yml",
            "- id: x\n  title: X\n  location: Y\n  price: 1\n  type: hotel\n",
        );
        assert!(matches!(
            load_seed_listings(&path),
            Err(ConfigError::Domain(_))
        ));
    }
}
