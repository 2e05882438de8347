//! Deployment-time configuration loaded from environment variables.

use crate::geo::LngLat;
use std::path::PathBuf;

/// Viewer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firestore project holding the parcel collection.
    pub firebase_project: Option<String>,
    /// Web API key sent with Firestore requests.
    pub firebase_api_key: Option<String>,
    /// Collection name.
    pub collection: String,
    /// Read parcels from this JSON export instead of Firestore.
    pub source_file: Option<PathBuf>,
    /// Map provider access token.
    pub map_token: Option<String>,
    /// Map style identifier.
    pub map_style: String,
    /// Initial camera.
    pub center: LngLat,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    /// Log file (the terminal is busy drawing the map).
    pub log_file: PathBuf,
    /// Panorama tour descriptor handed to the external viewer.
    pub panorama_xml: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firebase_project: None,
            firebase_api_key: None,
            collection: "lotes".into(),
            source_file: None,
            map_token: None,
            map_style: "mapbox://styles/adquirose/cma38r675000h01s1bw4q23zi".into(),
            center: (-72.2524, -45.3358),
            zoom: 10.0,
            pitch: 0.0,
            bearing: 0.0,
            log_file: PathBuf::from("lotes-map.log"),
            panorama_xml: "/krpano/tour.xml".into(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, default: f64| {
            non_empty(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default)
        };

        Self {
            firebase_project: non_empty("LOTES_FIREBASE_PROJECT"),
            firebase_api_key: non_empty("LOTES_FIREBASE_API_KEY"),
            collection: non_empty("LOTES_COLLECTION").unwrap_or(defaults.collection),
            source_file: non_empty("LOTES_SOURCE_FILE").map(PathBuf::from),
            map_token: non_empty("LOTES_MAP_TOKEN"),
            map_style: non_empty("LOTES_MAP_STYLE").unwrap_or(defaults.map_style),
            center: non_empty("LOTES_CENTER")
                .and_then(|v| parse_lnglat(&v))
                .unwrap_or(defaults.center),
            zoom: number("LOTES_ZOOM", defaults.zoom),
            pitch: number("LOTES_PITCH", defaults.pitch),
            bearing: number("LOTES_BEARING", defaults.bearing),
            log_file: non_empty("LOTES_LOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            panorama_xml: non_empty("LOTES_PANORAMA_XML").unwrap_or(defaults.panorama_xml),
        }
    }
}

/// Parse `"lon,lat"`
fn parse_lnglat(value: &str) -> Option<LngLat> {
    let (lon, lat) = value.split_once(',')?;
    let lon: f64 = lon.trim().parse().ok()?;
    let lat: f64 = lat.trim().parse().ok()?;
    ((-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)).then_some((lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]);
        assert_eq!(config.collection, "lotes");
        assert_eq!(config.center, (-72.2524, -45.3358));
        assert_eq!(config.zoom, 10.0);
        assert!(config.source_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("LOTES_CENTER", " -70.5, -33.4 "),
            ("LOTES_ZOOM", "12.5"),
            ("LOTES_SOURCE_FILE", "lotes.json"),
            ("LOTES_COLLECTION", ""),
        ]);
        assert_eq!(config.center, (-70.5, -33.4));
        assert_eq!(config.zoom, 12.5);
        assert_eq!(config.source_file, Some(PathBuf::from("lotes.json")));
        assert_eq!(config.collection, "lotes");
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config_with(&[("LOTES_CENTER", "300,10"), ("LOTES_ZOOM", "NaN")]);
        assert_eq!(config.center, (-72.2524, -45.3358));
        assert_eq!(config.zoom, 10.0);
    }
}
