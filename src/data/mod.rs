mod firestore;

use crate::config::Config;
use crate::error::{FetchError, GeometryError};
use crate::geo::{LngLat, Ring};
use geojson::{Feature, GeoJson, Geometry, JsonObject, Value};
use serde_json::Value as JsonValue;
use std::path::PathBuf;

pub use firestore::FirestoreSource;

/// Prefix stripped from parcel ids for display
pub const LABEL_PREFIX: &str = "lote_";

/// Placeholder shown for absent display attributes
pub const NOT_AVAILABLE: &str = "N/A";

/// A record as it comes out of the document store: its id plus every field
#[derive(Clone, Debug, Default)]
pub struct RawRecord {
    pub id: String,
    pub fields: JsonObject,
}

/// A real-estate parcel ("lote")
#[derive(Clone, Debug, PartialEq)]
pub struct Parcel {
    pub id: String,
    /// Linear rings, outer boundary first. Empty when the record had no usable
    /// Polygon geometry.
    pub coordinates: Vec<Ring>,
    pub estado: Option<JsonValue>,
    pub superficie: Option<JsonValue>,
    pub valor: Option<JsonValue>,
    pub len: f64,
    pub reflen: f64,
    pub class: String,
    /// Every other field of the source record, carried into feature properties
    pub extra: JsonObject,
}

impl Parcel {
    /// Normalize a raw record. Never fails: bad geometry leaves the parcel
    /// listed with empty coordinates.
    pub fn from_record(record: RawRecord) -> Self {
        let RawRecord { id, mut fields } = record;

        let coordinates = match fields.remove("geometry") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(raw) => match parse_geometry(raw) {
                Ok(rings) => rings,
                Err(err) => {
                    tracing::warn!(parcel = %id, %err, "ignoring parcel geometry");
                    Vec::new()
                }
            },
        };

        let estado = take_display(&mut fields, "estado");
        let superficie = take_display(&mut fields, "superficie");
        let valor = take_display(&mut fields, "valor");
        let len = take_number(&mut fields, "len");
        let reflen = take_number(&mut fields, "reflen");
        let class = match fields.remove("class") {
            Some(JsonValue::String(s)) if !s.is_empty() => s,
            _ => "default".to_string(),
        };

        Self {
            id,
            coordinates,
            estado,
            superficie,
            valor,
            len,
            reflen,
            class,
            extra: fields,
        }
    }

    /// Whether the parcel has geometry to draw
    pub fn is_renderable(&self) -> bool {
        self.outer_ring().is_some_and(|ring| !ring.is_empty())
    }

    pub fn outer_ring(&self) -> Option<&Ring> {
        self.coordinates.first()
    }

    /// Id with the `lote_` prefix stripped
    pub fn label(&self) -> &str {
        self.id.strip_prefix(LABEL_PREFIX).unwrap_or(&self.id)
    }

    pub fn estado_text(&self) -> String {
        display_text(self.estado.as_ref())
    }

    pub fn superficie_text(&self) -> String {
        display_text(self.superficie.as_ref())
    }

    pub fn valor_text(&self) -> String {
        display_text(self.valor.as_ref())
    }

    /// Source id shared by the fill and outline layers
    pub fn source_id(&self) -> String {
        format!("lote-{}", self.id)
    }

    pub fn fill_layer_id(&self) -> String {
        format!("lote-fill-{}", self.id)
    }

    pub fn line_layer_id(&self) -> String {
        format!("lote-line-{}", self.id)
    }

    /// Properties attached to the map feature. `len`, `reflen` and `class` are
    /// always present so data-driven styling never reads a missing value.
    pub fn feature_properties(&self) -> JsonObject {
        let mut props = self.extra.clone();
        props.insert("id".into(), JsonValue::String(self.id.clone()));
        for (key, value) in [
            ("estado", &self.estado),
            ("superficie", &self.superficie),
            ("valor", &self.valor),
        ] {
            if let Some(v) = value {
                props.insert(key.into(), v.clone());
            }
        }
        props.insert("len".into(), number(self.len));
        props.insert("reflen".into(), number(self.reflen));
        props.insert("class".into(), JsonValue::String(self.class.clone()));
        props
    }

    /// GeoJSON feature for the map source, `None` without geometry
    pub fn to_feature(&self) -> Option<Feature> {
        if !self.is_renderable() {
            return None;
        }
        let rings = self
            .coordinates
            .iter()
            .map(|ring| ring.iter().map(|&(lon, lat)| vec![lon, lat]).collect())
            .collect();
        Some(Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(rings))),
            id: None,
            properties: Some(self.feature_properties()),
            foreign_members: None,
        })
    }
}

/// Parse a geometry field. Accepts the serialized string the store keeps, or
/// an already-decoded object. Only `Polygon` is accepted.
pub fn parse_geometry(raw: JsonValue) -> Result<Vec<Ring>, GeometryError> {
    let geojson = match raw {
        JsonValue::String(text) => text
            .parse::<GeoJson>()
            .map_err(|e| GeometryError::Malformed(e.to_string()))?,
        other => GeoJson::from_json_value(other)
            .map_err(|e| GeometryError::Malformed(e.to_string()))?,
    };

    let geometry = match geojson {
        GeoJson::Geometry(g) => g,
        GeoJson::Feature(_) => return Err(GeometryError::NotPolygon("Feature")),
        GeoJson::FeatureCollection(_) => {
            return Err(GeometryError::NotPolygon("FeatureCollection"))
        }
    };

    match geometry.value {
        Value::Polygon(rings) => rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .map(|pos| match pos.as_slice() {
                        [lon, lat, ..] => Ok((*lon, *lat)),
                        _ => Err(GeometryError::Malformed("position needs lon and lat".into())),
                    })
                    .collect::<Result<Vec<LngLat>, _>>()
            })
            .collect(),
        other => Err(GeometryError::NotPolygon(geometry_type(&other))),
    }
}

fn geometry_type(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Falsy values (null, "", 0, false) count as absent, as the store's
/// producers use them for "not filled in".
fn take_display(fields: &mut JsonObject, key: &str) -> Option<JsonValue> {
    fields.remove(key).filter(|v| match v {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    })
}

fn take_number(fields: &mut JsonObject, key: &str) -> f64 {
    match fields.remove(key) {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn display_text(value: Option<&JsonValue>) -> String {
    match value {
        None => NOT_AVAILABLE.to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn number(value: f64) -> JsonValue {
    // Integral values stay integers so styling expressions compare cleanly
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        JsonValue::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::from(0))
    }
}

/// Where parcel records come from
pub enum ParcelSource {
    Firestore(FirestoreSource),
    /// A JSON export: an array of objects, each with an `id`
    File(PathBuf),
}

impl ParcelSource {
    pub fn from_config(config: &Config) -> Self {
        match &config.source_file {
            Some(path) => ParcelSource::File(path.clone()),
            None => ParcelSource::Firestore(FirestoreSource::new(
                config.firebase_project.clone(),
                config.firebase_api_key.clone(),
                config.collection.clone(),
            )),
        }
    }

    /// Fetch every raw record in the collection
    pub async fn fetch_records(&self) -> Result<Vec<RawRecord>, FetchError> {
        match self {
            ParcelSource::Firestore(source) => source.fetch_records().await,
            ParcelSource::File(path) => {
                let mut bytes = tokio::fs::read(path).await?;
                decode_export(&mut bytes)
            }
        }
    }
}

/// Decode a JSON export. Records without a string `id` are skipped.
pub fn decode_export(bytes: &mut [u8]) -> Result<Vec<RawRecord>, FetchError> {
    let rows: Vec<JsonObject> = simd_json::serde::from_slice(bytes)?;
    Ok(rows
        .into_iter()
        .filter_map(|mut fields| match fields.remove("id") {
            Some(JsonValue::String(id)) => Some(RawRecord { id, fields }),
            _ => {
                tracing::warn!("skipping exported record without an id");
                None
            }
        })
        .collect())
}

/// Fetch and normalize all parcels. A failed fetch is logged and yields an
/// empty list so the map still comes up.
pub async fn fetch_parcels(source: &ParcelSource) -> Vec<Parcel> {
    match source.fetch_records().await {
        Ok(records) => {
            let parcels: Vec<Parcel> = records.into_iter().map(Parcel::from_record).collect();
            tracing::info!(
                total = parcels.len(),
                renderable = parcels.iter().filter(|p| p.is_renderable()).count(),
                "parcels loaded"
            );
            parcels
        }
        Err(err) => {
            tracing::error!(%err, "failed to fetch parcels");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, fields: JsonValue) -> RawRecord {
        let JsonValue::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        RawRecord {
            id: id.to_string(),
            fields,
        }
    }

    const SQUARE: &str =
        r#"{"type":"Polygon","coordinates":[[[-72.25,-45.33],[-72.24,-45.33],[-72.24,-45.32],[-72.25,-45.33]]]}"#;

    #[test]
    fn test_polygon_record() {
        let parcel = Parcel::from_record(record(
            "lote_12",
            json!({"geometry": SQUARE, "estado": "Disponible", "superficie": 5.2, "valor": "45.000.000"}),
        ));
        assert_eq!(parcel.coordinates.len(), 1);
        assert_eq!(parcel.coordinates[0].len(), 4);
        assert_eq!(parcel.coordinates[0][1], (-72.24, -45.33));
        assert!(parcel.is_renderable());
        assert_eq!(parcel.label(), "12");
        assert_eq!(parcel.estado_text(), "Disponible");
        assert_eq!(parcel.superficie_text(), "5.2");
        assert_eq!(parcel.fill_layer_id(), "lote-fill-lote_12");
        assert_eq!(parcel.line_layer_id(), "lote-line-lote_12");
        assert_eq!(parcel.source_id(), "lote-lote_12");
    }

    #[test]
    fn test_point_geometry_is_kept_without_shape() {
        let parcel = Parcel::from_record(record(
            "lote_3",
            json!({"geometry": r#"{"type":"Point","coordinates":[1,2]}"#}),
        ));
        assert!(parcel.coordinates.is_empty());
        assert!(!parcel.is_renderable());
        assert!(parcel.to_feature().is_none());
    }

    #[test]
    fn test_malformed_and_missing_geometry() {
        let garbage = Parcel::from_record(record("a", json!({"geometry": "{not json"})));
        assert!(garbage.coordinates.is_empty());

        let missing = Parcel::from_record(record("b", json!({})));
        assert!(missing.coordinates.is_empty());

        let short = parse_geometry(json!(r#"{"type":"Polygon","coordinates":[[[1],[2],[3]]]}"#));
        assert!(matches!(short, Err(GeometryError::Malformed(_))));
    }

    #[test]
    fn test_geometry_as_object() {
        let rings = parse_geometry(json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        }))
        .unwrap();
        assert_eq!(rings[0].len(), 4);
    }

    #[test]
    fn test_multipolygon_rejected() {
        let err = parse_geometry(json!(r#"{"type":"MultiPolygon","coordinates":[]}"#)).unwrap_err();
        assert_eq!(err, GeometryError::NotPolygon("MultiPolygon"));
    }

    #[test]
    fn test_missing_attributes_default() {
        let parcel = Parcel::from_record(record("lote_9", json!({"geometry": SQUARE})));
        assert_eq!(parcel.estado_text(), NOT_AVAILABLE);
        assert_eq!(parcel.superficie_text(), NOT_AVAILABLE);
        assert_eq!(parcel.valor_text(), NOT_AVAILABLE);

        let props = parcel.feature_properties();
        assert_eq!(props["len"], json!(0));
        assert_eq!(props["reflen"], json!(0));
        assert_eq!(props["class"], json!("default"));
        assert!(!props.contains_key("geometry"));
    }

    #[test]
    fn test_present_styling_attributes_kept() {
        let parcel = Parcel::from_record(record(
            "x",
            json!({"len": 12.5, "reflen": "3", "class": "premium", "sector": "norte", "valor": 0}),
        ));
        let props = parcel.feature_properties();
        assert_eq!(props["len"], json!(12.5));
        assert_eq!(props["reflen"], json!(3));
        assert_eq!(props["class"], json!("premium"));
        assert_eq!(props["sector"], json!("norte"));
        assert_eq!(parcel.valor_text(), NOT_AVAILABLE);
    }

    #[test]
    fn test_label_without_prefix() {
        let parcel = Parcel::from_record(record("A-7", json!({})));
        assert_eq!(parcel.label(), "A-7");
    }

    #[test]
    fn test_feature_carries_polygon() {
        let parcel = Parcel::from_record(record("lote_1", json!({"geometry": SQUARE})));
        let feature = parcel.to_feature().unwrap();
        let geometry = feature.geometry.unwrap();
        assert!(matches!(geometry.value, Value::Polygon(ref rings) if rings[0].len() == 4));
        assert_eq!(feature.properties.unwrap()["id"], json!("lote_1"));
    }

    #[test]
    fn test_decode_export_skips_rows_without_id() {
        let mut bytes = br#"[{"id":"lote_1","estado":"Vendido"},{"estado":"Reservado"}]"#.to_vec();
        let records = decode_export(&mut bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "lote_1");
        assert_eq!(records[0].fields["estado"], json!("Vendido"));
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lotes-map-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn test_fetch_from_export_file() {
        let path = temp_path("export.json");
        let body = json!([
            {"id": "lote_1", "geometry": SQUARE, "estado": "Disponible"},
            {"id": "lote_2", "geometry": r#"{"type":"Point","coordinates":[1,2]}"#}
        ]);
        std::fs::write(&path, body.to_string()).unwrap();

        let parcels = fetch_parcels(&ParcelSource::File(path.clone())).await;
        std::fs::remove_file(&path).ok();

        assert_eq!(parcels.len(), 2);
        assert!(parcels[0].is_renderable());
        assert!(!parcels[1].is_renderable());
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty_list() {
        let missing = ParcelSource::File(temp_path("does-not-exist.json"));
        assert!(fetch_parcels(&missing).await.is_empty());

        let path = temp_path("broken.json");
        std::fs::write(&path, "{ definitely not an array").unwrap();
        let parcels = fetch_parcels(&ParcelSource::File(path.clone())).await;
        std::fs::remove_file(&path).ok();
        assert!(parcels.is_empty());
    }
}
