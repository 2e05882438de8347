//! Firestore REST client for the parcel collection.

use super::RawRecord;
use crate::error::FetchError;
use geojson::JsonObject;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: usize = 300;

/// Reads every document of one collection
pub struct FirestoreSource {
    project: String,
    api_key: Option<String>,
    collection: String,
    http: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,
}

/// One typed Firestore value. Exactly one field is set; `nullValue` and
/// unknown kinds decode to JSON null.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreValue {
    string_value: Option<String>,
    integer_value: Option<String>,
    double_value: Option<f64>,
    boolean_value: Option<bool>,
    timestamp_value: Option<String>,
    reference_value: Option<String>,
    geo_point_value: Option<GeoPoint>,
    map_value: Option<MapValue>,
    array_value: Option<ArrayValue>,
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
struct MapValue {
    #[serde(default)]
    fields: HashMap<String, FirestoreValue>,
}

#[derive(Debug, Default, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<FirestoreValue>,
}

impl FirestoreValue {
    fn into_json(self) -> JsonValue {
        if let Some(s) = self.string_value {
            JsonValue::String(s)
        } else if let Some(i) = self.integer_value {
            // int64 travels as a string
            i.parse::<i64>().map(JsonValue::from).unwrap_or(JsonValue::String(i))
        } else if let Some(d) = self.double_value {
            serde_json::Number::from_f64(d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null)
        } else if let Some(b) = self.boolean_value {
            JsonValue::Bool(b)
        } else if let Some(t) = self.timestamp_value.or(self.reference_value) {
            JsonValue::String(t)
        } else if let Some(p) = self.geo_point_value {
            serde_json::json!({ "latitude": p.latitude, "longitude": p.longitude })
        } else if let Some(m) = self.map_value {
            JsonValue::Object(fields_to_json(m.fields))
        } else if let Some(a) = self.array_value {
            JsonValue::Array(a.values.into_iter().map(FirestoreValue::into_json).collect())
        } else {
            JsonValue::Null
        }
    }
}

fn fields_to_json(fields: HashMap<String, FirestoreValue>) -> JsonObject {
    fields.into_iter().map(|(k, v)| (k, v.into_json())).collect()
}

impl Document {
    fn into_record(self) -> RawRecord {
        // name = projects/{p}/databases/(default)/documents/{collection}/{id}
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or(&self.name)
            .to_string();
        RawRecord {
            id,
            fields: fields_to_json(self.fields),
        }
    }
}

impl FirestoreSource {
    pub fn new(project: Option<String>, api_key: Option<String>, collection: String) -> Self {
        Self {
            project: project.unwrap_or_default(),
            api_key,
            collection,
            http: reqwest::Client::new(),
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            FIRESTORE_BASE, self.project, self.collection
        )
    }

    /// List the whole collection, following page tokens
    pub async fn fetch_records(&self) -> Result<Vec<RawRecord>, FetchError> {
        if self.project.is_empty() {
            return Err(FetchError::MissingProject);
        }

        let url = self.collection_url();
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(key) = &self.api_key {
                query.push(("key", key.clone()));
            }
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let resp = self.http.get(&url).query(&query).send().await?;
            if !resp.status().is_success() {
                return Err(FetchError::Status(resp.status()));
            }

            let mut body = resp.bytes().await?.to_vec();
            let page = decode_page(&mut body)?;
            tracing::debug!(
                collection = %self.collection,
                documents = page.documents.len(),
                "fetched page"
            );

            records.extend(page.documents.into_iter().map(Document::into_record));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(records)
    }
}

fn decode_page(body: &mut [u8]) -> Result<ListDocumentsResponse, FetchError> {
    // An empty collection comes back as `{}`
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(ListDocumentsResponse::default());
    }
    Ok(simd_json::serde::from_slice(body)?)
}
