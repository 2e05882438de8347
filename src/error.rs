use thiserror::Error;

/// Failure to reach or decode the parcel store. Never shown to the user:
/// the repository logs it and hands back an empty list.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to parcel store failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("parcel store answered with status {0}")]
    Status(reqwest::StatusCode),

    #[error("could not decode parcel store response: {0}")]
    Decode(#[from] simd_json::Error),

    #[error("could not read parcel export: {0}")]
    Io(#[from] std::io::Error),

    #[error("firestore project id is not configured")]
    MissingProject,
}

/// Problems with a single parcel's geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry is not valid GeoJSON: {0}")]
    Malformed(String),

    #[error("expected a Polygon geometry, found {0}")]
    NotPolygon(&'static str),

    #[error("ring has {0} points, at least 3 are required")]
    TooFewPoints(usize),

    #[error("ring encloses zero area")]
    Degenerate,
}

/// Errors reported by a map engine. Logged by the controller; the map keeps
/// running on whatever layers were registered.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("source {0} already exists")]
    SourceExists(String),

    #[error("source {0} does not exist")]
    UnknownSource(String),

    #[error("source {0} is still used by a layer")]
    SourceInUse(String),

    #[error("layer {0} already exists")]
    LayerExists(String),

    #[error("layer {0} does not exist")]
    UnknownLayer(String),

    #[error("marker {0} does not exist")]
    UnknownMarker(usize),
}
