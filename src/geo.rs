use crate::error::GeometryError;

/// A `(longitude, latitude)` pair in degrees
pub type LngLat = (f64, f64);

/// An ordered ring of coordinates. Closed rings repeat the first point last.
pub type Ring = Vec<LngLat>;

/// Area-weighted centroid of a simple polygon ring (shoelace formula).
///
/// The closing edge (last point back to the first) is always included, so
/// rings with or without an explicit duplicate closing point give the same
/// answer.
pub fn centroid(ring: &[LngLat]) -> Result<LngLat, GeometryError> {
    let points = open_ring(ring);
    if points.len() < 3 {
        return Err(GeometryError::TooFewPoints(points.len()));
    }

    // Shift to the first vertex so large absolute coordinates don't eat
    // precision in the cross products.
    let (ox, oy) = points[0];

    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;

    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        let (x1, y1, x2, y2) = (x1 - ox, y1 - oy, x2 - ox, y2 - oy);
        let factor = x1 * y2 - x2 * y1;

        area += factor;
        cx += (x1 + x2) * factor;
        cy += (y1 + y2) * factor;
    }

    let scale = points
        .iter()
        .map(|&(x, y)| (x - ox).abs().max((y - oy).abs()))
        .fold(0.0_f64, f64::max);
    if scale == 0.0 || area.abs() <= f64::EPSILON * scale * scale {
        return Err(GeometryError::Degenerate);
    }

    Ok((ox + cx / (3.0 * area), oy + cy / (3.0 * area)))
}

/// Arithmetic mean of the ring's distinct vertices. Biased towards densely
/// sampled edges; only used when the ring has no usable area.
pub fn vertex_mean(ring: &[LngLat]) -> Option<LngLat> {
    let points = open_ring(ring);
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    Some((sx / n, sy / n))
}

/// Where to put a parcel's label: the centroid, or the vertex mean when the
/// ring is degenerate.
pub fn label_position(ring: &[LngLat]) -> Option<LngLat> {
    match centroid(ring) {
        Ok(c) => Some(c),
        Err(err) => {
            tracing::warn!(%err, points = ring.len(), "falling back to vertex mean for label");
            vertex_mean(ring)
        }
    }
}

/// Drop the duplicate closing point if present
fn open_ring(ring: &[LngLat]) -> &[LngLat] {
    match ring {
        [first, .., last] if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Axis-aligned lon/lat box. `Bounds::EMPTY` contains nothing and is distinct
/// from a box around a single point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        min_lon: f64::INFINITY,
        min_lat: f64::INFINITY,
        max_lon: f64::NEG_INFINITY,
        max_lat: f64::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.min_lon > self.max_lon || self.min_lat > self.max_lat
    }

    pub fn extend(&mut self, (lon, lat): LngLat) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    pub fn contains(&self, (lon, lat): LngLat) -> bool {
        !self.is_empty()
            && lon >= self.min_lon
            && lon <= self.max_lon
            && lat >= self.min_lat
            && lat <= self.max_lat
    }

    pub fn center(&self) -> Option<LngLat> {
        if self.is_empty() {
            None
        } else {
            Some((
                (self.min_lon + self.max_lon) / 2.0,
                (self.min_lat + self.max_lat) / 2.0,
            ))
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Fold every coordinate of every ring into one box
pub fn accumulate_bounds<'a, I>(rings: I) -> Bounds
where
    I: IntoIterator<Item = &'a Ring>,
{
    let mut bounds = Bounds::EMPTY;
    for ring in rings {
        for &point in ring {
            bounds.extend(point);
        }
    }
    bounds
}

/// Even-odd point-in-polygon test against the outer ring
pub fn ring_contains(ring: &[LngLat], (x, y): LngLat) -> bool {
    let points = open_ring(ring);
    let mut inside = false;
    let mut j = points.len().wrapping_sub(1);
    for i in 0..points.len() {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
