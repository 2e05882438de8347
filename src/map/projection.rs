use crate::geo::{Bounds, LngLat};
use glam::DVec2;
use std::f64::consts::PI;

/// Size of the whole world in pixels at zoom 0
pub const WORLD_SIZE: f64 = 512.0;

pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;

/// Web Mercator latitude limit
const MAX_LAT: f64 = 85.051129;

/// Camera position: what the viewport looks at
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub center: LngLat,
    /// Slippy-map zoom level (world is `WORLD_SIZE * 2^zoom` pixels wide)
    pub zoom: f64,
    /// Degrees clockwise from north
    pub bearing: f64,
    /// Degrees from vertical. Recorded, not rendered.
    pub pitch: f64,
}

impl Camera {
    /// Interpolate towards `to`, `t` in `[0, 1]`. Center moves in Mercator
    /// space, bearing along the short way round.
    pub fn lerp(&self, to: &Camera, t: f64) -> Camera {
        let a = mercator(self.center);
        let b = mercator(to.center);
        let mut d_bearing = (to.bearing - self.bearing).rem_euclid(360.0);
        if d_bearing > 180.0 {
            d_bearing -= 360.0;
        }
        Camera {
            center: inverse_mercator(a.lerp(b, t)),
            zoom: self.zoom + (to.zoom - self.zoom) * t,
            bearing: normalize_bearing(self.bearing + d_bearing * t),
            pitch: self.pitch + (to.pitch - self.pitch) * t,
        }
    }
}

/// Viewport representing the visible map area
#[derive(Clone, Debug)]
pub struct Viewport {
    pub camera: Camera,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(camera: Camera, width: usize, height: usize) -> Self {
        let mut vp = Self { camera, width, height };
        vp.clamp();
        vp
    }

    fn scale(&self) -> f64 {
        WORLD_SIZE * 2f64.powf(self.camera.zoom)
    }

    fn half_size(&self) -> DVec2 {
        DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Screen rotation for the current bearing (map turns opposite the camera)
    fn rotation(&self) -> DVec2 {
        DVec2::from_angle(-self.camera.bearing.to_radians())
    }

    /// Project a geographic coordinate to (sub)pixel coordinates
    pub fn project_f(&self, lnglat: LngLat) -> DVec2 {
        let scale = self.scale();
        let delta = (mercator(lnglat) - mercator(self.camera.center)) * scale;
        self.rotation().rotate(delta) + self.half_size()
    }

    /// Project a geographic coordinate to pixel coordinates
    pub fn project(&self, lnglat: LngLat) -> (i32, i32) {
        let p = self.project_f(lnglat);
        (p.x.round() as i32, p.y.round() as i32)
    }

    /// Unproject pixel coordinates back to geographic coordinates
    pub fn unproject(&self, px: f64, py: f64) -> LngLat {
        let screen = DVec2::new(px, py) - self.half_size();
        let unrotated = DVec2::from_angle(self.camera.bearing.to_radians()).rotate(screen);
        inverse_mercator(mercator(self.camera.center) + unrotated / self.scale())
    }

    /// Pan by a pixel delta in screen space
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let center = self.half_size() + DVec2::new(dx, dy);
        self.camera.center = self.unproject(center.x, center.y);
        self.clamp();
    }

    /// Camera that frames `bounds` with `padding` pixels on every side,
    /// keeping the current bearing. `None` for empty bounds.
    pub fn camera_for_bounds(&self, bounds: &Bounds, padding: f64) -> Option<Camera> {
        let center_m = bounds.center().map(mercator)?;
        let min = mercator((bounds.min_lon, bounds.max_lat));
        let max = mercator((bounds.max_lon, bounds.min_lat));

        // Size of the rotated box at zoom 0
        let rot = self.rotation();
        let corners = [min, DVec2::new(max.x, min.y), max, DVec2::new(min.x, max.y)];
        let (lo, hi) = corners.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(lo, hi), &c| {
                let r = rot.rotate((c - center_m) * WORLD_SIZE);
                (lo.min(r), hi.max(r))
            },
        );
        let extent = hi - lo;

        let avail_w = (self.width as f64 - 2.0 * padding).max(1.0);
        let avail_h = (self.height as f64 - 2.0 * padding).max(1.0);
        let zoom_x = if extent.x > 0.0 { (avail_w / extent.x).log2() } else { MAX_ZOOM };
        let zoom_y = if extent.y > 0.0 { (avail_h / extent.y).log2() } else { MAX_ZOOM };

        Some(Camera {
            center: inverse_mercator(center_m),
            zoom: zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_ZOOM),
            ..self.camera
        })
    }

    /// Camera that puts `target` at `offset` pixels from the screen center
    /// once `zoom` is reached.
    pub fn camera_for_target(&self, target: LngLat, zoom: f64, offset: (f64, f64)) -> Camera {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let scale = WORLD_SIZE * 2f64.powf(zoom);
        let unrotated = DVec2::from_angle(self.camera.bearing.to_radians())
            .rotate(DVec2::new(offset.0, offset.1));
        Camera {
            center: inverse_mercator(mercator(target) - unrotated / scale),
            zoom,
            ..self.camera
        }
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a pixel-space box might intersect the viewport
    pub fn box_might_be_visible(&self, min: (i32, i32), max: (i32, i32)) -> bool {
        max.0 >= 0 && min.0 < self.width as i32 && max.1 >= 0 && min.1 < self.height as i32
    }

    fn clamp(&mut self) {
        let c = &mut self.camera;
        c.zoom = c.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        c.center.1 = c.center.1.clamp(-MAX_LAT, MAX_LAT);
        if c.center.0 > 180.0 || c.center.0 < -180.0 {
            c.center.0 = (c.center.0 + 180.0).rem_euclid(360.0) - 180.0;
        }
        c.bearing = normalize_bearing(c.bearing);
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.clamp();
    }
}

/// Bearing in `[0, 360)`
pub fn normalize_bearing(bearing: f64) -> f64 {
    bearing.rem_euclid(360.0)
}

/// Normalized Web Mercator coordinates, both axes in `[0, 1]`
pub fn mercator((lon, lat): LngLat) -> DVec2 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    let x = (lon + 180.0) / 360.0;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    DVec2::new(x, y)
}

pub fn inverse_mercator(p: DVec2) -> LngLat {
    let lon = p.x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * p.y)).sinh().atan().to_degrees();
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(center: LngLat, zoom: f64) -> Camera {
        Camera {
            center,
            zoom,
            bearing: 0.0,
            pitch: 0.0,
        }
    }

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(camera((-72.25, -45.33), 14.0), 100, 80);
        assert_eq!(vp.project((-72.25, -45.33)), (50, 40));
    }

    #[test]
    fn test_unproject_roundtrip_with_bearing() {
        let mut cam = camera((-72.25, -45.33), 15.0);
        cam.bearing = 30.0;
        let vp = Viewport::new(cam, 200, 120);
        let p = vp.project_f((-72.249, -45.331));
        let (lon, lat) = vp.unproject(p.x, p.y);
        assert!((lon + 72.249).abs() < 1e-9);
        assert!((lat + 45.331).abs() < 1e-9);
    }

    #[test]
    fn test_pan_moves_east() {
        let mut vp = Viewport::new(camera((0.0, 0.0), 3.0), 100, 100);
        vp.pan(10.0, 0.0);
        assert!(vp.camera.center.0 > 0.0);
        assert!(vp.camera.center.1.abs() < 1e-9);
    }

    #[test]
    fn test_camera_for_bounds_frames_box() {
        let vp = Viewport::new(camera((0.0, 0.0), 1.0), 400, 200);
        let mut bounds = Bounds::EMPTY;
        bounds.extend((-72.26, -45.34));
        bounds.extend((-72.24, -45.32));
        let cam = vp.camera_for_bounds(&bounds, 50.0).unwrap();

        let framed = Viewport::new(cam, 400, 200);
        for corner in [(-72.26, -45.34), (-72.24, -45.32)] {
            let p = framed.project_f(corner);
            assert!(p.x >= 49.0 && p.x <= 351.0, "{p:?}");
            assert!(p.y >= 49.0 && p.y <= 151.0, "{p:?}");
        }
        assert!(vp.camera_for_bounds(&Bounds::EMPTY, 50.0).is_none());
    }

    #[test]
    fn test_camera_for_target_offset() {
        let vp = Viewport::new(camera((0.0, 0.0), 10.0), 400, 200);
        let cam = vp.camera_for_target((-72.25, -45.33), 15.0, (100.0, 0.0));
        let after = Viewport::new(cam, 400, 200);
        let p = after.project_f((-72.25, -45.33));
        assert!((p.x - 300.0).abs() < 1e-6);
        assert!((p.y - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_lerp_short_way() {
        let mut a = camera((0.0, 0.0), 1.0);
        a.bearing = 350.0;
        let mut b = a;
        b.bearing = 10.0;
        assert!((a.lerp(&b, 0.5).bearing - 0.0).abs() < 1e-9);
    }
}
