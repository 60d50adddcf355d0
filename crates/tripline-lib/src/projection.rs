//! Host map collaborators: coordinate projection and camera matrices

use crate::utils;
use geo::Coord;

/// Column-major 4x4 matrix, as uploaded to the shader
pub type Mat4 = [f32; 16];

/// Projects trip coordinates into render space
///
/// `current_zoom` is the projection reference a build is run against; a geometry
/// rebuild samples it once and passes it back to every `project` call.
pub trait Projector {
    fn current_zoom(&self) -> f64;
    fn project(&self, coord: Coord<f64>, zoom: f64) -> Coord<f64>;
}

/// Supplies the view-projection matrix for the current frame
pub trait Camera {
    fn view_projection_matrix(&self) -> Mat4;
}

/// Web Mercator projector for WGS84 lon/lat trips
///
/// Vertices are projected into world pixels at `reference_zoom`. The camera
/// follows `zoom` and `center`, so panning and zooming only change the matrix
/// and never require a rebuild. Changing the reference zoom does.
#[derive(Debug, Clone, PartialEq)]
pub struct WebMercatorProjector {
    reference_zoom: f64,
    zoom: f64,
    /// Lon/lat at the middle of the viewport
    center: Coord<f64>,
    /// Viewport size in pixels
    viewport: (f64, f64),
}

impl WebMercatorProjector {
    pub fn new(reference_zoom: f64) -> Self {
        Self {
            reference_zoom,
            zoom: reference_zoom,
            center: Coord { x: 0.0, y: 0.0 },
            viewport: (1024.0, 768.0),
        }
    }

    pub fn with_center(mut self, lon: f64, lat: f64) -> Self {
        self.center = Coord { x: lon, y: lat };
        self
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn set_center(&mut self, lon: f64, lat: f64) {
        self.center = Coord { x: lon, y: lat };
    }

    /// Move the centre by a screen-space offset in pixels, X right and Y down
    ///
    /// The centre stays inside the Web Mercator extent.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let center = utils::lon_lat_to_world_pixel(self.center, self.zoom);
        let moved = Coord {
            x: center.x + dx,
            y: center.y + dy,
        };
        let mut mercator = utils::world_pixel_to_mercator(moved, self.zoom);
        if !utils::is_valid_mercator(mercator) {
            mercator.x = mercator.x.clamp(-utils::EARTH_MERCATOR_MAX, utils::EARTH_MERCATOR_MAX);
            mercator.y = mercator.y.clamp(-utils::EARTH_MERCATOR_MAX, utils::EARTH_MERCATOR_MAX);
        }
        self.center = utils::mercator_to_lon_lat(mercator);
    }

    pub fn set_reference_zoom(&mut self, reference_zoom: f64) {
        self.reference_zoom = reference_zoom;
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Lon/lat at the middle of the viewport
    #[inline]
    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    #[inline]
    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }
}

impl Projector for WebMercatorProjector {
    fn current_zoom(&self) -> f64 {
        self.reference_zoom
    }

    fn project(&self, coord: Coord<f64>, zoom: f64) -> Coord<f64> {
        utils::lon_lat_to_world_pixel(coord, zoom)
    }
}

impl Camera for WebMercatorProjector {
    /// Orthographic view centred on `center`, Y flipped so north is up
    fn view_projection_matrix(&self) -> Mat4 {
        let center = self.project(self.center, self.reference_zoom);
        let scale = (self.zoom - self.reference_zoom).exp2();
        let (width, height) = self.viewport;
        let sx = 2.0 * scale / width.max(1.0);
        let sy = -2.0 * scale / height.max(1.0);

        let mut m = [0.0f32; 16];
        m[0] = sx as f32;
        m[5] = sy as f32;
        m[10] = 1.0;
        m[12] = (-center.x * sx) as f32;
        m[13] = (-center.y * sy) as f32;
        m[15] = 1.0;
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_clip(m: &Mat4, p: Coord<f64>) -> (f64, f64) {
        let x = m[0] as f64 * p.x + m[12] as f64;
        let y = m[5] as f64 * p.y + m[13] as f64;
        (x, y)
    }

    #[test]
    fn test_project_is_zoom_dependent() {
        let projector = WebMercatorProjector::new(0.0);
        let at_0 = projector.project(Coord { x: 0.0, y: 0.0 }, 0.0);
        let at_1 = projector.project(Coord { x: 0.0, y: 0.0 }, 1.0);
        assert!((at_0.x - 128.0).abs() < 1e-9);
        assert!((at_1.x - 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_current_zoom_is_reference() {
        let mut projector = WebMercatorProjector::new(10.0);
        projector.set_zoom(12.5);
        assert_eq!(projector.current_zoom(), 10.0);
        projector.set_reference_zoom(11.0);
        assert_eq!(projector.current_zoom(), 11.0);
    }

    #[test]
    fn test_center_maps_to_clip_origin() {
        let projector = WebMercatorProjector::new(4.0)
            .with_center(13.4, 52.5)
            .with_viewport(800.0, 600.0);
        let m = projector.view_projection_matrix();
        let center = projector.project(Coord { x: 13.4, y: 52.5 }, 4.0);
        let (x, y) = to_clip(&m, center);
        assert!(x.abs() < 1e-3);
        assert!(y.abs() < 1e-3);
    }

    #[test]
    fn test_north_is_up() {
        let projector = WebMercatorProjector::new(4.0).with_center(0.0, 0.0);
        let m = projector.view_projection_matrix();
        let north = projector.project(Coord { x: 0.0, y: 1.0 }, 4.0);
        let (_, y) = to_clip(&m, north);
        assert!(y > 0.0);
    }

    #[test]
    fn test_pan_moves_center_in_screen_pixels() {
        let mut projector = WebMercatorProjector::new(3.0).with_center(0.0, 0.0);
        projector.set_zoom(3.0);
        // 2048 px world at zoom 3, so 512 px east is a quarter turn
        projector.pan_by(512.0, 0.0);
        assert!((projector.center().x - 90.0).abs() < 1e-9);
        assert!(projector.center().y.abs() < 1e-9);

        projector.pan_by(0.0, -1.0e9);
        assert!((projector.center().y - utils::MAX_LATITUDE).abs() < 1e-6);
    }

    #[test]
    fn test_zooming_scales_matrix() {
        let mut projector = WebMercatorProjector::new(4.0);
        let before = projector.view_projection_matrix()[0];
        projector.set_zoom(5.0);
        let after = projector.view_projection_matrix()[0];
        assert!((after / before - 2.0).abs() < 1e-6);
    }
}
