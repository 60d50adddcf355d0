//! Web Mercator helpers for lon/lat trips

use geo::Coord;

/// Half the Web Mercator extent in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Pixel width of the whole world at zoom 0
pub const TILE_SIZE: f64 = 256.0;

const METERS_PER_DEGREE: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Project a lon/lat coordinate (degrees) to Web Mercator meters
///
/// Latitude is clamped to the representable band, so poles stay finite.
#[inline(always)]
pub fn lon_lat_to_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: coord.x * METERS_PER_DEGREE,
        y: (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln() * EARTH_MERCATOR_MAX
            / std::f64::consts::PI,
    }
}

/// Inverse of [`lon_lat_to_mercator`], returning lon/lat in degrees
#[inline(always)]
pub fn mercator_to_lon_lat(mercator: Coord<f64>) -> Coord<f64> {
    let lat = std::f64::consts::FRAC_PI_2
        - 2.0 * (-mercator.y * std::f64::consts::PI / EARTH_MERCATOR_MAX).exp().atan();
    Coord {
        x: mercator.x / METERS_PER_DEGREE,
        y: lat.to_degrees(),
    }
}

/// Whether a point lies inside the square Web Mercator extent
#[inline(always)]
pub fn is_valid_mercator(mercator: Coord<f64>) -> bool {
    (-EARTH_MERCATOR_MAX..=EARTH_MERCATOR_MAX).contains(&mercator.x)
        && (-EARTH_MERCATOR_MAX..=EARTH_MERCATOR_MAX).contains(&mercator.y)
}

/// World size in pixels at a (possibly fractional) zoom level
#[inline]
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Convert Web Mercator meters to world pixels at `zoom`
///
/// The origin is the north-west corner of the world and Y grows southwards.
#[inline]
pub fn mercator_to_world_pixel(mercator: Coord<f64>, zoom: f64) -> Coord<f64> {
    let scale = world_size(zoom) / (2.0 * EARTH_MERCATOR_MAX);
    Coord {
        x: (mercator.x + EARTH_MERCATOR_MAX) * scale,
        y: (EARTH_MERCATOR_MAX - mercator.y) * scale,
    }
}

/// Inverse of [`mercator_to_world_pixel`]
#[inline]
pub fn world_pixel_to_mercator(pixel: Coord<f64>, zoom: f64) -> Coord<f64> {
    let scale = (2.0 * EARTH_MERCATOR_MAX) / world_size(zoom);
    Coord {
        x: pixel.x * scale - EARTH_MERCATOR_MAX,
        y: EARTH_MERCATOR_MAX - pixel.y * scale,
    }
}

/// Lon/lat straight to world pixels at `zoom`
#[inline]
pub fn lon_lat_to_world_pixel(coord: Coord<f64>, zoom: f64) -> Coord<f64> {
    mercator_to_world_pixel(lon_lat_to_mercator(coord), zoom)
}
