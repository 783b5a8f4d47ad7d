//! Geographic to planar coordinate projection.

/// Mean Earth radius (m).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Local equirectangular projection centred on an origin.
///
/// Maps WGS84 degrees to metres east/north of the origin. Accurate to well
/// under one percent over a city-scale planning area, which is all nearest
/// transformer search needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin_lat: f64,
    origin_lon: f64,
    cos_origin_lat: f64,
}

impl LocalProjection {
    /// Creates a projection centred on `(origin_lat, origin_lon)` degrees.
    pub fn new(origin_lat: f64, origin_lon: f64) -> Self {
        Self {
            origin_lat,
            origin_lon,
            cos_origin_lat: origin_lat.to_radians().cos(),
        }
    }

    /// Centres the projection on the mean of the given `(lat, lon)` points.
    ///
    /// Returns `None` for an empty point set.
    pub fn centred_on<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let (mut lat_sum, mut lon_sum, mut n) = (0.0_f64, 0.0_f64, 0_usize);
        for (lat, lon) in points {
            lat_sum += lat;
            lon_sum += lon;
            n += 1;
        }
        (n > 0).then(|| Self::new(lat_sum / n as f64, lon_sum / n as f64))
    }

    /// Projects `(lat, lon)` degrees to `(east_m, north_m)`.
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let east = (lon - self.origin_lon).to_radians() * EARTH_RADIUS_M * self.cos_origin_lat;
        let north = (lat - self.origin_lat).to_radians() * EARTH_RADIUS_M;
        (east, north)
    }

    /// Planar distance between two geographic points (m).
    pub fn distance_m(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let (ax, ay) = self.project(a.0, a.1);
        let (bx, by) = self.project(b.0, b.1);
        (ax - bx).hypot(ay - by)
    }
}
