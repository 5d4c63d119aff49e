//! Geographic primitives: points, levels and bounding rectangles

use std::fmt;

use serde::{Deserialize, Serialize};

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const ORIGIN: GeoPoint = GeoPoint { lat: 0.0, lng: 0.0 };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Floor/level a marker belongs to, keyed by altitude
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(f64);

impl Level {
    pub const GROUND: Level = Level(0.0);

    pub fn new(altitude: f64) -> Self {
        Self(altitude)
    }

    pub fn from_altitude(altitude: Option<f64>) -> Self {
        match altitude {
            Some(alt) if alt.is_finite() => Self(alt),
            _ => Self::GROUND,
        }
    }

    pub fn altitude(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimal rectangle covering a set of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl Bounds {
    /// Degenerate bounds containing a single point
    pub fn point(p: GeoPoint) -> Self {
        Self {
            south_west: p,
            north_east: p,
        }
    }

    /// Grow the rectangle so that it contains `p`
    pub fn extend(&mut self, p: GeoPoint) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&p.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&p.lng)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_grows_in_every_direction() {
        let mut bounds = Bounds::point(GeoPoint::new(10.0, 20.0));
        bounds.extend(GeoPoint::new(-5.0, 30.0));
        bounds.extend(GeoPoint::new(12.0, 15.0));

        assert_eq!(bounds.south_west, GeoPoint::new(-5.0, 15.0));
        assert_eq!(bounds.north_east, GeoPoint::new(12.0, 30.0));
        assert!(bounds.contains(GeoPoint::new(0.0, 20.0)));
        assert_eq!(bounds.center(), GeoPoint::new(3.5, 22.5));
    }

    #[test]
    fn test_level_defaults_to_ground() {
        assert_eq!(Level::from_altitude(None), Level::GROUND);
        assert_eq!(Level::from_altitude(Some(f64::NAN)), Level::GROUND);
        assert_eq!(Level::from_altitude(Some(3.0)).to_string(), "3");
    }
}
