use geo::{coord, point, Point, Rect};
use std::fmt;

/// Approximate center of the tri-city area, used when a user opens the map
/// without having shared a location first.
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    latitude: 54.45,
    longitude: 18.60,
};

/// A latitude/longitude pair. No range is enforced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(coordinate: Coordinate) -> Self {
        point!(x: coordinate.longitude, y: coordinate.latitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Axis-aligned region in which the service is supported.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaBoundary {
    rect: Rect<f64>,
}

impl AreaBoundary {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        AreaBoundary {
            rect: Rect::new(
                coord! { x: min_lon, y: min_lat },
                coord! { x: max_lon, y: max_lat },
            ),
        }
    }

    /// Gdynia, Gdańsk and Sopot.
    pub fn tri_city() -> Self {
        AreaBoundary::new(54.30, 54.60, 18.40, 18.85)
    }

    pub fn min_lat(&self) -> f64 {
        self.rect.min().y
    }

    pub fn max_lat(&self) -> f64 {
        self.rect.max().y
    }

    pub fn min_lon(&self) -> f64 {
        self.rect.min().x
    }

    pub fn max_lon(&self) -> f64 {
        self.rect.max().x
    }

    /// Inclusive on all four edges. `Rect`'s own `Contains` excludes the
    /// border, so the comparison is done on the corners directly.
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        let point: Point<f64> = coordinate.into();
        self.min_lat() <= point.y()
            && point.y() <= self.max_lat()
            && self.min_lon() <= point.x()
            && point.x() <= self.max_lon()
    }
}
