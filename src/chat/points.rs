//! Map point shaping
//!
//! Bot replies carry loosely shaped points: a `geometry` object plus arbitrary
//! properties. Coordinates arrive in either order; a negative first component
//! is taken to be a western longitude and kept, anything else is read as
//! `[lat, lon]` and swapped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Padding applied around the bounding box when fitting the map
pub const DEFAULT_BOUNDS_BUFFER: f64 = 0.003;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

/// Padded `[[min_lon, min_lat], [max_lon, max_lat]]`
pub type Bounds = [[f64; 2]; 2];

impl Feature {
    /// Shape one point; `None` when it has no usable coordinates
    pub fn from_point(point: &Value) -> Option<Self> {
        let point = point.as_object()?;
        let geometry = point.get("geometry")?.as_object()?;

        let kind = geometry
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or("Point")
            .to_string();

        let coords = geometry.get("coordinates")?.as_array()?;
        let [a, b] = coords.as_slice() else {
            return None;
        };
        let (a, b) = (a.as_f64()?, b.as_f64()?);
        let coordinates = if a < 0.0 { [a, b] } else { [b, a] };

        // Zero or NaN components mark a point that was never geocoded
        if coordinates.iter().any(|c| *c == 0.0 || c.is_nan()) {
            return None;
        }

        let properties = point
            .iter()
            .filter(|(key, _)| key.as_str() != "geometry")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Some(Self {
            kind: "Feature".to_string(),
            geometry: Geometry { kind, coordinates },
            properties,
        })
    }
}

impl FeatureCollection {
    /// Shape every usable point, dropping the rest
    pub fn from_points(points: &[Value]) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features: points.iter().filter_map(Feature::from_point).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box of all features padded by `buffer`, `None` when empty
    pub fn bounds(&self, buffer: f64) -> Option<Bounds> {
        let mut coords = self.features.iter().map(|f| f.geometry.coordinates);
        let first = coords.next()?;
        let (min, max) = coords.fold((first, first), |(min, max), [x, y]| {
            ([min[0].min(x), min[1].min(y)], [max[0].max(x), max[1].max(y)])
        });

        Some([
            [min[0] - buffer, min[1] - buffer],
            [max[0] + buffer, max[1] + buffer],
        ])
    }
}
