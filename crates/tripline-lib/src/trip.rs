//! Trip storage and input shapes
//!
//! A trip is one trajectory: coordinates, a parallel timestamp series and an
//! attribute bag used for style matching. Callers hand the layer a [`TripInput`],
//! which nests single lines, multi-lines and collections of either.

use crate::{Result, TripError};
use geo::{Coord, LineString, MultiLineString};
use geojson::{Feature, GeoJson};

/// Arbitrary key/value attributes attached to a trip
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Geometry type exposed to style filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeometryKind {
    LineString,
    MultiLineString,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
        }
    }
}

/// A single time-stamped line
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    line: LineString<f64>,
    times: Vec<f64>,
    properties: Properties,
}

impl Trip {
    /// Create a trip, rejecting a timestamp series shorter than the line
    ///
    /// Extra trailing timestamps are kept but never read.
    pub fn new(line: LineString<f64>, times: Vec<f64>, properties: Properties) -> Result<Self> {
        check_times(0, line.0.len(), times.len())?;
        Ok(Self {
            line,
            times,
            properties,
        })
    }

    #[inline]
    pub fn line(&self) -> &LineString<f64> {
        &self.line
    }

    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[inline]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Number of coordinates
    #[inline]
    pub fn len(&self) -> usize {
        self.line.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.line.0.is_empty()
    }
}

/// A trip made of several sub-lines sharing one timestamp series
///
/// The series is applied positionally to every sub-line: the `i`-th coordinate of
/// each sub-line gets `times[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTrip {
    lines: MultiLineString<f64>,
    times: Vec<f64>,
    properties: Properties,
}

impl MultiTrip {
    pub fn new(
        lines: MultiLineString<f64>,
        times: Vec<f64>,
        properties: Properties,
    ) -> Result<Self> {
        for (index, line) in lines.0.iter().enumerate() {
            check_times(index, line.0.len(), times.len())?;
        }
        Ok(Self {
            lines,
            times,
            properties,
        })
    }

    #[inline]
    pub fn lines(&self) -> &MultiLineString<f64> {
        &self.lines
    }

    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[inline]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

fn check_times(line: usize, coordinates: usize, times: usize) -> Result<()> {
    if times < coordinates {
        return Err(TripError::TimestampsTooShort {
            line,
            coordinates,
            times,
        });
    }
    Ok(())
}

/// Borrowed view of one flattened line, as seen by the geometry builder
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineRef<'a> {
    pub coords: &'a [Coord<f64>],
    pub times: &'a [f64],
    pub properties: &'a Properties,
    pub kind: GeometryKind,
}

/// Every accepted shape of trip input
#[derive(Debug, Clone, PartialEq)]
pub enum TripInput {
    Line(Trip),
    MultiLine(MultiTrip),
    Collection(Vec<TripInput>),
}

impl Default for TripInput {
    fn default() -> Self {
        Self::Collection(Vec::new())
    }
}

impl TripInput {
    /// Visit every flattened line in input order
    ///
    /// Collections are walked element by element, multi-lines contribute each
    /// sub-line independently.
    pub(crate) fn for_each_line<'a, F: FnMut(LineRef<'a>)>(&'a self, f: &mut F) {
        match self {
            Self::Line(trip) => f(LineRef {
                coords: &trip.line.0,
                times: &trip.times,
                properties: &trip.properties,
                kind: GeometryKind::LineString,
            }),
            Self::MultiLine(multi) => {
                for line in &multi.lines.0 {
                    f(LineRef {
                        coords: &line.0,
                        times: &multi.times,
                        properties: &multi.properties,
                        kind: GeometryKind::MultiLineString,
                    });
                }
            }
            Self::Collection(items) => {
                for item in items {
                    item.for_each_line(f);
                }
            }
        }
    }

    /// Number of flattened lines, counting each multi-line sub-line once
    pub fn line_count(&self) -> usize {
        let mut count = 0;
        self.for_each_line(&mut |_| count += 1);
        count
    }

    /// Total number of coordinates across all lines
    pub fn vertex_count(&self) -> usize {
        let mut count = 0;
        self.for_each_line(&mut |line| count += line.coords.len());
        count
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Convert a GeoJSON document into trip input
    ///
    /// The timestamp series of each feature is read from the `time_property`
    /// attribute, which must be an array of numbers.
    pub fn from_geojson(geojson: &GeoJson, time_property: &str) -> Result<Self> {
        match geojson {
            GeoJson::FeatureCollection(collection) => collection
                .features
                .iter()
                .map(|feature| Self::from_feature(feature, time_property))
                .collect::<Result<Vec<_>>>()
                .map(Self::Collection),
            GeoJson::Feature(feature) => Self::from_feature(feature, time_property),
            GeoJson::Geometry(_) => Err(TripError::MissingTimes {
                property: time_property.to_string(),
            }),
        }
    }

    fn from_feature(feature: &Feature, time_property: &str) -> Result<Self> {
        let Some(geometry) = &feature.geometry else {
            return Err(TripError::UnsupportedGeometry(
                "feature without geometry".to_string(),
            ));
        };
        let properties = feature.properties.clone().unwrap_or_default();

        match &geometry.value {
            geojson::Value::LineString(positions) => {
                let times = read_times(&properties, time_property)?;
                Ok(Self::Line(Trip::new(
                    to_line_string(positions)?,
                    times,
                    properties,
                )?))
            }
            geojson::Value::MultiLineString(lines) => {
                let times = read_times(&properties, time_property)?;
                let lines = lines
                    .iter()
                    .map(|positions| to_line_string(positions))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::MultiLine(MultiTrip::new(
                    MultiLineString::new(lines),
                    times,
                    properties,
                )?))
            }
            other => Err(TripError::UnsupportedGeometry(
                geometry_name(other).to_string(),
            )),
        }
    }
}

impl From<Trip> for TripInput {
    fn from(trip: Trip) -> Self {
        Self::Line(trip)
    }
}

impl From<MultiTrip> for TripInput {
    fn from(multi: MultiTrip) -> Self {
        Self::MultiLine(multi)
    }
}

impl From<Vec<TripInput>> for TripInput {
    fn from(items: Vec<TripInput>) -> Self {
        Self::Collection(items)
    }
}

impl FromIterator<Trip> for TripInput {
    fn from_iter<I: IntoIterator<Item = Trip>>(iter: I) -> Self {
        Self::Collection(iter.into_iter().map(Self::Line).collect())
    }
}

fn read_times(properties: &Properties, time_property: &str) -> Result<Vec<f64>> {
    properties
        .get(time_property)
        .and_then(serde_json::Value::as_array)
        .and_then(|values| values.iter().map(serde_json::Value::as_f64).collect())
        .ok_or_else(|| TripError::MissingTimes {
            property: time_property.to_string(),
        })
}

fn to_line_string(positions: &[Vec<f64>]) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(TripError::InvalidCoordinate(format!("{position:?}"))),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn geometry_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}
