//! Synthetic taxi-like trips around a city centre

use tripline_lib::{Properties, Trip, TripInput, TripError};

/// Generate `num_trips` trips of `points_per_trip` points, one timestamp per step
///
/// Trips start at staggered times so the trail sweeps the map over a loop.
pub fn generate_trips(
    num_trips: usize,
    points_per_trip: usize,
    center: (f64, f64),
) -> Result<TripInput, TripError> {
    let trips = (0..num_trips)
        .map(|i| generate_trip(i, points_per_trip, center))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(trips.into_iter().collect())
}

fn generate_trip(index: usize, num_points: usize, center: (f64, f64)) -> Result<Trip, TripError> {
    let heading = index as f64 * 2.399_963; // golden angle
    let (dx, dy) = (heading.cos(), heading.sin());
    let start_time = (index * 7 % 600) as f64;

    let coords: Vec<(f64, f64)> = (0..num_points)
        .map(|step| {
            let t = step as f64 / num_points.max(1) as f64;
            let wiggle = (t * 25.0 + index as f64).sin() * 0.0005;
            let lon = center.0 + dx * t * 0.05 - dy * wiggle;
            let lat = center.1 + dy * t * 0.05 + dx * wiggle;
            (lon, lat)
        })
        .collect();
    let times = (0..num_points).map(|step| start_time + step as f64).collect();

    let mut properties = Properties::new();
    properties.insert("vendor".into(), (index % 2).into());
    properties.insert("trip_id".into(), index.into());
    Trip::new(coords.into(), times, properties)
}
