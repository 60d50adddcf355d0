//! Tripline Library - Animated Trip Trajectories as GPU Line Meshes
//!
//! This library turns time-stamped polylines (GPS traces, vehicle trips) into flat,
//! tightly packed vertex/index buffers and computes the per-frame uniforms a trail
//! shader needs to light up only the most recently "traveled" part of each line.
//!
//! # Architecture
//!
//! - **[`TripInput`]**: Discriminated union of single lines, multi-lines and nested collections
//! - **[`CompiledStyle`]**: First-match list of filters resolving one color per trip
//! - **[`GeometryBuilder`]**: Flattens trips into a [`VertexBufferSet`]
//! - **[`AnimationClock`]**: Looping current time plus trail uniforms
//! - **[`TripLayer`]**: Composition root owning trips, style, buffers and the [`TripRenderer`]
//!
//! The rendering engine and the host map are external collaborators, reached through
//! the [`RenderEngine`], [`Projector`] and [`Camera`] traits.
//!
//! # Usage Example
//!
//! ```rust
//! use tripline_lib::{Trip, TripInput, CompiledStyle, GeometryBuilder, WebMercatorProjector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let trip = Trip::new(
//!     vec![(0.0, 0.0), (0.001, 0.0), (0.002, 0.0)].into(),
//!     vec![0.0, 10.0, 20.0],
//!     Default::default(),
//! )?;
//! let style = CompiledStyle::default();
//! let projector = WebMercatorProjector::new(12.0);
//!
//! let buffers = GeometryBuilder::new(&projector, &style).build(&TripInput::Line(trip));
//! assert_eq!(buffers.vertex_count(), 3);
//! assert_eq!(buffers.segment_count(), 2);
//! # Ok(())
//! # }
//! ```

mod clock;
mod color;
mod geometry;
mod layer;
mod projection;
mod render;
mod style;
mod trip;
pub mod utils;

// Public API exports
pub use clock::{AnimationClock, ClockConfig, FrameUniforms, TrailUniforms};
pub use color::{LineColor, Rgba};
pub use geometry::{GeometryBuilder, IndexBuffer, IndexWidth, VertexBufferSet};
pub use layer::{Interaction, LayerError, LayerOptions, LayerState, TripLayer};
pub use projection::{Camera, Mat4, Projector, WebMercatorProjector};
pub use render::{GpuMesh, Primitive, RenderEngine, TRAIL_SHADER_WGSL, TripRenderer};
pub use style::{CompiledStyle, Filter, FilterFeature, Predicate, StyleRule, Symbol};
pub use trip::{GeometryKind, MultiTrip, Properties, Trip, TripInput};

/// Error types for trip data
#[derive(Debug, thiserror::Error)]
pub enum TripError {
    #[error("Trip line {line} has {coordinates} coordinates but only {times} timestamps")]
    TimestampsTooShort {
        line: usize,
        coordinates: usize,
        times: usize,
    },

    #[error("Missing or non-numeric time property '{property}'")]
    MissingTimes { property: String },

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// Error types for style compilation
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("Invalid color specification '{0}'")]
    InvalidColor(String),

    #[error("Line opacity {0} is not a finite number")]
    InvalidOpacity(f64),
}

pub type Result<T> = std::result::Result<T, TripError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn() -> CompiledStyle = CompiledStyle::default;
        let _: fn() -> LayerOptions = LayerOptions::default;
        let _: fn(ClockConfig) -> AnimationClock = AnimationClock::new;
    }
}
