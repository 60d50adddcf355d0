//! TripLayer - composition root for trips, style, buffers and rendering
//!
//! Lifecycle: `Uninitialized` (no buffers) → `Parsed` (buffers built, awaiting a
//! draw) → `Rendering` (drawn at least once since the last rebuild). Replacing
//! trips or style, or refreshing the projection, goes back to `Parsed`. `remove`
//! moves to `Disposed` from any state.

use crate::clock::ClockConfig;
use crate::geometry::{GeometryBuilder, VertexBufferSet};
use crate::projection::{Camera, Projector};
use crate::render::{RenderEngine, TripRenderer};
use crate::style::{CompiledStyle, StyleRule};
use crate::trip::TripInput;
use crate::{StyleError, TripError};
use geojson::GeoJson;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Layer configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct LayerOptions {
    /// Time-scale multiplier (default 1)
    pub speed: f64,
    /// Glow window length in timestamp units (default 5)
    pub trail_length: f64,
    /// Animation period in timestamp units (default 1800)
    pub loop_time: f64,
    /// Global opacity uniform (default 1)
    pub opacity: f64,
    /// Attribute holding each trip's timestamp series (default "time")
    pub time_property: String,
    pub force_render_on_zooming: bool,
    pub force_render_on_moving: bool,
    pub force_render_on_rotating: bool,
    /// Ordered style rules (default: one always-matching opaque green rule)
    pub style: Vec<StyleRule>,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            trail_length: 5.0,
            loop_time: 1800.0,
            opacity: 1.0,
            time_property: "time".to_string(),
            force_render_on_zooming: true,
            force_render_on_moving: true,
            force_render_on_rotating: true,
            style: vec![StyleRule::default()],
        }
    }
}

impl LayerOptions {
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            speed: self.speed,
            loop_time: self.loop_time,
            trail_length: self.trail_length,
            opacity: self.opacity,
        }
    }
}

/// Viewport interaction reported by the host map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    Zooming,
    Moving,
    Rotating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerState {
    Uninitialized,
    Parsed,
    Rendering,
    Disposed,
}

/// Error types for layer operations
#[derive(Debug, thiserror::Error)]
pub enum LayerError<E: std::error::Error + 'static> {
    #[error("Render engine error: {0}")]
    Render(#[source] E),

    #[error("Style error: {0}")]
    Style(#[from] StyleError),

    #[error("Trip error: {0}")]
    Trip(#[from] TripError),

    #[error("Layer has been disposed")]
    Disposed,
}

/// Animated trip layer
pub struct TripLayer<E: RenderEngine> {
    id: String,
    trips: TripInput,
    options: LayerOptions,
    style: CompiledStyle,
    buffers: Option<VertexBufferSet>,
    renderer: Option<TripRenderer<E>>,
    state: LayerState,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<E: RenderEngine> TripLayer<E> {
    /// Create a detached layer, compiling `options.style`
    pub fn new(
        id: impl Into<String>,
        trips: TripInput,
        options: LayerOptions,
    ) -> Result<Self, StyleError> {
        let style = CompiledStyle::compile(options.style.iter().cloned())?;
        Ok(Self {
            id: id.into(),
            trips,
            options,
            style,
            buffers: None,
            renderer: None,
            state: LayerState::Uninitialized,
        })
    }

    /// Create a detached layer from GeoJSON, reading times from `options.time_property`
    pub fn from_geojson(
        id: impl Into<String>,
        geojson: &GeoJson,
        options: LayerOptions,
    ) -> Result<Self, LayerError<E::Error>> {
        let trips = TripInput::from_geojson(geojson, &options.time_property)?;
        Ok(Self::new(id, trips, options)?)
    }

    /// Replace the style before the layer is attached
    pub fn with_style<I>(mut self, rules: I) -> Result<Self, StyleError>
    where
        I: IntoIterator<Item = StyleRule>,
    {
        self.style = CompiledStyle::compile(rules)?;
        self.options.style = self.style.rules().to_vec();
        Ok(self)
    }

    /// Attach to a map and rendering engine and build the first buffers
    pub fn add_to<P: Projector + ?Sized>(
        &mut self,
        projector: &P,
        engine: E,
    ) -> Result<(), LayerError<E::Error>> {
        self.ensure_alive()?;
        tracing::info!("Adding trip layer '{}'", self.id);
        self.renderer = Some(TripRenderer::new(engine, self.options.clock_config()));
        self.rebuild(projector)
    }

    /// Replace the trips, rebuilding when attached
    pub fn set_trips<P: Projector + ?Sized>(
        &mut self,
        trips: TripInput,
        projector: &P,
    ) -> Result<(), LayerError<E::Error>> {
        self.ensure_alive()?;
        self.trips = trips;
        self.rebuild(projector)
    }

    /// Replace the trips from GeoJSON, rebuilding when attached
    pub fn set_trips_geojson<P: Projector + ?Sized>(
        &mut self,
        geojson: &GeoJson,
        projector: &P,
    ) -> Result<(), LayerError<E::Error>> {
        self.ensure_alive()?;
        let trips = TripInput::from_geojson(geojson, &self.options.time_property)?;
        self.set_trips(trips, projector)
    }

    /// Replace the style, rebuilding when attached
    ///
    /// On a compile error the previous style stays in effect.
    pub fn set_style<I, P>(&mut self, rules: I, projector: &P) -> Result<(), LayerError<E::Error>>
    where
        I: IntoIterator<Item = StyleRule>,
        P: Projector + ?Sized,
    {
        self.ensure_alive()?;
        self.style = CompiledStyle::compile(rules)?;
        self.options.style = self.style.rules().to_vec();
        self.rebuild(projector)
    }

    /// Replace the options; animation parameters apply from the next frame
    ///
    /// A changed style is compiled first and rebuilds the buffers. On a compile
    /// error the previous options stay in effect.
    pub fn set_options<P: Projector + ?Sized>(
        &mut self,
        options: LayerOptions,
        projector: &P,
    ) -> Result<(), LayerError<E::Error>> {
        self.ensure_alive()?;
        let restyled = options.style != self.options.style;
        if restyled {
            self.style = CompiledStyle::compile(options.style.iter().cloned())?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.clock_mut().set_config(options.clock_config());
        }
        self.options = options;
        if restyled {
            self.rebuild(projector)?;
        }
        Ok(())
    }

    /// Rebuild after the projector's reference zoom changed
    pub fn refresh_projection<P: Projector + ?Sized>(
        &mut self,
        projector: &P,
    ) -> Result<(), LayerError<E::Error>> {
        self.ensure_alive()?;
        self.rebuild(projector)
    }

    /// Draw one frame at monotonic time `now` (seconds)
    ///
    /// Returns whether anything was drawn. Drawing a detached or disposed layer
    /// is a no-op.
    pub fn draw<C: Camera + ?Sized>(
        &mut self,
        now: f64,
        camera: &C,
    ) -> Result<bool, LayerError<E::Error>> {
        let Some(renderer) = &mut self.renderer else {
            if self.state == LayerState::Disposed {
                tracing::warn!("Ignoring draw on disposed trip layer '{}'", self.id);
            }
            return Ok(false);
        };
        let drawn = renderer.draw(now, camera).map_err(LayerError::Render)?;
        if drawn {
            self.state = LayerState::Rendering;
        }
        Ok(drawn)
    }

    /// Release the mesh and buffers; the layer cannot be reused
    ///
    /// Allowed from every state, including a layer that was never attached.
    pub fn remove(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose_mesh();
        }
        self.buffers = None;
        self.state = LayerState::Disposed;
        tracing::info!("Removed trip layer '{}'", self.id);
    }

    /// Whether the host should keep redrawing during `interaction`
    pub fn should_redraw_during(&self, interaction: Interaction) -> bool {
        match interaction {
            Interaction::Zooming => self.options.force_render_on_zooming,
            Interaction::Moving => self.options.force_render_on_moving,
            Interaction::Rotating => self.options.force_render_on_rotating,
        }
    }

    /// The trail animates continuously while there is something to draw
    pub fn needs_redraw(&self) -> bool {
        matches!(self.state, LayerState::Parsed | LayerState::Rendering)
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn trips(&self) -> &TripInput {
        &self.trips
    }

    #[inline]
    pub fn style(&self) -> &[StyleRule] {
        self.style.rules()
    }

    #[inline]
    pub fn compiled_style(&self) -> &CompiledStyle {
        &self.style
    }

    #[inline]
    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    #[inline]
    pub fn buffers(&self) -> Option<&VertexBufferSet> {
        self.buffers.as_ref()
    }

    #[inline]
    pub fn state(&self) -> LayerState {
        self.state
    }

    #[inline]
    pub fn renderer(&self) -> Option<&TripRenderer<E>> {
        self.renderer.as_ref()
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> Option<&mut TripRenderer<E>> {
        self.renderer.as_mut()
    }

    fn ensure_alive(&self) -> Result<(), LayerError<E::Error>> {
        if self.state == LayerState::Disposed {
            tracing::warn!("Trip layer '{}' has been disposed", self.id);
            return Err(LayerError::Disposed);
        }
        Ok(())
    }

    /// Discard and rebuild buffers and mesh; detached layers only keep their input
    fn rebuild<P: Projector + ?Sized>(
        &mut self,
        projector: &P,
    ) -> Result<(), LayerError<E::Error>> {
        let Some(renderer) = &mut self.renderer else {
            return Ok(());
        };
        renderer.dispose_mesh();
        let buffers = GeometryBuilder::new(projector, &self.style).build(&self.trips);
        tracing::debug!(
            "Rebuilt trip layer '{}': {} vertices, {} segments",
            self.id,
            buffers.vertex_count(),
            buffers.segment_count()
        );
        let created = renderer.create_mesh(&buffers);
        self.buffers = Some(buffers);
        self.state = LayerState::Parsed;
        created.map_err(LayerError::Render)
    }
}

impl<E: RenderEngine> Drop for TripLayer<E> {
    fn drop(&mut self) {
        if self.state != LayerState::Disposed {
            self.remove();
        }
    }
}
