//! Rendering-engine collaborator and the GPU mesh lifecycle
//!
//! The engine itself (shader compilation, draw submission, device management) lives
//! outside this crate. [`TripRenderer`] owns one engine, at most one mesh built from
//! the current buffers, and the animation clock.

use crate::clock::{AnimationClock, ClockConfig, FrameUniforms};
use crate::geometry::VertexBufferSet;
use crate::projection::Camera;

/// WGSL source of the trail shader, matching [`crate::clock::TrailUniforms`]
pub const TRAIL_SHADER_WGSL: &str = include_str!("../shaders/trail.wgsl");

/// Primitive topology of a trip mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Disconnected segments, two indices each
    Lines,
}

/// External rendering engine
///
/// Errors are reported unchanged to the caller; nothing here retries or recovers.
pub trait RenderEngine {
    type Mesh;
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_mesh(
        &mut self,
        buffers: &VertexBufferSet,
        primitive: Primitive,
    ) -> Result<Self::Mesh, Self::Error>;

    fn render(&mut self, mesh: &Self::Mesh, uniforms: &FrameUniforms) -> Result<(), Self::Error>;

    fn dispose_mesh(&mut self, mesh: Self::Mesh);

    /// Clear the target before a frame
    fn clear(&mut self) {}
}

/// An engine mesh plus the counts it was built from
#[derive(Debug)]
pub struct GpuMesh<M> {
    mesh: M,
    vertex_count: usize,
    segment_count: usize,
}

impl<M> GpuMesh<M> {
    #[inline]
    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }
}

/// Owns the engine, the current mesh and the clock
///
/// The mesh is disposed before every rebuild, on removal and on drop.
pub struct TripRenderer<E: RenderEngine> {
    engine: E,
    mesh: Option<GpuMesh<E::Mesh>>,
    clock: AnimationClock,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<E: RenderEngine> TripRenderer<E> {
    pub fn new(engine: E, config: ClockConfig) -> Self {
        Self {
            engine,
            mesh: None,
            clock: AnimationClock::new(config),
        }
    }

    /// Replace the mesh with one built from `buffers`
    ///
    /// Empty buffers leave the renderer without a mesh.
    pub fn create_mesh(&mut self, buffers: &VertexBufferSet) -> Result<(), E::Error> {
        self.dispose_mesh();
        if buffers.is_empty() {
            return Ok(());
        }
        let mesh = self.engine.create_mesh(buffers, Primitive::Lines)?;
        self.mesh = Some(GpuMesh {
            mesh,
            vertex_count: buffers.vertex_count(),
            segment_count: buffers.segment_count(),
        });
        Ok(())
    }

    /// Release the current mesh, if any
    pub fn dispose_mesh(&mut self) {
        if let Some(gpu_mesh) = self.mesh.take() {
            self.engine.dispose_mesh(gpu_mesh.mesh);
        }
    }

    /// Render one frame; returns `false` when there is nothing to draw
    pub fn draw<C: Camera + ?Sized>(&mut self, now: f64, camera: &C) -> Result<bool, E::Error> {
        #[cfg(feature = "profiling")]
        profiling::scope!("renderer::draw");

        let Some(gpu_mesh) = &self.mesh else {
            return Ok(false);
        };
        let uniforms = self.clock.tick(now, camera);
        self.engine.clear();
        self.engine.render(&gpu_mesh.mesh, &uniforms)?;
        Ok(true)
    }

    #[inline]
    pub fn mesh(&self) -> Option<&GpuMesh<E::Mesh>> {
        self.mesh.as_ref()
    }

    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[inline]
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    #[inline]
    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    #[inline]
    pub fn clock_mut(&mut self) -> &mut AnimationClock {
        &mut self.clock
    }
}

impl<E: RenderEngine> Drop for TripRenderer<E> {
    fn drop(&mut self) {
        self.dispose_mesh();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::projection::Mat4;
    use crate::trip::{Properties, Trip, TripInput};
    use crate::{CompiledStyle, GeometryBuilder, WebMercatorProjector};

    /// Engine that records calls instead of touching a GPU
    #[derive(Debug, Default)]
    pub(crate) struct RecordingEngine {
        pub created: usize,
        pub disposed: usize,
        pub frames: Vec<FrameUniforms>,
        pub fail_render: bool,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("device lost")]
    pub(crate) struct DeviceLost;

    impl RenderEngine for RecordingEngine {
        type Mesh = usize;
        type Error = DeviceLost;

        fn create_mesh(
            &mut self,
            buffers: &VertexBufferSet,
            _: Primitive,
        ) -> Result<usize, DeviceLost> {
            self.created += 1;
            Ok(buffers.vertex_count())
        }

        fn render(&mut self, _: &usize, uniforms: &FrameUniforms) -> Result<(), DeviceLost> {
            if self.fail_render {
                return Err(DeviceLost);
            }
            self.frames.push(*uniforms);
            Ok(())
        }

        fn dispose_mesh(&mut self, _: usize) {
            self.disposed += 1;
        }
    }

    pub(crate) struct FixedCamera;

    impl Camera for FixedCamera {
        fn view_projection_matrix(&self) -> Mat4 {
            [1.0; 16]
        }
    }

    fn buffers(points: usize) -> VertexBufferSet {
        let coords: Vec<(f64, f64)> = (0..points).map(|i| (i as f64 * 0.01, 0.0)).collect();
        let times = (0..points).map(|i| i as f64).collect();
        let trips: TripInput = Trip::new(coords.into(), times, Properties::new())
            .unwrap()
            .into();
        GeometryBuilder::new(&WebMercatorProjector::new(10.0), &CompiledStyle::default())
            .build(&trips)
    }

    #[test]
    fn test_mesh_replaced_on_rebuild() {
        let mut renderer = TripRenderer::new(RecordingEngine::default(), ClockConfig::default());
        renderer.create_mesh(&buffers(3)).unwrap();
        renderer.create_mesh(&buffers(4)).unwrap();

        assert_eq!(renderer.engine().created, 2);
        assert_eq!(renderer.engine().disposed, 1);
        assert_eq!(renderer.mesh().map(GpuMesh::vertex_count), Some(4));
        assert_eq!(renderer.mesh().map(GpuMesh::segment_count), Some(3));
    }

    #[test]
    fn test_empty_buffers_create_no_mesh() {
        let mut renderer = TripRenderer::new(RecordingEngine::default(), ClockConfig::default());
        renderer.create_mesh(&buffers(3)).unwrap();
        renderer.create_mesh(&VertexBufferSet::default()).unwrap();

        assert!(renderer.mesh().is_none());
        assert_eq!(renderer.engine().disposed, 1);
        assert!(!renderer.draw(0.0, &FixedCamera).unwrap());
        assert!(renderer.engine().frames.is_empty());
    }

    #[test]
    fn test_draw_forwards_uniforms() {
        let mut renderer = TripRenderer::new(
            RecordingEngine::default(),
            ClockConfig {
                trail_length: 7.0,
                ..Default::default()
            },
        );
        renderer.create_mesh(&buffers(2)).unwrap();
        assert!(renderer.draw(10.0, &FixedCamera).unwrap());
        assert!(renderer.draw(12.5, &FixedCamera).unwrap());

        let frames = &renderer.engine().frames;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].current_time, 0.0);
        assert!((frames[1].current_time - 2.5).abs() < 1e-9);
        assert_eq!(frames[1].trail_length, 7.0);
        assert_eq!(frames[1].view_projection_matrix, [1.0; 16]);
    }

    #[test]
    fn test_render_errors_propagate() {
        let mut renderer = TripRenderer::new(
            RecordingEngine {
                fail_render: true,
                ..Default::default()
            },
            ClockConfig::default(),
        );
        renderer.create_mesh(&buffers(2)).unwrap();
        assert!(renderer.draw(0.0, &FixedCamera).is_err());
    }

    #[test]
    fn test_shader_declares_uniforms() {
        for name in ["current_time", "trail_length", "opacity", "view_projection"] {
            assert!(TRAIL_SHADER_WGSL.contains(name), "missing {name}");
        }
    }
}
