//! CPU rendering engine that evaluates the trail window instead of rasterizing

use tripline_lib::{FrameUniforms, Primitive, RenderEngine, VertexBufferSet};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Uploaded copy of the attributes the trail test needs
#[derive(Debug)]
pub struct HeadlessMesh {
    id: u64,
    times: Vec<u16>,
    segments: Vec<(u32, u32)>,
    bytes: usize,
}

/// Summary of one rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub current_time: f64,
    pub lit_segments: usize,
    pub total_segments: usize,
}

#[derive(Debug, Default)]
pub struct HeadlessEngine {
    next_id: u64,
    live_meshes: usize,
    uploaded_bytes: usize,
    last_frame: Option<FrameStats>,
    frames: usize,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn live_meshes(&self) -> usize {
        self.live_meshes
    }

    #[inline]
    pub fn uploaded_bytes(&self) -> usize {
        self.uploaded_bytes
    }

    #[inline]
    pub fn last_frame(&self) -> Option<FrameStats> {
        self.last_frame
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl RenderEngine for HeadlessEngine {
    type Mesh = HeadlessMesh;
    type Error = EngineError;

    fn create_mesh(
        &mut self,
        buffers: &VertexBufferSet,
        primitive: Primitive,
    ) -> Result<HeadlessMesh, EngineError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("headless::create_mesh");

        let Primitive::Lines = primitive;
        let vertex_count = buffers.vertex_count();
        let segments = buffers.indices().segments().collect::<Vec<_>>();
        if let Some(index) = segments
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .find(|&i| i as usize >= vertex_count)
        {
            return Err(EngineError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        let bytes = buffers.position_bytes().len()
            + buffers.colors().len()
            + buffers.time_bytes().len()
            + buffers.indices().as_bytes().len();
        self.uploaded_bytes += bytes;
        self.live_meshes += 1;
        self.next_id += 1;
        tracing::debug!(
            "Uploaded mesh #{}: {} vertices, {} segments, {} bytes ({:?} indices)",
            self.next_id,
            vertex_count,
            segments.len(),
            bytes,
            buffers.indices().width()
        );

        Ok(HeadlessMesh {
            id: self.next_id,
            times: buffers.times().to_vec(),
            segments,
            bytes,
        })
    }

    fn render(&mut self, mesh: &HeadlessMesh, uniforms: &FrameUniforms) -> Result<(), EngineError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("headless::render");

        let gpu_uniforms = uniforms.to_gpu();
        self.uploaded_bytes += bytemuck::bytes_of(&gpu_uniforms).len();

        // A segment is lit when either end vertex is inside the trail
        let lit_segments = mesh
            .segments
            .iter()
            .filter(|&&(a, b)| {
                [a, b]
                    .iter()
                    .filter_map(|&i| mesh.times.get(i as usize))
                    .any(|&time| uniforms.in_trail(time))
            })
            .count();

        self.frames += 1;
        self.last_frame = Some(FrameStats {
            current_time: uniforms.current_time,
            lit_segments,
            total_segments: mesh.segments.len(),
        });
        tracing::trace!(
            "Rendered mesh #{}: {}/{} segments lit",
            mesh.id,
            lit_segments,
            mesh.segments.len()
        );
        Ok(())
    }

    fn dispose_mesh(&mut self, mesh: HeadlessMesh) {
        tracing::debug!("Disposed mesh #{} ({} bytes)", mesh.id, mesh.bytes);
        self.live_meshes = self.live_meshes.saturating_sub(1);
    }

    fn clear(&mut self) {
        self.last_frame = None;
    }
}
