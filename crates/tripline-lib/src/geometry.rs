//! Geometry builder: trips to flat GPU buffers
//!
//! Every flattened line contributes its vertices in order, with one
//! `(previous, current)` index pair per consecutive coordinate pair. Lines are
//! never joined to each other.

use crate::color::Rgba;
use crate::projection::Projector;
use crate::style::{CompiledStyle, FilterFeature};
use crate::trip::TripInput;

/// Integer width of the index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    /// Narrowest width whose range contains `value`
    pub fn for_value(value: usize) -> Self {
        if value < 1 << 8 {
            Self::U8
        } else if value < 1 << 16 {
            Self::U16
        } else {
            Self::U32
        }
    }

    /// Width for a mesh with `vertex_count` vertices and `index_count` indices
    ///
    /// Covers both the largest index value and the index count, so every vertex
    /// stays addressable however the indices are distributed across lines.
    pub fn select(vertex_count: usize, index_count: usize) -> Self {
        Self::for_value(vertex_count.saturating_sub(1).max(index_count))
    }

    /// Bytes per index
    pub fn size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Line-segment indices stored at their selected width
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Default for IndexBuffer {
    fn default() -> Self {
        Self::U8(Vec::new())
    }
}

impl IndexBuffer {
    /// Narrow `indices` to `width`; callers guarantee every value fits
    fn narrow(indices: Vec<u32>, width: IndexWidth) -> Self {
        match width {
            IndexWidth::U8 => Self::U8(indices.into_iter().map(|i| i as u8).collect()),
            IndexWidth::U16 => Self::U16(indices.into_iter().map(|i| i as u16).collect()),
            IndexWidth::U32 => Self::U32(indices),
        }
    }

    pub fn width(&self) -> IndexWidth {
        match self {
            Self::U8(_) => IndexWidth::U8,
            Self::U16(_) => IndexWidth::U16,
            Self::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        match self {
            Self::U8(v) => v.get(index).map(|&i| i.into()),
            Self::U16(v) => v.get(index).map(|&i| i.into()),
            Self::U32(v) => v.get(index).copied(),
        }
    }

    /// Indices widened to `u32`
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// `(start, end)` vertex pairs, one per segment
    pub fn segments(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.len() / 2).filter_map(|s| Some((self.get(2 * s)?, self.get(2 * s + 1)?)))
    }

    /// Raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U8(v) => v.as_slice(),
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Four index-aligned buffers describing one drawable mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBufferSet {
    /// Projected X, Y per vertex
    positions: Vec<f32>,
    /// RGBA per vertex
    colors: Vec<u8>,
    /// Trip timestamp per vertex
    times: Vec<u16>,
    indices: IndexBuffer,
    /// Number of lines that contributed at least one vertex
    line_count: usize,
}

impl VertexBufferSet {
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    #[inline]
    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    #[inline]
    pub fn times(&self) -> &[u16] {
        &self.times
    }

    #[inline]
    pub fn indices(&self) -> &IndexBuffer {
        &self.indices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.indices.len() / 2
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Color of vertex `index`
    pub fn color(&self, index: usize) -> Option<Rgba> {
        let chunk = self.colors.get(4 * index..4 * index + 4)?;
        chunk.try_into().ok()
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn time_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.times)
    }
}

/// Converts a trip timestamp into the 16-bit vertex attribute
///
/// Truncates fractions and wraps modulo 65536, so a long trace keeps animating
/// instead of pinning at the top of the range. Non-finite values map to 0.
#[inline]
fn time_attribute(time: f64) -> u16 {
    if !time.is_finite() {
        return 0;
    }
    (time.trunc() as i64).rem_euclid(1 << 16) as u16
}

/// Flattens trips into a [`VertexBufferSet`] against one projector snapshot
pub struct GeometryBuilder<'a, P: Projector + ?Sized> {
    projector: &'a P,
    style: &'a CompiledStyle,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a, P: Projector + ?Sized> GeometryBuilder<'a, P> {
    pub fn new(projector: &'a P, style: &'a CompiledStyle) -> Self {
        Self { projector, style }
    }

    /// Build the buffers for `trips`
    ///
    /// The zoom level is sampled once, so one build never mixes projections.
    pub fn build(&self, trips: &TripInput) -> VertexBufferSet {
        #[cfg(feature = "profiling")]
        profiling::scope!("geometry::build");

        let zoom = self.projector.current_zoom();
        let capacity = trips.vertex_count();

        let mut positions = Vec::with_capacity(2 * capacity);
        let mut colors = Vec::with_capacity(4 * capacity);
        let mut times = Vec::with_capacity(capacity);
        let mut indices: Vec<u32> = Vec::with_capacity(2 * capacity);
        let mut line_count = 0;

        trips.for_each_line(&mut |line| {
            if line.coords.is_empty() {
                return;
            }
            line_count += 1;
            let color = self
                .style
                .resolve_color(&FilterFeature::new(line.kind, line.properties));

            // Trip constructors guarantee a timestamp for every coordinate
            for (i, (coord, time)) in line.coords.iter().zip(line.times).enumerate() {
                let projected = self.projector.project(*coord, zoom);
                let vertex = times.len() as u32;
                if i > 0 {
                    indices.push(vertex - 1);
                    indices.push(vertex);
                }
                positions.push(projected.x as f32);
                positions.push(projected.y as f32);
                colors.extend_from_slice(&color);
                times.push(time_attribute(*time));
            }
        });

        let width = IndexWidth::select(times.len(), indices.len());
        tracing::debug!(
            "Built trip geometry: {} lines, {} vertices, {} segments, {:?} indices",
            line_count,
            times.len(),
            indices.len() / 2,
            width
        );

        VertexBufferSet {
            positions,
            colors,
            times,
            indices: IndexBuffer::narrow(indices, width),
            line_count,
        }
    }
}
