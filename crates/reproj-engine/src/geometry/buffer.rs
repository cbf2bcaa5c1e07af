use crate::coords::Point;
use crate::device::{BufferDesc, BufferUsage, DrawIndirectArgs, DrawRanges, MeshDevice};

use super::GeometryError;

/// Points reserved on first use when nothing was pre-allocated.
pub const DEFAULT_INITIAL_POINTS: usize = 50_000;

/// How consecutive points are assembled into primitives.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topology {
    TriangleStrip,
    LineStrip,
    Lines,
    Points,
}

impl Topology {
    /// Disconnected topologies ignore segment boundaries.
    #[inline]
    pub fn is_disconnected(self) -> bool {
        matches!(self, Topology::Lines | Topology::Points)
    }
}

/// What the stored coordinates are.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CoordRole {
    /// Vertex positions; segment starts are recorded for drawing.
    Vertex,
    /// Texture coordinates; draw ranges come from the paired vertex buffer.
    TexCoord,
}

impl CoordRole {
    #[inline]
    fn manage_indices(self) -> bool {
        matches!(self, CoordRole::Vertex)
    }
}

/// Externally visible buffer state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GeometryState {
    Mutable,
    /// Compiled for one draw call per segment.
    Compiled,
    /// Compiled with an indirect table for a single multi-draw call.
    CompiledMultiDraw,
    Invalid,
}

#[derive(Debug)]
enum Ranges<B> {
    /// Texture coordinates: no ranges of their own.
    Unmanaged,
    /// Segment starts followed by the point count.
    Sentinel(Vec<u32>),
    MultiDraw {
        indirect: B,
        starts: Vec<u32>,
        lengths: Vec<u32>,
    },
}

#[derive(Debug)]
enum Storage<B> {
    Mutable { coords: Vec<f32>, starts: Vec<u32> },
    Compiled {
        buffer: B,
        point_count: u32,
        ranges: Ranges<B>,
    },
    Invalid,
}

impl<B> Storage<B> {
    fn empty() -> Self {
        Storage::Mutable {
            coords: Vec::new(),
            starts: Vec::new(),
        }
    }
}

/// Growable coordinate store with a one-way compile to device form.
#[derive(Debug)]
pub struct GeometryBuffer<B> {
    label: &'static str,
    topology: Topology,
    role: CoordRole,
    dims: usize,
    storage: Storage<B>,
}

impl<B> GeometryBuffer<B> {
    /// `dims` is 2 or 3 floats per point.
    pub fn new(label: &'static str, topology: Topology, role: CoordRole, dims: usize) -> Self {
        debug_assert!(dims == 2 || dims == 3, "unsupported point dimension {dims}");
        Self {
            label,
            topology,
            role,
            dims,
            storage: Storage::empty(),
        }
    }

    /// 2-D triangle-strip vertex positions.
    pub fn vertices(label: &'static str) -> Self {
        Self::new(label, Topology::TriangleStrip, CoordRole::Vertex, 2)
    }

    /// 2-D texture coordinates for a triangle-strip vertex buffer.
    pub fn tex_coords(label: &'static str) -> Self {
        Self::new(label, Topology::TriangleStrip, CoordRole::TexCoord, 2)
    }

    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn role(&self) -> CoordRole {
        self.role
    }

    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn state(&self) -> GeometryState {
        match &self.storage {
            Storage::Mutable { .. } => GeometryState::Mutable,
            Storage::Compiled {
                ranges: Ranges::MultiDraw { .. },
                ..
            } => GeometryState::CompiledMultiDraw,
            Storage::Compiled { .. } => GeometryState::Compiled,
            Storage::Invalid => GeometryState::Invalid,
        }
    }

    #[inline]
    pub fn is_mutable(&self) -> bool {
        matches!(self.storage, Storage::Mutable { .. })
    }

    /// False when disposed, or still mutable with nothing recorded.
    pub fn is_drawable(&self) -> bool {
        match &self.storage {
            Storage::Invalid => false,
            Storage::Mutable { coords, starts } => {
                if self.role.manage_indices() {
                    !starts.is_empty()
                } else {
                    !coords.is_empty()
                }
            }
            Storage::Compiled { .. } => true,
        }
    }

    /// Pre-sizes storage for `points` points. No-op once storage exists.
    pub fn allocate(&mut self, points: usize) {
        if let Storage::Mutable { coords, .. } = &mut self.storage {
            if coords.capacity() == 0 {
                coords.reserve_exact(points * self.dims);
            }
        }
    }

    /// Appends one segment of 2-D points. Empty segments are ignored.
    ///
    /// 3-D buffers store `z = 0`.
    pub fn add_segment(&mut self, points: &[Point]) -> Result<(), GeometryError> {
        let dims = self.dims;
        self.append(points.len(), |coords| {
            for p in points {
                let [x, y] = p.to_f32();
                coords.push(x);
                coords.push(y);
                if dims == 3 {
                    coords.push(0.0);
                }
            }
        })
    }

    /// Appends one segment of raw coordinates, `dims` floats per point.
    pub fn add_raw_segment(&mut self, coords: &[f32]) -> Result<(), GeometryError> {
        if coords.len() % self.dims != 0 {
            return Err(GeometryError::Misaligned {
                label: self.label,
                len: coords.len(),
                dims: self.dims,
            });
        }
        self.append(coords.len() / self.dims, |dst| dst.extend_from_slice(coords))
    }

    fn append(
        &mut self,
        count: usize,
        write: impl FnOnce(&mut Vec<f32>),
    ) -> Result<(), GeometryError> {
        let label = self.label;
        let dims = self.dims;
        let record_start = self.role.manage_indices();
        let disconnected = self.topology.is_disconnected();

        let (coords, starts) = match &mut self.storage {
            Storage::Mutable { coords, starts } => (coords, starts),
            Storage::Compiled { .. } => return Err(GeometryError::AlreadyCompiled { label }),
            Storage::Invalid => return Err(GeometryError::Disposed { label }),
        };
        if count == 0 {
            return Ok(());
        }

        let start = coords.len() / dims;
        if start + count > u32::MAX as usize {
            return Err(GeometryError::TooManyPoints { label });
        }
        if coords.capacity() == 0 {
            coords.reserve_exact(DEFAULT_INITIAL_POINTS.max(count) * dims);
        }
        write(coords);

        if record_start && !(disconnected && !starts.is_empty()) {
            starts.push(start as u32);
        }
        Ok(())
    }

    /// Points stored (mutable) or uploaded (compiled).
    pub fn point_count(&self) -> usize {
        match &self.storage {
            Storage::Mutable { coords, .. } => coords.len() / self.dims,
            Storage::Compiled { point_count, .. } => *point_count as usize,
            Storage::Invalid => 0,
        }
    }

    pub fn segment_count(&self) -> usize {
        match &self.storage {
            Storage::Mutable { starts, .. } => starts.len(),
            Storage::Compiled { ranges, .. } => match ranges {
                Ranges::Unmanaged => 0,
                Ranges::Sentinel(starts) => starts.len().saturating_sub(1),
                Ranges::MultiDraw { starts, .. } => starts.len(),
            },
            Storage::Invalid => 0,
        }
    }

    /// CPU copy of every recorded segment (x/y only). Empty once compiled.
    ///
    /// Texture-coordinate buffers come back as one run.
    pub fn segments(&self) -> Vec<Vec<Point>> {
        let Storage::Mutable { coords, starts } = &self.storage else {
            return Vec::new();
        };
        let total = coords.len() / self.dims;
        let point = |i: usize| {
            let o = i * self.dims;
            Point::new(f64::from(coords[o]), f64::from(coords[o + 1]))
        };

        if !self.role.manage_indices() {
            return if total == 0 {
                Vec::new()
            } else {
                vec![(0..total).map(point).collect()]
            };
        }

        starts
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let end = starts.get(i + 1).map_or(total, |&e| e as usize);
                (s as usize..end).map(point).collect()
            })
            .collect()
    }

    /// Uploads the stored points and discards the CPU copy.
    ///
    /// On a multi-draw capable device a per-segment indirect table is uploaded
    /// as well; otherwise a sentinel closes the last segment. A failed upload
    /// leaves the buffer invalid.
    pub fn compile<D>(&mut self, device: &D) -> Result<(), GeometryError>
    where
        D: MeshDevice<Buffer = B>,
    {
        let label = self.label;
        let (mut coords, mut starts) = match std::mem::replace(&mut self.storage, Storage::Invalid)
        {
            Storage::Mutable { coords, starts } => (coords, starts),
            compiled @ Storage::Compiled { .. } => {
                self.storage = compiled;
                return Err(GeometryError::AlreadyCompiled { label });
            }
            Storage::Invalid => return Err(GeometryError::Disposed { label }),
        };

        coords.shrink_to_fit();
        let point_count = (coords.len() / self.dims) as u32;

        let buffer = device.create_buffer(&BufferDesc {
            label,
            usage: BufferUsage::Vertex,
            contents: bytemuck::cast_slice(&coords),
        })?;
        drop(coords);

        let ranges = if !self.role.manage_indices() {
            Ranges::Unmanaged
        } else if device.capabilities().multi_draw {
            let lengths: Vec<u32> = starts
                .iter()
                .enumerate()
                .map(|(i, &s)| starts.get(i + 1).copied().unwrap_or(point_count) - s)
                .collect();
            let args: Vec<DrawIndirectArgs> = starts
                .iter()
                .zip(&lengths)
                .map(|(&first_vertex, &vertex_count)| DrawIndirectArgs {
                    vertex_count,
                    instance_count: 1,
                    first_vertex,
                    first_instance: 0,
                })
                .collect();
            let indirect = device.create_buffer(&BufferDesc {
                label,
                usage: BufferUsage::Indirect,
                contents: bytemuck::cast_slice(&args),
            })?;
            Ranges::MultiDraw {
                indirect,
                starts,
                lengths,
            }
        } else {
            starts.push(point_count);
            Ranges::Sentinel(starts)
        };

        self.storage = Storage::Compiled {
            buffer,
            point_count,
            ranges,
        };
        Ok(())
    }

    /// Device buffer, once compiled.
    pub fn device_buffer(&self) -> Option<&B> {
        match &self.storage {
            Storage::Compiled { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    /// Draw ranges of a compiled vertex buffer.
    pub fn draw_ranges(&self) -> Option<DrawRanges<'_, B>> {
        match &self.storage {
            Storage::Compiled { ranges, .. } => match ranges {
                Ranges::Unmanaged => None,
                Ranges::Sentinel(starts) => Some(DrawRanges::Segments(starts)),
                Ranges::MultiDraw {
                    indirect,
                    starts,
                    lengths,
                } => Some(DrawRanges::MultiDraw {
                    indirect,
                    starts,
                    lengths,
                }),
            },
            _ => None,
        }
    }

    /// Releases device storage and CPU data. Idempotent.
    pub fn dispose(&mut self) {
        if !matches!(self.storage, Storage::Invalid) {
            log::trace!("geometry '{}' disposed", self.label);
        }
        self.storage = Storage::Invalid;
    }

    /// Disposes and returns to an empty mutable buffer.
    pub fn reset(&mut self) {
        self.dispose();
        self.storage = Storage::empty();
    }
}
