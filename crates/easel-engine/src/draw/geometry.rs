use super::{Vertex2D, Vertex3D};

/// Frame-scoped vertex and index storage.
///
/// All three arrays are append-only between two `clear()` calls. Every push
/// returns the element offset of its first item, so two consecutive pushes to
/// the same array always produce adjacent ranges.
///
/// Indices are absolute: they address the whole 2D or 3D vertex array of the
/// command that owns them, so merging two draws never rewrites index data.
#[derive(Debug, Default, Clone)]
pub struct GeometryStore {
    vertices_2d: Vec<Vertex2D>,
    vertices_3d: Vec<Vertex3D>,
    indices: Vec<u32>,
}

impl GeometryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push_2d(&mut self, vertices: &[Vertex2D]) -> u32 {
        let offset = self.vertices_2d.len() as u32;
        self.vertices_2d.extend_from_slice(vertices);
        offset
    }

    #[inline]
    pub fn push_3d(&mut self, vertices: &[Vertex3D]) -> u32 {
        let offset = self.vertices_3d.len() as u32;
        self.vertices_3d.extend_from_slice(vertices);
        offset
    }

    #[inline]
    pub fn push_indices(&mut self, indices: &[u32]) -> u32 {
        let offset = self.indices.len() as u32;
        self.indices.extend_from_slice(indices);
        offset
    }

    #[inline]
    pub fn vertices_2d(&self) -> &[Vertex2D] {
        &self.vertices_2d
    }

    #[inline]
    pub fn vertices_3d(&self) -> &[Vertex3D] {
        &self.vertices_3d
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Returns `count` 2D vertices starting at `offset`, or `None` if the range is out of bounds.
    pub fn slice_2d(&self, offset: u32, count: u32) -> Option<&[Vertex2D]> {
        checked_slice(&self.vertices_2d, offset, count)
    }

    pub fn slice_3d(&self, offset: u32, count: u32) -> Option<&[Vertex3D]> {
        checked_slice(&self.vertices_3d, offset, count)
    }

    pub fn slice_indices(&self, offset: u32, count: u32) -> Option<&[u32]> {
        checked_slice(&self.indices, offset, count)
    }

    /// Appends `indices` shifted by `base`. Returns the offset of the first one.
    ///
    /// Used to turn indices local to a vertex batch into absolute indices.
    pub fn push_indices_offset(&mut self, indices: &[u32], base: u32) -> u32 {
        let offset = self.indices.len() as u32;
        self.indices.extend(indices.iter().map(|i| i.wrapping_add(base)));
        offset
    }

    /// Drops all geometry. Keeps allocated capacity for the next frame.
    #[inline]
    pub fn clear(&mut self) {
        self.vertices_2d.clear();
        self.vertices_3d.clear();
        self.indices.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices_2d.is_empty() && self.vertices_3d.is_empty() && self.indices.is_empty()
    }
}

fn checked_slice<T>(data: &[T], offset: u32, count: u32) -> Option<&[T]> {
    let start = offset as usize;
    let end = start.checked_add(count as usize)?;
    data.get(start..end)
}
