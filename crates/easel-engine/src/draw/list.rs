use super::{DrawCmd, GeometryStore, SortKey, Vertex2D, Vertex3D};

/// Recorded draw stream for a frame: commands plus the geometry they reference.
///
/// Performance characteristics:
/// - geometry appends and `add_command()` are O(1) amortized
/// - `optimize()` compacts in place; `sort_commands()` is a stable sort
/// - `reset()` keeps allocated capacity, so a warmed list does not allocate per frame
///
/// # Optimize, then sort
///
/// `optimize()` merges neighbours whose geometry is contiguous in the store.
/// `sort_commands()` reorders commands without touching geometry, which breaks
/// that contiguity. When both are used, call `optimize()` first.
#[derive(Debug, Default)]
pub struct DrawList {
    geometry: GeometryStore,
    commands: Vec<DrawCmd>,
    merged: usize,
}

impl DrawList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends 2D vertices and returns the offset of the first one.
    #[inline]
    pub fn add_vertices_2d(&mut self, vertices: &[Vertex2D]) -> u32 {
        self.geometry.push_2d(vertices)
    }

    #[inline]
    pub fn add_vertices_3d(&mut self, vertices: &[Vertex3D]) -> u32 {
        self.geometry.push_3d(vertices)
    }

    /// Appends absolute indices into the vertex array of the owning command's kind.
    #[inline]
    pub fn add_indices(&mut self, indices: &[u32]) -> u32 {
        self.geometry.push_indices(indices)
    }

    /// Appends indices local to a batch whose first vertex sits at `vertex_offset`.
    #[inline]
    pub fn add_local_indices(&mut self, indices: &[u32], vertex_offset: u32) -> u32 {
        self.geometry.push_indices_offset(indices, vertex_offset)
    }

    /// Appends a command. Transform, material and lights must already be baked.
    ///
    /// A range that does not fit the recorded geometry is a caller bug: it is
    /// logged here and the frame pipeline skips the command at submission.
    pub fn add_command(&mut self, cmd: impl Into<DrawCmd>) {
        let cmd = cmd.into();
        if !self.range_is_valid(&cmd) {
            log::warn!("draw command references geometry outside the draw list: {:?}", cmd.range());
        }
        self.commands.push(cmd);
    }

    #[inline]
    pub fn commands(&self) -> &[DrawCmd] {
        &self.commands
    }

    #[inline]
    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    #[inline]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Number of commands folded away by `optimize()` since the last reset.
    #[inline]
    pub fn batch_count(&self) -> usize {
        self.merged
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[inline]
    pub fn vertex_count_2d(&self) -> usize {
        self.geometry.vertices_2d().len()
    }

    #[inline]
    pub fn vertex_count_3d(&self) -> usize {
        self.geometry.vertices_3d().len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.geometry.indices().len()
    }

    /// Merges adjacent draws with identical baked state and contiguous geometry.
    ///
    /// The survivor's vertex/index counts become the sums of the merged
    /// commands. Indices are absolute, so geometry is left untouched.
    pub fn optimize(&mut self) {
        if self.commands.len() < 2 {
            return;
        }

        let before = self.commands.len();
        let mut write = 0usize;

        for read in 1..self.commands.len() {
            let (head, tail) = self.commands.split_at_mut(read);
            if merge_into(&mut head[write], &tail[0]) {
                continue;
            }
            write += 1;
            self.commands.swap(write, read);
        }

        self.commands.truncate(write + 1);
        self.merged += before - self.commands.len();

        log::trace!("draw list optimized: {before} -> {} commands", self.commands.len());
    }

    /// Stable-sorts draws by [`SortKey`] to group texture binds.
    ///
    /// State commands (viewport, scissor, clear) act as barriers: draws are only
    /// reordered within the runs between them. Paint order changes within a run,
    /// so blended scenes that depend on it must not sort.
    pub fn sort_commands(&mut self) {
        for run in self.commands.split_mut(|cmd| !cmd.is_draw()) {
            run.sort_by_key(SortKey::of);
        }
    }

    /// Number of texture changes between consecutive draws, in current order.
    pub fn texture_switches(&self) -> usize {
        let mut draws = self.commands.iter().filter(|c| c.is_draw());
        let Some(first) = draws.next() else { return 0 };

        let mut current = first.texture();
        let mut switches = 0;
        for cmd in draws {
            let texture = cmd.texture();
            if texture != current {
                switches += 1;
                current = texture;
            }
        }
        switches
    }

    /// Copies `other`'s geometry and commands after this list's own, rebasing offsets.
    ///
    /// Index data is copied per command and shifted by the vertex base of the
    /// command's kind. A command whose indices fall outside `other` gets an index
    /// offset no store can reach, so it is still skipped later.
    pub fn append(&mut self, other: &DrawList) {
        let base_2d = self.geometry.push_2d(other.geometry.vertices_2d());
        let base_3d = self.geometry.push_3d(other.geometry.vertices_3d());

        self.commands.reserve(other.commands.len());
        for cmd in &other.commands {
            let mut cmd = cmd.clone();
            let vertex_base = match &cmd {
                DrawCmd::Draw3D(_) => base_3d,
                _ => base_2d,
            };
            if let Some(range) = cmd.range_mut() {
                range.vertex_offset += vertex_base;
                if range.is_indexed() {
                    range.index_offset = match other.geometry.slice_indices(range.index_offset, range.index_count) {
                        Some(src) => self.geometry.push_indices_offset(src, vertex_base),
                        None => u32::MAX,
                    };
                }
            }
            self.commands.push(cmd);
        }
    }

    /// Clears commands, geometry and statistics. Keeps allocated capacity for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.commands.clear();
        self.geometry.clear();
        self.merged = 0;
    }

    fn range_is_valid(&self, cmd: &DrawCmd) -> bool {
        let g = &self.geometry;
        let (vertices_ok, range) = match cmd {
            DrawCmd::Draw2D(d) => (
                g.slice_2d(d.range.vertex_offset, d.range.vertex_count).is_some(),
                d.range,
            ),
            DrawCmd::Draw3D(d) => (
                g.slice_3d(d.range.vertex_offset, d.range.vertex_count).is_some(),
                d.range,
            ),
            _ => return true,
        };
        let indices_ok = !range.is_indexed()
            || g.slice_indices(range.index_offset, range.index_count).is_some();
        vertices_ok && indices_ok
    }
}

fn merge_into(prev: &mut DrawCmd, next: &DrawCmd) -> bool {
    let (range, next_range) = match (prev, next) {
        (DrawCmd::Draw2D(a), DrawCmd::Draw2D(b)) if a.can_merge(b) => (&mut a.range, &b.range),
        (DrawCmd::Draw3D(a), DrawCmd::Draw3D(b)) if a.can_merge(b) => (&mut a.range, &b.range),
        _ => return false,
    };

    range.absorb(next_range);
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Mat3, Mat4};

    use super::*;
    use crate::coords::Rect;
    use crate::draw::{
        BlendMode, Draw2D, Draw3D, DepthState, GeometryRange, Lighting, PrimitiveTopology,
        TextureHandle,
    };

    fn tri() -> [Vertex2D; 3] {
        [
            Vertex2D::colored(0.0, 0.0, [1.0; 4]),
            Vertex2D::colored(1.0, 0.0, [1.0; 4]),
            Vertex2D::colored(0.0, 1.0, [1.0; 4]),
        ]
    }

    fn quad() -> [Vertex2D; 4] {
        [
            Vertex2D::colored(0.0, 0.0, [1.0; 4]),
            Vertex2D::colored(1.0, 0.0, [1.0; 4]),
            Vertex2D::colored(1.0, 1.0, [1.0; 4]),
            Vertex2D::colored(0.0, 1.0, [1.0; 4]),
        ]
    }

    const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

    fn draw_2d(range: GeometryRange) -> Draw2D {
        Draw2D {
            range,
            topology: PrimitiveTopology::Triangle,
            blend: BlendMode::Alpha,
            texture: None,
            transform: Mat4::IDENTITY,
        }
    }

    fn push_tri(list: &mut DrawList) -> Draw2D {
        let offset = list.add_vertices_2d(&tri());
        draw_2d(GeometryRange::vertices(offset, 3))
    }

    fn push_quad(list: &mut DrawList) -> Draw2D {
        let v = list.add_vertices_2d(&quad());
        let i = list.add_local_indices(&QUAD_INDICES, v);
        draw_2d(GeometryRange::indexed(v, 4, i, 6))
    }

    fn tex(raw: u32) -> Option<TextureHandle> {
        TextureHandle::from_raw(raw)
    }

    // ── optimize ──────────────────────────────────────────────────────────

    #[test]
    fn identical_contiguous_draws_merge_into_one() {
        for k in 1..=6usize {
            let mut list = DrawList::new();
            for _ in 0..k {
                let d = push_tri(&mut list);
                list.add_command(d);
            }
            list.optimize();

            assert_eq!(list.command_count(), 1, "k = {k}");
            assert_eq!(list.batch_count(), k - 1);
            let range = list.commands()[0].range().copied().unwrap_or_default();
            assert_eq!(range.vertex_offset, 0);
            assert_eq!(range.vertex_count, 3 * k as u32);
        }
    }

    #[test]
    fn identical_3d_draws_merge() {
        let mut list = DrawList::new();
        let lighting = Arc::new(Lighting::default());
        for _ in 0..3 {
            let offset = list.add_vertices_3d(&[Vertex3D::default(); 3]);
            list.add_command(Draw3D {
                range: GeometryRange::vertices(offset, 3),
                topology: PrimitiveTopology::Triangle,
                blend: BlendMode::Disabled,
                texture: None,
                model_view: Mat4::IDENTITY,
                projection: Mat4::IDENTITY,
                normal: Mat3::IDENTITY,
                depth: DepthState { test: true, write: true, cull_back_faces: false },
                lighting: lighting.clone(),
            });
        }
        list.optimize();
        assert_eq!(list.command_count(), 1);
        assert_eq!(list.batch_count(), 2);
    }

    #[test]
    fn differing_blend_mode_splits_batches() {
        let mut list = DrawList::new();
        let a = push_tri(&mut list);
        let mut b = push_tri(&mut list);
        b.blend = BlendMode::Add;
        let c = push_tri(&mut list);
        list.add_command(a);
        list.add_command(b);
        list.add_command(c);

        list.optimize();
        assert_eq!(list.command_count(), 3);
        assert_eq!(list.batch_count(), 0);
    }

    #[test]
    fn boundary_command_yields_two_groups() {
        let mut list = DrawList::new();
        for i in 0..5 {
            let mut d = push_tri(&mut list);
            if i >= 3 {
                d.texture = tex(1);
            }
            list.add_command(d);
        }
        list.optimize();

        assert_eq!(list.command_count(), 2);
        assert_eq!(list.commands()[0].range().map(|r| r.vertex_count), Some(9));
        assert_eq!(list.commands()[1].range().map(|r| r.vertex_count), Some(6));
        assert_eq!(list.batch_count(), 3);
    }

    #[test]
    fn topology_change_prevents_merge() {
        let mut list = DrawList::new();
        let a = push_tri(&mut list);
        let mut b = push_tri(&mut list);
        b.topology = PrimitiveTopology::Line;
        list.add_command(a);
        list.add_command(b);
        list.optimize();
        assert_eq!(list.command_count(), 2);
    }

    #[test]
    fn non_contiguous_ranges_do_not_merge() {
        let mut list = DrawList::new();
        let a = push_tri(&mut list);
        let _gap = list.add_vertices_2d(&tri());
        let b = push_tri(&mut list);
        list.add_command(a);
        list.add_command(b);
        list.optimize();
        assert_eq!(list.command_count(), 2);
    }

    #[test]
    fn indexed_quads_merge_without_touching_indices() {
        let mut list = DrawList::new();
        let a = push_quad(&mut list);
        let b = push_quad(&mut list);
        list.add_command(a);
        list.add_command(b);
        let before = list.geometry().indices().to_vec();
        list.optimize();

        assert_eq!(list.command_count(), 1);
        let range = list.commands()[0].range().copied().unwrap_or_default();
        assert_eq!(range.vertex_count, 8);
        assert_eq!(range.index_count, 12);
        assert_eq!(list.geometry().indices(), &before[..]);
        assert_eq!(
            list.geometry().indices(),
            &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]
        );
    }

    #[test]
    fn merged_absolute_indices_stay_inside_the_merged_range() {
        let mut list = DrawList::new();
        for _ in 0..2 {
            let v = list.add_vertices_2d(&quad());
            let i = list.add_indices(&[v, v + 1, v + 2, v, v + 2, v + 3]);
            list.add_command(draw_2d(GeometryRange::indexed(v, 4, i, 6)));
        }
        list.optimize();

        assert_eq!(list.command_count(), 1);
        let range = list.commands()[0].range().copied().unwrap_or_default();
        let end = range.vertex_offset + range.vertex_count;
        let indices = list
            .geometry()
            .slice_indices(range.index_offset, range.index_count)
            .unwrap_or_default();
        assert_eq!(indices.len(), 12);
        for &i in indices {
            assert!(i >= range.vertex_offset && i < end, "index {i} out of range for {end} vertices");
        }
    }

    #[test]
    fn optimize_is_idempotent() {
        let mut list = DrawList::new();
        for _ in 0..2 {
            let d = push_quad(&mut list);
            list.add_command(d);
        }
        list.optimize();
        let indices = list.geometry().indices().to_vec();
        list.optimize();
        assert_eq!(list.command_count(), 1);
        assert_eq!(list.batch_count(), 1);
        assert_eq!(list.geometry().indices(), indices.as_slice());
    }

    #[test]
    fn state_commands_never_merge() {
        let mut list = DrawList::new();
        let a = push_tri(&mut list);
        list.add_command(a);
        list.add_command(DrawCmd::SetViewport(Rect::new(0.0, 0.0, 10.0, 10.0)));
        list.add_command(DrawCmd::SetViewport(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let b = push_tri(&mut list);
        list.add_command(b);
        list.optimize();

        assert_eq!(list.command_count(), 4);
        assert!(matches!(list.commands()[1], DrawCmd::SetViewport(_)));
    }

    #[test]
    fn empty_list_survives_optimize_and_sort() {
        let mut list = DrawList::new();
        list.optimize();
        list.sort_commands();
        assert_eq!(list.command_count(), 0);
        assert_eq!(list.batch_count(), 0);
    }

    // ── sort ──────────────────────────────────────────────────────────────

    #[test]
    fn sort_orders_by_texture_null_first() {
        let mut list = DrawList::new();
        for t in [2, 1, 0] {
            let mut d = push_tri(&mut list);
            d.texture = tex(t);
            list.add_command(d);
        }
        list.sort_commands();

        let order: Vec<_> = list.commands().iter().map(DrawCmd::texture).collect();
        assert_eq!(order, vec![None, tex(1), tex(2)]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut list = DrawList::new();
        for t in [1, 2, 1, 2] {
            let mut d = push_tri(&mut list);
            d.texture = tex(t);
            list.add_command(d);
        }
        list.sort_commands();

        let offsets: Vec<_> = list
            .commands()
            .iter()
            .filter_map(|c| c.range().map(|r| r.vertex_offset))
            .collect();
        assert_eq!(offsets, vec![0, 6, 3, 9]);
    }

    #[test]
    fn sort_does_not_cross_state_commands() {
        let mut list = DrawList::new();
        let mut a = push_tri(&mut list);
        a.texture = tex(2);
        let b = push_tri(&mut list);
        list.add_command(a);
        list.add_command(DrawCmd::SetScissor { rect: Rect::new(0.0, 0.0, 5.0, 5.0), enabled: true });
        list.add_command(b);
        list.sort_commands();

        assert_eq!(list.commands()[0].texture(), tex(2));
        assert!(!list.commands()[1].is_draw());
        assert_eq!(list.commands()[2].texture(), None);
    }

    #[test]
    fn texture_switches_counts_transitions() {
        let mut list = DrawList::new();
        for t in [1, 1, 2, 1, 0] {
            let mut d = push_tri(&mut list);
            d.texture = tex(t);
            list.add_command(d);
        }
        assert_eq!(list.texture_switches(), 3);
        list.sort_commands();
        assert_eq!(list.texture_switches(), 2);
    }

    // ── append / reset ────────────────────────────────────────────────────

    #[test]
    fn append_rebases_offsets() {
        let mut list = DrawList::new();
        let a = push_quad(&mut list);
        list.add_command(a);

        let mut other = DrawList::new();
        let b = push_quad(&mut other);
        other.add_command(b);
        other.add_command(DrawCmd::SetViewport(Rect::default()));

        list.append(&other);
        assert_eq!(list.command_count(), 3);
        let range = list.commands()[1].range().copied().unwrap_or_default();
        assert_eq!(range, GeometryRange::indexed(4, 4, 6, 6));
        assert_eq!(list.geometry().indices()[6..], [4, 5, 6, 4, 6, 7]);

        // Appended geometry stays contiguous, so it still merges.
        list.optimize();
        assert_eq!(list.command_count(), 2);
    }

    #[test]
    fn reset_clears_everything() {
        let mut list = DrawList::new();
        for _ in 0..2 {
            let d = push_tri(&mut list);
            list.add_command(d);
        }
        list.optimize();
        list.reset();
        assert_eq!(list.command_count(), 0);
        assert_eq!(list.batch_count(), 0);
        assert!(list.geometry().is_empty());
    }

    #[test]
    fn out_of_range_command_is_kept_for_the_pipeline_to_skip() {
        let mut list = DrawList::new();
        list.add_command(draw_2d(GeometryRange::vertices(10, 3)));
        assert_eq!(list.command_count(), 1);
    }
}
