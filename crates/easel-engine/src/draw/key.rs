use core::cmp::Ordering;

use super::{DrawCmd, TextureHandle};

/// Pipeline-state sort key for draw commands.
///
/// Ordering rules:
/// 1) `texture`: ascending, untextured (`None`) first
///
/// Sorting with this key is always stable, so draws sharing a texture keep
/// their recorded order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SortKey {
    pub texture: Option<TextureHandle>,
}

impl SortKey {
    #[inline]
    pub const fn new(texture: Option<TextureHandle>) -> Self {
        Self { texture }
    }

    #[inline]
    pub fn of(cmd: &DrawCmd) -> Self {
        Self::new(cmd.texture())
    }
}

impl Ord for SortKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.texture.cmp(&other.texture)
    }
}

impl PartialOrd for SortKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
