use core::num::NonZeroU32;

/// Opaque texture handle.
///
/// Handles are issued by the texture owner (see `device::TextureTable`) and are
/// only compared and passed through by the draw stream. `Option<TextureHandle>`
/// is the nullable form; `None` orders before every handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TextureHandle(NonZeroU32);

impl TextureHandle {
    /// Returns `None` for the reserved raw value `0`.
    #[inline]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0.get()
    }
}
