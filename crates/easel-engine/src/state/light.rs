use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Maximum number of lights a single draw can bake.
pub const MAX_LIGHTS: usize = 8;

#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum LightKind {
    Directional = 0,
    #[default]
    Point = 1,
    Spot = 2,
}

/// A light record as held by the registry.
///
/// Equality is by value; the registry uses it to find lights to remove.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    /// Direction the light points toward (directional and spot lights).
    pub direction: Vec3,
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub ambient: [f32; 4],
    /// Constant, linear and quadratic attenuation factors.
    pub attenuation: [f32; 3],
    /// Spot cone half-angle in degrees.
    pub spot_cutoff: f32,
    pub spot_concentration: f32,
    pub enabled: bool,
}

impl Light {
    pub fn point(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn directional(direction: Vec3) -> Self {
        Self {
            kind: LightKind::Directional,
            direction,
            ..Self::default()
        }
    }

    pub fn spot(position: Vec3, direction: Vec3, cutoff_degrees: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            position,
            direction,
            spot_cutoff: cutoff_degrees,
            ..Self::default()
        }
    }

    /// Packs the light into its uniform representation.
    pub fn to_uniform(&self) -> LightUniform {
        let dir = self.direction.try_normalize().unwrap_or(Vec3::NEG_Z);
        LightUniform {
            position: [
                self.position.x,
                self.position.y,
                self.position.z,
                self.kind as u32 as f32,
            ],
            direction: [dir.x, dir.y, dir.z, self.spot_cutoff.to_radians().cos()],
            diffuse: self.diffuse,
            specular: self.specular,
            ambient: self.ambient,
            attenuation: [
                self.attenuation[0],
                self.attenuation[1],
                self.attenuation[2],
                self.spot_concentration,
            ],
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            diffuse: [1.0, 1.0, 1.0, 1.0],
            specular: [1.0, 1.0, 1.0, 1.0],
            ambient: [0.0, 0.0, 0.0, 1.0],
            attenuation: [1.0, 0.0, 0.0],
            spot_cutoff: 45.0,
            spot_concentration: 0.0,
            enabled: true,
        }
    }
}

/// GPU layout of one light (96 bytes, matches `Light` in `draw3d.wgsl`).
///
/// - `position.w`: light kind
/// - `direction.w`: cosine of the spot cutoff
/// - `attenuation.w`: spot concentration
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub ambient: [f32; 4],
    pub attenuation: [f32; 4],
}

/// Fixed-size snapshot of the enabled lights at record time.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightBlock {
    pub lights: [LightUniform; MAX_LIGHTS],
    pub count: u32,
    pub _pad: [u32; 3],
}

impl LightBlock {
    pub fn empty() -> Self {
        Self::zeroed()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for LightBlock {
    fn default() -> Self {
        Self::empty()
    }
}

/// Registered lights plus the global lighting switch.
///
/// Add/remove are linear scans by value. At most [`MAX_LIGHTS`] lights can be
/// registered; extra registrations are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct LightRegistry {
    lights: Vec<Light>,
    enabled: bool,
}

impl LightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the registry is full.
    pub fn register(&mut self, light: Light) -> bool {
        if self.lights.len() >= MAX_LIGHTS {
            log::warn!("light registry full ({MAX_LIGHTS} lights); registration ignored");
            return false;
        }
        self.lights.push(light);
        true
    }

    /// Removes the first light equal to `light`. Unknown lights are ignored.
    pub fn unregister(&mut self, light: &Light) -> bool {
        match self.lights.iter().position(|l| l == light) {
            Some(i) => {
                self.lights.remove(i);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn active(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter().filter(|l| l.enabled)
    }

    /// Packs the enabled lights in registration order.
    pub fn snapshot(&self) -> LightBlock {
        let mut block = LightBlock::empty();
        for (slot, light) in block.lights.iter_mut().zip(self.active()) {
            *slot = light.to_uniform();
            block.count += 1;
        }
        block
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }
}
