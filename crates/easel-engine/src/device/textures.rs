use crate::draw::TextureHandle;

struct TextureEntry {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

/// Textures addressable by [`TextureHandle`].
///
/// Handle `n` lives at index `n - 1`. Handles are never reused, so a stale
/// handle resolves to the white fallback instead of another texture.
pub(crate) struct TextureTable {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fallback: TextureEntry,
    entries: Vec<Option<TextureEntry>>,
}

impl TextureTable {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("easel texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("easel texture sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let fallback = create_entry(device, queue, &layout, &sampler, "easel white texture", 1, 1, &[255; 4]);

        Self {
            layout,
            sampler,
            fallback,
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Uploads an RGBA8 (sRGB) image. Returns `None` if `pixels` is not `width * height * 4` bytes.
    pub fn register_rgba8(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Option<TextureHandle> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            log::warn!(
                "texture rejected: {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            );
            return None;
        }

        let handle = TextureHandle::from_raw(self.entries.len() as u32 + 1)?;
        let entry = create_entry(device, queue, &self.layout, &self.sampler, "easel texture", width, height, pixels);
        self.entries.push(Some(entry));
        log::debug!("texture {} registered ({width}x{height})", handle.raw());
        Some(handle)
    }

    /// Drops the texture behind `handle`. Returns `false` for unknown handles.
    pub fn unregister(&mut self, handle: TextureHandle) -> bool {
        match self.entries.get_mut(handle.raw() as usize - 1) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn size(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.entry(handle).map(|e| e.size)
    }

    /// Bind group for `handle`, or the white fallback for `None`/unknown handles.
    pub fn bind_group(&self, handle: Option<TextureHandle>) -> &wgpu::BindGroup {
        handle
            .and_then(|h| self.entry(h))
            .map_or(&self.fallback.bind_group, |e| &e.bind_group)
    }

    fn entry(&self, handle: TextureHandle) -> Option<&TextureEntry> {
        self.entries.get(handle.raw() as usize - 1)?.as_ref()
    }
}

#[allow(clippy::too_many_arguments)]
fn create_entry(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> TextureEntry {
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        extent,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    TextureEntry {
        _texture: texture,
        bind_group,
        size: (width, height),
    }
}
