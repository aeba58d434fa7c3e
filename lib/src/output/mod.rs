use wgpu::{Adapter, Device, Extent3d, Features, Limits, Queue, Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureFormatFeatureFlags, TextureUsages, TextureView};

mod eyetexture;
pub use eyetexture::*;

mod mirror;
pub use mirror::*;

mod window;
pub use window::*;

mod xr;
pub use xr::*;

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

pub struct OutputInfo {
    device: Device,
    queue: Queue,
    color_format: TextureFormat,
    depth_format: TextureFormat,
    sample_count: u32,
}

impl OutputInfo {
    fn new(device: &Device, queue: &Queue, color_format: TextureFormat, depth_format: TextureFormat, sample_count: u32) -> Self {
        assert!(sample_count > 0);

        Self {
            device: device.clone(),
            queue: queue.clone(),
            color_format,
            depth_format,
            sample_count,
        }
    }

    pub fn get_device(&self) -> &Device {
        &self.device
    }

    pub fn get_queue(&self) -> &Queue {
        &self.queue
    }

    pub fn get_color_format(&self) -> TextureFormat {
        self.color_format
    }

    pub fn get_depth_format(&self) -> TextureFormat {
        self.depth_format
    }

    pub fn get_sample_count(&self) -> u32 {
        self.sample_count
    }
}

// Render target of one eye for the current frame.
pub trait EyeTarget {
    fn get_render_view(&self) -> &TextureView;
    fn get_resolve_view(&self) -> Option<&TextureView>; // Set when rendering multisampled.
    fn get_depth_view(&self) -> &TextureView;
}

fn get_default_features() -> Features {
    Features::default()
}

fn get_default_limits() -> Limits {
    Default::default()
}

fn get_sample_count(adapter: &Adapter, format: TextureFormat, requested: u32, max: u32) -> u32 {
    let color_flags = adapter.get_texture_format_features(format).flags;
    let depth_flags = adapter.get_texture_format_features(DEPTH_FORMAT).flags;

    for (flag, count) in [(TextureFormatFeatureFlags::MULTISAMPLE_X4, 4), (TextureFormatFeatureFlags::MULTISAMPLE_X2, 2)] {
        if count <= requested && count <= max && color_flags.contains(flag) && depth_flags.contains(flag) {
            return count;
        }
    }

    1
}

fn create_texture(device: &Device, width: u32, height: u32, sample_count: u32, format: TextureFormat, usage: TextureUsages) -> Texture {
    device.create_texture(&TextureDescriptor {
        label: None,
        size: Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}
