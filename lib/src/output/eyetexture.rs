use ash::vk::Handle;
use wgpu::{Device, Extent3d, Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView};

use crate::error::{VrError, VrResult, XrResultExt};
use crate::output::{DEPTH_FORMAT, EyeTarget, XROutput, create_texture};

// Swapchain image bookkeeping. At most one image may be acquired at a time,
// and it must be released before the frame is submitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChainCursor {
    len: u32,
    current: Option<u32>,
}

impl ChainCursor {
    pub fn new(len: u32) -> Self {
        Self {
            len,
            current: None,
        }
    }

    pub fn get(&self) -> Option<u32> {
        self.current
    }

    pub fn is_acquired(&self) -> bool {
        self.current.is_some()
    }

    // Checked before asking the runtime for an image, so the runtime and the
    // cursor never disagree on what is acquired.
    pub fn check_acquire(&self) -> VrResult<()> {
        if self.current.is_some() {
            return Err(VrError::Swapchain("image acquired twice"));
        }

        Ok(())
    }

    pub fn acquire(&mut self, index: u32) -> VrResult<()> {
        self.check_acquire()?;

        if index >= self.len {
            return Err(VrError::Swapchain("image index out of range"));
        }

        self.current = Some(index);
        Ok(())
    }

    pub fn release(&mut self) -> VrResult<u32> {
        self.current.take().ok_or(VrError::Swapchain("image released without acquire"))
    }
}

pub struct EyeTexture {
    width: u32,
    height: u32,
    color_chain: openxr::Swapchain<openxr::Vulkan>,
    depth_chain: openxr::Swapchain<openxr::Vulkan>,
    color_textures: Box<[Texture]>,
    color_views: Box<[TextureView]>,
    depth_views: Box<[TextureView]>,
    multisample_view: Option<TextureView>,
    color_cursor: ChainCursor,
    depth_cursor: ChainCursor,
}

impl EyeTexture {
    pub fn new(output: &XROutput, eye: usize) -> VrResult<Self> {
        let (width, height) = output.get_eye_texture_sizes()[eye];
        let sample_count = output.get_sample_count();
        let color_format = output.get_color_format();
        let (xr_color_format, xr_depth_format) = output.get_xr_formats();
        let device = output.get_device();
        let xr_session = output.get_session();

        if width == 0 || height == 0 {
            return Err(VrError::Swapchain("eye texture has zero size"));
        }

        // Setup color swapchain, always single sampled. Multisampled rendering
        // is resolved into it.

        let xr_color_info = openxr::SwapchainCreateInfo {
            create_flags: openxr::SwapchainCreateFlags::EMPTY,
            usage_flags: openxr::SwapchainUsageFlags::COLOR_ATTACHMENT | openxr::SwapchainUsageFlags::TRANSFER_SRC,
            format: xr_color_format,
            sample_count: 1,
            width,
            height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        };

        let color_chain = xr_session.create_swapchain(&xr_color_info).xr("create_swapchain")?;
        let color_images = color_chain.enumerate_images().xr("enumerate_images")?;
        let color_textures = import_images(device, &color_images, width, height, 1, color_format, wgpu::wgt::TextureUses::COLOR_TARGET | wgpu::wgt::TextureUses::COPY_SRC, TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC)?;
        let color_views: Box<[_]> = color_textures.iter().map(|texture| texture.create_view(&Default::default())).collect();

        // Setup depth swapchain.

        let xr_depth_info = openxr::SwapchainCreateInfo {
            create_flags: openxr::SwapchainCreateFlags::EMPTY,
            usage_flags: openxr::SwapchainUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            format: xr_depth_format,
            sample_count,
            width,
            height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        };

        let depth_chain = xr_session.create_swapchain(&xr_depth_info).xr("create_swapchain")?;
        let depth_images = depth_chain.enumerate_images().xr("enumerate_images")?;
        let depth_textures = import_images(device, &depth_images, width, height, sample_count, DEPTH_FORMAT, wgpu::wgt::TextureUses::DEPTH_STENCIL_WRITE, TextureUsages::RENDER_ATTACHMENT)?;
        let depth_views: Box<[_]> = depth_textures.iter().map(|texture| texture.create_view(&Default::default())).collect();

        // Setup multisample buffer.

        let multisample_view = if sample_count > 1 {
            let texture = create_texture(device, width, height, sample_count, color_format, TextureUsages::RENDER_ATTACHMENT);
            Some(texture.create_view(&Default::default()))
        } else {
            None
        };

        let color_cursor = ChainCursor::new(color_views.len() as u32);
        let depth_cursor = ChainCursor::new(depth_views.len() as u32);

        Ok(Self {
            width,
            height,
            color_chain,
            depth_chain,
            color_textures,
            color_views,
            depth_views,
            multisample_view,
            color_cursor,
            depth_cursor,
        })
    }

    pub fn get_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_acquired(&self) -> bool {
        self.color_cursor.is_acquired() || self.depth_cursor.is_acquired()
    }

    pub fn acquire(&mut self) -> VrResult<()> {
        self.color_cursor.check_acquire()?;
        self.depth_cursor.check_acquire()?;

        let color_index = self.color_chain.acquire_image().xr("acquire_image")?;
        self.color_cursor.acquire(color_index)?;
        self.color_chain.wait_image(openxr::Duration::INFINITE).xr("wait_image")?;

        let depth_index = self.depth_chain.acquire_image().xr("acquire_image")?;
        self.depth_cursor.acquire(depth_index)?;
        self.depth_chain.wait_image(openxr::Duration::INFINITE).xr("wait_image")?;

        Ok(())
    }

    // View to render into: the multisample buffer if there is one, otherwise
    // the swapchain image itself.
    pub fn get_rtv(&self) -> VrResult<&TextureView> {
        match &self.multisample_view {
            Some(view) => Ok(view),
            None => self.get_current(&self.color_views, &self.color_cursor),
        }
    }

    pub fn get_depth_view(&self) -> VrResult<&TextureView> {
        self.get_current(&self.depth_views, &self.depth_cursor)
    }

    pub fn get_color_texture(&self) -> VrResult<&Texture> {
        self.get_current(&self.color_textures, &self.color_cursor)
    }

    pub fn commit(&mut self) -> VrResult<()> {
        self.color_cursor.release()?;
        self.color_chain.release_image().xr("release_image")?;

        self.depth_cursor.release()?;
        self.depth_chain.release_image().xr("release_image")?;

        Ok(())
    }

    // Bound to the images acquired for this frame.
    pub fn get_target(&self) -> VrResult<EyeTextureTarget<'_>> {
        let resolve_view_opt = match &self.multisample_view {
            Some(_) => Some(self.get_current(&self.color_views, &self.color_cursor)?),
            None => None,
        };

        Ok(EyeTextureTarget {
            render_view: self.get_rtv()?,
            resolve_view_opt,
            depth_view: self.get_depth_view()?,
        })
    }

    pub(super) fn get_color_chain(&self) -> &openxr::Swapchain<openxr::Vulkan> {
        &self.color_chain
    }

    pub(super) fn get_rect(&self) -> openxr::Rect2Di {
        openxr::Rect2Di {
            offset: openxr::Offset2Di {
                x: 0,
                y: 0,
            },
            extent: openxr::Extent2Di {
                width: self.width as i32,
                height: self.height as i32,
            }
        }
    }

    fn get_current<'a, T>(&'a self, items: &'a [T], cursor: &ChainCursor) -> VrResult<&'a T> {
        let index = cursor.get().ok_or(VrError::Swapchain("no image acquired"))?;
        Ok(&items[index as usize])
    }
}

pub struct EyeTextureTarget<'a> {
    render_view: &'a TextureView,
    resolve_view_opt: Option<&'a TextureView>,
    depth_view: &'a TextureView,
}

impl EyeTarget for EyeTextureTarget<'_> {
    fn get_render_view(&self) -> &TextureView {
        self.render_view
    }

    fn get_resolve_view(&self) -> Option<&TextureView> {
        self.resolve_view_opt
    }

    fn get_depth_view(&self) -> &TextureView {
        self.depth_view
    }
}

#[allow(clippy::too_many_arguments)]
fn import_images(device: &Device, images: &[u64], width: u32, height: u32, sample_count: u32, format: TextureFormat, hal_usage: wgpu::wgt::TextureUses, usage: TextureUsages) -> VrResult<Box<[Texture]>> {
    let size = Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let wgpu_descr_hal = wgpu::hal::TextureDescriptor {
        label: None,
        size,
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format,
        usage: hal_usage,
        memory_flags: wgpu::hal::MemoryFlags::empty(),
        view_formats: vec![],
    };

    let wgpu_descr = TextureDescriptor {
        label: None,
        size,
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    };

    let wgpu_hal_dev = unsafe { device.as_hal::<wgpu::hal::vulkan::Api>() }.ok_or_else(|| VrError::Unsupported(String::from("wgpu device is not backed by Vulkan")))?;

    let textures = images.iter().map(|texture_raw| {
        let texture_handle = ash::vk::Image::from_raw(*texture_raw);
        let texture_hal = unsafe { wgpu_hal_dev.texture_from_raw(texture_handle, &wgpu_descr_hal, Some(Box::new(|| {})), wgpu::hal::vulkan::TextureMemory::External) }; // Don't take ownership of the texture.
        unsafe { device.create_texture_from_hal::<wgpu::hal::vulkan::Api>(texture_hal, &wgpu_descr) }
    }).collect();

    Ok(textures)
}
