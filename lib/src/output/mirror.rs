use std::borrow::Cow;
use std::sync::Arc;

use log::debug;
use wgpu::{BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState, Color, ColorTargetState, ColorWrites, CommandEncoder, CommandEncoderDescriptor, CompositeAlphaMode, Device, Extent3d, FragmentState, LoadOp, MultisampleState, Operations, Origin3d, PipelineLayoutDescriptor, PresentMode, PrimitiveState, Queue, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, SamplerBindingType, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError, TexelCopyTextureInfo, Texture, TextureAspect, TextureSampleType, TextureUsages, TextureViewDimension, VertexState};
use winit::window::Window;

use crate::asset::AssetManagerTrait;
use crate::config::Config;
use crate::error::{VrError, VrResult};
use crate::frameloop::EYE_COUNT;
use crate::output::{EyeTexture, MirrorWindow, XROutput, create_texture};

// Shows both eyes side by side in the desktop window. Eye images are copied
// into the mirror texture while they are still acquired, then the texture is
// stretched over the window surface.
pub struct Mirror {
    device: Device,
    queue: Queue,
    window: Arc<Window>,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    texture: Texture,
    eye_offsets: [u32; EYE_COUNT],
    pipeline: RenderPipeline,
    bg: BindGroup,
}

impl Mirror {
    pub fn new(output: &XROutput, window: Arc<Window>, asset_mgr: &dyn AssetManagerTrait) -> VrResult<Self> {
        let device = output.get_device().clone();
        let info = output.get_info();
        let queue = info.get_queue().clone();

        // Setup surface.

        let surface = output.get_instance().create_surface(Arc::clone(&window))?;
        let surface_caps = surface.get_capabilities(output.get_adapter());
        let format = surface_caps.formats.iter().find(|format| format.is_srgb()).or(surface_caps.formats.first()).copied().ok_or_else(|| VrError::Unsupported(String::from("Window surface has no formats")))?;

        let size = window.inner_size();

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: PresentMode::AutoNoVsync, // HMD paces the loop.
            desired_maximum_frame_latency: 2,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };

        if size.width > 0 && size.height > 0 {
            surface.configure(&device, &surface_config);
        }

        // Setup mirror texture.

        let eye_sizes = output.get_eye_texture_sizes();
        let width = eye_sizes.iter().map(|(width, _)| width).sum();
        let height = eye_sizes.iter().map(|(_, height)| *height).max().unwrap_or(1);
        let eye_offsets = [0, eye_sizes[0].0];

        let texture = create_texture(&device, width, height, 1, output.get_color_format(), TextureUsages::COPY_DST | TextureUsages::TEXTURE_BINDING);
        let texture_view = texture.create_view(&Default::default());
        let sampler = device.create_sampler(&Default::default());

        // Setup blit pipeline.

        let bg_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: None,
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0, // See fragment shader->@binding().
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ]
        });

        let bg = device.create_bind_group(&BindGroupDescriptor {
            label: None,
            layout: &bg_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&texture_view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&sampler),
                },
            ]
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[
                &bg_layout,
            ],
            immediate_size: 0,
        });

        let source = asset_mgr.read_file("shader/mirror.wgsl")?;
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: None,
            source: ShaderSource::Wgsl(Cow::Owned(source)),
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: None,
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(ColorTargetState {
                    format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview_mask: None,
            cache: None
        });

        Ok(Self {
            device,
            queue,
            window,
            surface,
            surface_config,
            texture,
            eye_offsets,
            pipeline,
            bg,
        })
    }

    // Mirror for the window resized to match the HMD, None if disabled.
    pub fn new_opt(output: &XROutput, window: &MirrorWindow, config: &Config, asset_mgr: &dyn AssetManagerTrait) -> VrResult<Option<Self>> {
        if !config.mirror {
            return Ok(None);
        }

        let Some(window_handle) = window.get_window() else {
            return Ok(None);
        };

        let (width, height) = get_window_size(&output.get_eye_texture_sizes(), config.mirror_scale);
        window.set_size(width, height);

        Ok(Some(Self::new(output, window_handle, asset_mgr)?))
    }

    pub fn copy_eye(&self, encoder: &mut CommandEncoder, eye: usize, eye_texture: &EyeTexture) -> VrResult<()> {
        let (width, height) = eye_texture.get_size();

        encoder.copy_texture_to_texture(
            eye_texture.get_color_texture()?.as_image_copy(),
            TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: Origin3d {
                    x: self.eye_offsets[eye],
                    y: 0,
                    z: 0,
                },
                aspect: TextureAspect::All,
            },
            Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }

    pub fn present(&mut self) -> VrResult<()> {
        let size = self.window.inner_size();

        if size.width == 0 || size.height == 0 { // Minimized.
            return Ok(());
        }

        if size.width != self.surface_config.width || size.height != self.surface_config.height {
            self.reconfigure(size.width, size.height);
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                self.reconfigure(size.width, size.height);
                return Ok(());
            },
            Err(SurfaceError::Timeout) => {
                debug!("Mirror surface timeout");
                return Ok(());
            },
            Err(e) => return Err(VrError::gpu("get_current_texture", e)),
        };

        let color_view = surface_texture.texture.create_view(&Default::default());

        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: None,
        });

        {
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(RenderPassColorAttachment { // See fragment shader->@location(0).
                    view: &color_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bg, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.queue.submit([encoder.finish()]);
        surface_texture.present();

        Ok(())
    }

    fn reconfigure(&mut self, width: u32, height: u32) {
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }
}

pub fn get_window_size(eye_sizes: &[(u32, u32); EYE_COUNT], scale: f32) -> (u32, u32) {
    let width = eye_sizes.iter().map(|(width, _)| width).sum::<u32>() as f32 * scale;
    let height = eye_sizes.iter().map(|(_, height)| *height).max().unwrap_or(0) as f32 * scale;

    (width.round() as u32, height.round() as u32)
}
