use std::borrow::Cow;
use std::mem;

use bytemuck::{Pod, Zeroable};
use cgmath::Matrix4;
use wgpu::{vertex_attr_array, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState, Buffer, BufferBindingType, BufferDescriptor, BufferUsages, Color, ColorTargetState, ColorWrites, CommandEncoder, CompareFunction, DepthStencilState, Face, FragmentState, FrontFace, IndexFormat, LoadOp, MultisampleState, Operations, PipelineLayout, PipelineLayoutDescriptor, PolygonMode, PrimitiveState, PrimitiveTopology, Queue, RenderPass, RenderPassColorAttachment, RenderPassDepthStencilAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, ShaderModule, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, VertexAttribute, VertexBufferLayout, VertexState, VertexStepMode};
use wgpu::util::{BufferInitDescriptor, DeviceExt};

use crate::asset::AssetManagerTrait;
use crate::error::VrResult;
use crate::frameloop::EYE_COUNT;
use crate::output::{EyeTarget, OutputInfo};
use crate::scene::{Scene, Vertex};

const VERTEX_ATTRS: [VertexAttribute; 2] = vertex_attr_array![ // See vertex shader->@location().
    0 => Float32x3, // pos
    1 => Float32x4, // color
];

const INST_ATTRS: [VertexAttribute; 5] = vertex_attr_array![ // See vertex shader->@location().
    11 => Float32x4, // tint
    12 => Float32x4, // model_m
    13 => Float32x4,
    14 => Float32x4,
    15 => Float32x4,
];

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uni {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Inst {
    tint: [f32; 4],
    model_m: [[f32; 4]; 4],
}

struct MeshBuf {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
}

// Draws a Scene into an eye target. Meshes are uploaded once, model
// transforms and tints are refreshed by prepare() every frame.
pub struct RoomRenderer {
    queue: Queue,
    opaque_pipeline: RenderPipeline,
    blend_pipeline: RenderPipeline,
    meshes: Box<[MeshBuf]>,
    inst_buf: Buffer,
    eye_unis: [(Buffer, BindGroup); EYE_COUNT],
}

impl RoomRenderer {
    pub fn new(output_info: &OutputInfo, asset_mgr: &dyn AssetManagerTrait, scene: &Scene) -> VrResult<Self> {
        let device = output_info.get_device();

        // Upload meshes.

        let meshes = scene.get_models().iter().map(|model| {
            let mesh = model.get_mesh();

            let vertex_buf = device.create_buffer_init(&BufferInitDescriptor {
                label: None,
                contents: bytemuck::cast_slice(mesh.get_vertexes()),
                usage: BufferUsages::VERTEX,
            });

            // Index buffer size must be a multiple of 4.

            let mut indexes = mesh.get_indexes().to_vec();
            let index_count = indexes.len() as u32;
            if indexes.len() % 2 == 1 {
                indexes.push(0);
            }

            let index_buf = device.create_buffer_init(&BufferInitDescriptor {
                label: None,
                contents: bytemuck::cast_slice(&indexes),
                usage: BufferUsages::INDEX,
            });

            MeshBuf {
                vertex_buf,
                index_buf,
                index_count,
            }
        }).collect();

        let inst_buf = device.create_buffer(&BufferDescriptor {
            label: None,
            size: (mem::size_of::<Inst>() * scene.len().max(1)) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Per-eye uniform buffers, both eyes are recorded into the same
        // encoder before submission.

        let bg_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: None,
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0, // See vertex shader->@binding().
                    visibility: ShaderStages::VERTEX,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }
            ]
        });

        let eye_unis = [0, 1].map(|_| {
            let uni_buf = device.create_buffer(&BufferDescriptor {
                label: None,
                size: mem::size_of::<Uni>() as u64,
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let bg = device.create_bind_group(&BindGroupDescriptor {
                label: None,
                layout: &bg_layout,
                entries: &[
                    BindGroupEntry {
                        binding: 0, // See vertex shader->@binding().
                        resource: uni_buf.as_entire_binding(),
                    }
                ]
            });

            (uni_buf, bg)
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[
                &bg_layout, // See vertex shader->@group().
            ],
            immediate_size: 0,
        });

        let source = asset_mgr.read_file("shader/room.wgsl")?;
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: None,
            source: ShaderSource::Wgsl(Cow::Owned(source)),
        });

        // Translucent models are blended over opaque ones, without hiding
        // each other.

        let opaque_pipeline = create_pipeline(output_info, &pipeline_layout, &shader, BlendState::REPLACE, true);
        let blend_pipeline = create_pipeline(output_info, &pipeline_layout, &shader, BlendState::ALPHA_BLENDING, false);

        Ok(Self {
            queue: output_info.get_queue().clone(),
            opaque_pipeline,
            blend_pipeline,
            meshes,
            inst_buf,
            eye_unis,
        })
    }

    pub fn prepare(&self, scene: &Scene) {
        assert!(scene.len() == self.meshes.len()); // Models can't be added after the renderer is created.

        let insts: Vec<_> = scene.get_models().iter().map(|model| Inst {
            tint: model.tint,
            model_m: model.get_matrix().into(),
        }).collect();

        self.queue.write_buffer(&self.inst_buf, 0, bytemuck::cast_slice(&insts));
    }

    pub fn render_eye<T: EyeTarget>(&self, encoder: &mut CommandEncoder, eye: usize, target: &T, view_proj: &Matrix4<f32>, scene: &Scene) {
        let (uni_buf, bg) = &self.eye_unis[eye];

        let uni = Uni {
            view_proj: (*view_proj).into(),
        };
        self.queue.write_buffer(uni_buf, 0, bytemuck::bytes_of(&uni));

        let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: None,
            color_attachments: &[Some(RenderPassColorAttachment { // See fragment shader->@location(0).
                view: target.get_render_view(),
                depth_slice: None,
                resolve_target: target.get_resolve_view(),
                ops: Operations {
                    load: LoadOp::Clear(Color {
                        r: 0.0,
                        g: 0.0,
                        b: 0.0,
                        a: 1.0,
                    }),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: target.get_depth_view(),
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        render_pass.set_bind_group(0, bg, &[]); // See PipelineLayoutDescriptor->bind_group_layouts.
        render_pass.set_vertex_buffer(1, self.inst_buf.slice(..));

        render_pass.set_pipeline(&self.opaque_pipeline);
        self.draw(&mut render_pass, scene, false);

        render_pass.set_pipeline(&self.blend_pipeline);
        self.draw(&mut render_pass, scene, true);
    }

    fn draw(&self, render_pass: &mut RenderPass, scene: &Scene, translucent: bool) {
        for (index, (model, mesh)) in scene.get_models().iter().zip(self.meshes.iter()).enumerate() {
            if model.visible && model.is_translucent() == translucent {
                let index = index as u32;

                render_pass.set_vertex_buffer(0, mesh.vertex_buf.slice(..));
                render_pass.set_index_buffer(mesh.index_buf.slice(..), IndexFormat::Uint16);
                render_pass.draw_indexed(0..mesh.index_count, 0, index..index + 1);
            }
        }
    }
}

fn create_pipeline(output_info: &OutputInfo, pipeline_layout: &PipelineLayout, shader: &ShaderModule, blend: BlendState, depth_write_enabled: bool) -> RenderPipeline {
    output_info.get_device().create_render_pipeline(&RenderPipelineDescriptor {
        label: None,
        layout: Some(pipeline_layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[
                VertexBufferLayout {
                    array_stride: mem::size_of::<Vertex>() as u64,
                    step_mode: VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRS,
                },
                VertexBufferLayout {
                    array_stride: mem::size_of::<Inst>() as u64,
                    step_mode: VertexStepMode::Instance,
                    attributes: &INST_ATTRS,
                },
            ],
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(ColorTargetState { // See fragment shader->@location().
                format: output_info.get_color_format(),
                blend: Some(blend),
                write_mask: ColorWrites::ALL,
            })],
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: Some(Face::Back),
            unclipped_depth: false,
            polygon_mode: PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: output_info.get_depth_format(),
            depth_write_enabled,
            depth_compare: CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: MultisampleState {
            count: output_info.get_sample_count(),
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
        cache: None
    })
}
