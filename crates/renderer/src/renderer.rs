//! Scene renderer: owns the GPU state and every uploaded resource, and
//! records shadow, scene, sky and overlay passes for one frame.

use std::collections::HashMap;
use std::sync::Arc;

use asset::cubemap::CubemapData;
use asset::mesh::MeshData;
use asset::model::ModelData;
use asset::texture::TextureData;
use corelib::loading::TextureSlot;
use corelib::scene::{EnvironmentId, ModelId, SceneState};
use corelib::viewport::SurfaceSize;
use wgpu::{
    AddressMode, BindGroup, Buffer, BufferUsages, CommandBuffer, CommandEncoder,
    CommandEncoderDescriptor, Device, LoadOp, Operations, Queue, RenderPass,
    RenderPassColorAttachment, RenderPassDepthStencilAttachment, RenderPassDescriptor, Sampler,
    StoreOp, TextureFormat, TextureView,
};
use winit::window::Window;

use crate::draw::{self, Draw, DrawList, Geometry, MaterialRef, ModelLayout, Pipeline, PlaneKey};
use crate::error::RenderError;
use crate::gpu::GpuState;
use crate::material::{self, FloorSlots, MaterialMaps};
use crate::pipelines::{Layouts, Pipelines};
use crate::resources::{self, Defaults, GpuMesh, GpuTexture};
use crate::uniforms::{FrameUniform, MaterialUniform, ObjectUniform, align_to};

/// What an overlay draws into: the frame's color target after the scene.
pub struct OverlayTarget<'a> {
    pub device: &'a Device,
    pub queue: &'a Queue,
    pub view: &'a TextureView,
    pub size_in_pixels: [u32; 2],
    /// Surface pixels per logical window point.
    pub pixel_ratio: f32,
}

/// Extra UI drawn on top of the scene (the tunables panel).
pub trait Overlay {
    /// Record into `encoder`. Returned command buffers are submitted
    /// ahead of it.
    fn record(
        &mut self,
        target: &OverlayTarget<'_>,
        encoder: &mut CommandEncoder,
    ) -> Vec<CommandBuffer>;
}

struct GpuModel {
    /// By mesh, then primitive.
    meshes: Vec<Vec<GpuMesh>>,
    materials: Vec<BindGroup>,
    default_material: BindGroup,
}

/// Dynamic-offset uniform buffer holding every object uniform of a frame.
struct ObjectBuffer {
    buffer: Buffer,
    bind_group: BindGroup,
    capacity: usize,
    stride: u64,
}

impl ObjectBuffer {
    fn new(device: &Device, layouts: &Layouts, capacity: usize) -> Self {
        let stride = align_to(
            std::mem::size_of::<ObjectUniform>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object UBO"),
            size: stride * capacity as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object BG"),
            layout: &layouts.object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniform>() as u64),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            capacity,
            stride,
        }
    }

    fn offset(&self, object: usize) -> u32 {
        (object as u64 * self.stride) as u32
    }

    fn bytes(&self, uniforms: &[ObjectUniform]) -> Vec<u8> {
        let stride = self.stride as usize;
        let mut bytes = vec![0u8; uniforms.len() * stride];
        for (chunk, u) in bytes.chunks_exact_mut(stride).zip(uniforms) {
            let src = bytemuck::bytes_of(u);
            chunk[..src.len()].copy_from_slice(src);
        }
        bytes
    }
}

struct ShadowMap {
    view: TextureView,
    size: u32,
}

pub struct Renderer {
    gpu: GpuState,
    layouts: Layouts,
    pipelines: Pipelines,
    defaults: Defaults,

    frame_buf: Buffer,
    frame_bg: BindGroup,
    shadow_frame_bg: BindGroup,
    objects: ObjectBuffer,

    shadow: ShadowMap,
    shadow_sampler: Sampler,
    env_sampler: Sampler,
    model_sampler: Sampler,

    models: Vec<GpuModel>,
    model_layouts: Vec<ModelLayout>,
    environments: Vec<GpuTexture>,
    bound_environment: Option<EnvironmentId>,

    floor: FloorSlots,
    floor_sampler: Sampler,
    floor_material: BindGroup,
    planes: HashMap<PlaneKey, GpuMesh>,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        size: SurfaceSize,
    ) -> Result<Self, RenderError> {
        let gpu = GpuState::new(window, backends, size).await?;
        let device = gpu.device();
        let layouts = Layouts::new(device);
        let pipelines = Pipelines::new(device, &layouts, gpu.surface_format());
        let defaults = Defaults::new(device, gpu.queue());

        let frame_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame UBO"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_frame_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow frame BG"),
            layout: &layouts.shadow_frame,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buf.as_entire_binding(),
            }],
        });
        let objects = ObjectBuffer::new(device, &layouts, 16);

        let shadow = ShadowMap {
            view: resources::depth_view(device, "Shadow map", 1, 1, true),
            size: 1,
        };
        let shadow_sampler = resources::shadow_sampler(device);
        let env_sampler = resources::linear_sampler(device, "Environment sampler", AddressMode::ClampToEdge);
        let model_sampler = resources::linear_sampler(device, "Model sampler", AddressMode::Repeat);
        let floor_sampler = resources::linear_sampler(device, "Floor sampler", AddressMode::Repeat);

        let floor = FloorSlots::default();
        let floor_material = material::bind_group(
            device,
            &layouts.material,
            "Floor material",
            &MaterialUniform::floor(),
            floor.maps(&defaults),
            &floor_sampler,
        );
        let frame_bg = frame_bind_group(
            device,
            &layouts,
            &frame_buf,
            &shadow,
            &shadow_sampler,
            &defaults.black_cube.view,
            &env_sampler,
        );

        Ok(Self {
            gpu,
            layouts,
            pipelines,
            defaults,
            frame_buf,
            frame_bg,
            shadow_frame_bg,
            objects,
            shadow,
            shadow_sampler,
            env_sampler,
            model_sampler,
            models: Vec::new(),
            model_layouts: Vec::new(),
            environments: Vec::new(),
            bound_environment: None,
            floor,
            floor_sampler,
            floor_material,
            planes: HashMap::new(),
        })
    }

    pub fn device(&self) -> &Device {
        self.gpu.device()
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.gpu.surface_format()
    }

    pub fn resize(&mut self, size: SurfaceSize) {
        self.gpu.resize(size);
    }

    pub fn size(&self) -> SurfaceSize {
        self.gpu.size()
    }

    /// Upload every primitive, image and material of a decoded model.
    pub fn upload_model(&mut self, data: &ModelData) -> ModelId {
        let id = ModelId(self.models.len() as u32);
        let device = self.gpu.device();
        let queue = self.gpu.queue();

        let meshes = data
            .meshes
            .iter()
            .enumerate()
            .map(|(mi, mesh)| {
                mesh.primitives
                    .iter()
                    .enumerate()
                    .map(|(pi, p)| {
                        GpuMesh::upload(device, &format!("{} mesh {mi}.{pi}", data.label), &p.mesh)
                    })
                    .collect()
            })
            .collect();

        let images: Vec<GpuTexture> = data
            .images
            .iter()
            .enumerate()
            .map(|(i, img)| GpuTexture::upload(device, queue, &format!("{} image {i}", data.label), img))
            .collect();

        let materials = data
            .materials
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let color = m
                    .base_color_texture
                    .and_then(|t| images.get(t))
                    .map_or(&self.defaults.white_srgb.view, |t| &t.view);
                material::bind_group(
                    device,
                    &self.layouts.material,
                    &format!("{} material {i}", data.label),
                    &MaterialUniform::from_model(m),
                    MaterialMaps::color_only(color, &self.defaults),
                    &self.model_sampler,
                )
            })
            .collect();

        let default_material = material::bind_group(
            device,
            &self.layouts.material,
            &format!("{} default material", data.label),
            &MaterialUniform::from_model(&Default::default()),
            MaterialMaps::color_only(&self.defaults.white_srgb.view, &self.defaults),
            &self.model_sampler,
        );

        log::info!(
            "Uploaded model '{}' as {id:?}: {} meshes, {} materials, {} images",
            data.label,
            data.meshes.len(),
            data.materials.len(),
            images.len()
        );
        self.models.push(GpuModel {
            meshes,
            materials,
            default_material,
        });
        self.model_layouts.push(ModelLayout::from_data(data));
        id
    }

    /// Bind a floor map. The floor sampler follows the color map's sampling.
    pub fn set_floor_texture(&mut self, slot: TextureSlot, data: &TextureData) {
        let device = self.gpu.device();
        let label = format!("Floor {slot:?}");
        if self.floor.is_bound(slot) {
            log::warn!("Floor {slot:?} map replaced");
        }
        self.floor.set(slot, GpuTexture::upload(device, self.gpu.queue(), &label, data));
        if slot == TextureSlot::Color {
            self.floor_sampler = resources::sampler_for(device, "Floor sampler", data);
        }
        self.floor_material = material::bind_group(
            device,
            &self.layouts.material,
            "Floor material",
            &MaterialUniform::floor(),
            self.floor.maps(&self.defaults),
            &self.floor_sampler,
        );
        log::debug!("Floor {slot:?} map bound ({}×{})", data.width, data.height);
    }

    pub fn set_environment(&mut self, cube: &CubemapData) -> EnvironmentId {
        let id = EnvironmentId(self.environments.len() as u32);
        let tex = GpuTexture::upload_cube(
            self.gpu.device(),
            self.gpu.queue(),
            &format!("Environment {}", id.0),
            cube,
        );
        log::info!("Uploaded environment {id:?} ({} px faces)", cube.size);
        self.environments.push(tex);
        id
    }

    /// Render one frame of `scene`, then the overlay if any, and present.
    pub fn render(
        &mut self,
        scene: &SceneState,
        overlay: Option<&mut dyn Overlay>,
    ) -> Result<(), RenderError> {
        self.sync_frame_bindings(scene);

        let list = draw::collect(scene, &self.model_layouts);
        self.ensure_planes(&list);
        self.ensure_object_capacity(list.uniforms.len());

        let has_env = self.bound_environment.is_some();
        let frame_uniform = FrameUniform::from_scene(scene, has_env, self.shadow.size);
        let queue = self.gpu.queue();
        queue.write_buffer(&self.frame_buf, 0, bytemuck::bytes_of(&frame_uniform));
        queue.write_buffer(&self.objects.buffer, 0, &self.objects.bytes(&list.uniforms));

        let frame = self.gpu.acquire()?;
        let view = frame.texture.create_view(&Default::default());
        let device = self.gpu.device();
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("MainEncoder"),
        });

        if scene.light.cast_shadow {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("ShadowPass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.shadow.view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.shadow);
            pass.set_bind_group(0, &self.shadow_frame_bg, &[]);
            for d in list.shadow_casters() {
                self.draw_geometry(&mut pass, d);
            }
        }

        {
            let [r, g, b] = scene.background_color;
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: self.gpu.depth_view(),
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_bind_group(0, &self.frame_bg, &[]);

            pass.set_pipeline(&self.pipelines.lit);
            for d in &list.draws {
                let Pipeline::Lit(material) = d.pipeline else {
                    continue;
                };
                let Some(bg) = self.material(material) else {
                    continue;
                };
                pass.set_bind_group(2, bg, &[]);
                self.draw_geometry(&mut pass, d);
            }

            pass.set_pipeline(&self.pipelines.plane);
            for d in list.draws.iter().filter(|d| d.pipeline == Pipeline::Wave) {
                self.draw_geometry(&mut pass, d);
            }

            // Drawn last at the far plane, only where nothing else landed.
            if has_env {
                pass.set_pipeline(&self.pipelines.sky);
                pass.draw(0..3, 0..1);
            }
        }

        let mut extra = Vec::new();
        if let Some(overlay) = overlay {
            let target = OverlayTarget {
                device,
                queue: self.gpu.queue(),
                view: &view,
                size_in_pixels: self.gpu.size_in_pixels(),
                pixel_ratio: self.gpu.size().pixel_ratio,
            };
            extra = overlay.record(&target, &mut encoder);
        }

        self.gpu
            .queue()
            .submit(extra.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }

    /// Rebind the frame group when the environment or shadow map size moved.
    fn sync_frame_bindings(&mut self, scene: &SceneState) {
        let env = scene
            .environment()
            .filter(|id| (id.0 as usize) < self.environments.len());
        let shadow_size = scene.light.shadow.map_size.max(1);
        if env == self.bound_environment && shadow_size == self.shadow.size {
            return;
        }
        let device = self.gpu.device();
        if shadow_size != self.shadow.size {
            self.shadow = ShadowMap {
                view: resources::depth_view(device, "Shadow map", shadow_size, shadow_size, true),
                size: shadow_size,
            };
            log::debug!("Shadow map resized to {shadow_size}");
        }
        let env_view = env
            .and_then(|id| self.environments.get(id.0 as usize))
            .map_or(&self.defaults.black_cube.view, |t| &t.view);
        self.frame_bg = frame_bind_group(
            device,
            &self.layouts,
            &self.frame_buf,
            &self.shadow,
            &self.shadow_sampler,
            env_view,
            &self.env_sampler,
        );
        self.bound_environment = env;
    }

    fn ensure_planes(&mut self, list: &DrawList) {
        let device = self.gpu.device();
        for key in list.planes() {
            self.planes.entry(key).or_insert_with(|| {
                log::debug!(
                    "Building plane mesh {}×{} ({} segments)",
                    key.width(),
                    key.height(),
                    key.segments
                );
                GpuMesh::upload(
                    device,
                    "Plane",
                    &MeshData::plane(key.width(), key.height(), key.segments),
                )
            });
        }
    }

    fn ensure_object_capacity(&mut self, count: usize) {
        if count <= self.objects.capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!("Growing object buffer to {capacity} slots");
        self.objects = ObjectBuffer::new(self.gpu.device(), &self.layouts, capacity);
    }

    fn material(&self, material: MaterialRef) -> Option<&BindGroup> {
        match material {
            MaterialRef::Floor => Some(&self.floor_material),
            MaterialRef::Model { model, material } => {
                let gpu = self.models.get(model)?;
                Some(
                    material
                        .and_then(|m| gpu.materials.get(m))
                        .unwrap_or(&gpu.default_material),
                )
            }
        }
    }

    fn mesh(&self, geometry: Geometry) -> Option<&GpuMesh> {
        match geometry {
            Geometry::Plane(key) => self.planes.get(&key),
            Geometry::Primitive {
                model,
                mesh,
                primitive,
            } => self.models.get(model)?.meshes.get(mesh)?.get(primitive),
        }
    }

    fn draw_geometry(&self, pass: &mut RenderPass<'_>, d: &Draw) {
        let Some(mesh) = self.mesh(d.geometry) else {
            return;
        };
        pass.set_bind_group(1, &self.objects.bind_group, &[self.objects.offset(d.object)]);
        mesh.draw(pass);
    }
}

fn frame_bind_group(
    device: &Device,
    layouts: &Layouts,
    frame_buf: &Buffer,
    shadow: &ShadowMap,
    shadow_sampler: &Sampler,
    env_view: &TextureView,
    env_sampler: &Sampler,
) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Frame BG"),
        layout: &layouts.frame,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(env_view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(env_sampler),
            },
        ],
    })
}
