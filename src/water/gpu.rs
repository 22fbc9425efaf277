//! GPU water simulator built on full-screen render passes.

use std::sync::{mpsc, Arc};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{PingPong, WaveOperators};
use crate::error::GpuError;
use crate::render::TextureHandle;

/// Texel format of both simulation buffers.
pub const WATER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

const TEXEL_BYTES: u32 = 16;

/// Parameters of a single operator, uploaded once per call.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct WaterParams {
    /// Drop center in `[-1, 1]` surface coordinates.
    pub center: [f32; 2],
    pub radius: f32,
    pub strength: f32,
    /// One texel in UV units.
    pub delta: [f32; 2],
    pub _pad: [f32; 2],
}

/// Operator shaders. Every fragment entry point reads the bound texture and
/// writes the full target; the vertex stage emits one oversized triangle.
pub const WATER_SHADER: &str = r#"
const PI: f32 = 3.141592653589793;
const WAVE_SPEED: f32 = 2.0;
const WAVE_DAMPING: f32 = 0.995;

struct Params {
    center: vec2<f32>,
    radius: f32,
    strength: f32,
    delta: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0)
var water: texture_2d<f32>;
@group(0) @binding(1)
var<uniform> params: Params;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    return vec4<f32>(positions[vertex_index], 0.0, 1.0);
}

fn texel_at(coord: vec2<i32>) -> vec4<f32> {
    let size = vec2<i32>(textureDimensions(water));
    return textureLoad(water, clamp(coord, vec2<i32>(0), size - 1), 0);
}

fn uv_of(position: vec4<f32>) -> vec2<f32> {
    return position.xy / vec2<f32>(textureDimensions(water));
}

@fragment
fn fs_drop(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    var info = texel_at(vec2<i32>(position.xy));
    var bump = max(0.0, 1.0 - length(params.center * 0.5 + 0.5 - uv_of(position)) / params.radius);
    bump = 0.5 - cos(bump * PI) * 0.5;
    info.r += bump * params.strength;
    return info;
}

@fragment
fn fs_step(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let coord = vec2<i32>(position.xy);
    var info = texel_at(coord);
    let average = (
        texel_at(coord - vec2<i32>(1, 0)).r +
        texel_at(coord + vec2<i32>(1, 0)).r +
        texel_at(coord - vec2<i32>(0, 1)).r +
        texel_at(coord + vec2<i32>(0, 1)).r
    ) * 0.25;
    info.g += (average - info.r) * WAVE_SPEED;
    info.g *= WAVE_DAMPING;
    info.r += info.g;
    return info;
}

@fragment
fn fs_normals(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let coord = vec2<i32>(position.xy);
    var info = texel_at(coord);
    let dx = vec3<f32>(params.delta.x, texel_at(coord + vec2<i32>(1, 0)).r - info.r, 0.0);
    let dy = vec3<f32>(0.0, texel_at(coord + vec2<i32>(0, 1)).r - info.r, params.delta.y);
    let normal = normalize(cross(dy, dx));
    info.b = normal.x;
    info.a = normal.z;
    return info;
}
"#;

/// One slot of the ping-pong pair.
struct WaterTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl WaterTexture {
    fn new(device: &wgpu::Device, resolution: u32, index: usize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("Water Texture {}", index)),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: WATER_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Water height field on the GPU.
///
/// Operators record render passes into a caller-supplied encoder and swap
/// immediately, so [`particle_texture`](Self::particle_texture) always names
/// the slot written by the last recorded operator. Consumers sample it after
/// the encoder is submitted on the same queue.
pub struct WaterSim {
    resolution: u32,
    textures: PingPong<WaterTexture>,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    drop_pipeline: wgpu::RenderPipeline,
    step_pipeline: wgpu::RenderPipeline,
    normals_pipeline: wgpu::RenderPipeline,
    operations: u64,
}

impl WaterSim {
    /// Whether the adapter can render to and sample from [`WATER_FORMAT`].
    pub fn is_supported(adapter: &wgpu::Adapter) -> bool {
        let features = adapter.get_texture_format_features(WATER_FORMAT);
        features.allowed_usages.contains(
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    /// Allocate a flat `resolution²` surface and the operator pipelines.
    pub fn new(device: &wgpu::Device, resolution: u32) -> Result<Self, GpuError> {
        if resolution == 0 {
            return Err(GpuError::ResourceAllocation(
                "water resolution must be non-zero".to_string(),
            ));
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let textures = PingPong::from_fn(|index| WaterTexture::new(device, resolution, index));

        // Float32 textures are not filterable without an extra feature.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Water Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Water Shader"),
            source: wgpu::ShaderSource::Wgsl(WATER_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Water Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Water Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let drop_pipeline = create_operator_pipeline(device, &pipeline_layout, &shader, "fs_drop");
        let step_pipeline = create_operator_pipeline(device, &pipeline_layout, &shader, "fs_step");
        let normals_pipeline =
            create_operator_pipeline(device, &pipeline_layout, &shader, "fs_normals");

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(GpuError::ResourceAllocation(err.to_string()));
        }

        tracing::info!(resolution, "water simulator ready");

        Ok(Self {
            resolution,
            textures,
            sampler,
            bind_group_layout,
            drop_pipeline,
            step_pipeline,
            normals_pipeline,
            operations: 0,
        })
    }

    /// Edge length of both textures, in texels.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Total operators recorded so far.
    pub fn operations(&self) -> u64 {
        self.operations
    }

    /// Index of the slot a consumer should sample, 0 or 1.
    pub fn current_index(&self) -> usize {
        self.textures.current_index()
    }

    /// The current slot, ready to bind for sampling.
    pub fn particle_texture(&self) -> TextureHandle<'_> {
        TextureHandle {
            view: &self.textures.current().view,
            sampler: &self.sampler,
        }
    }

    /// Add a cosine bump centered at `(x, y)` in `[-1, 1]` surface coordinates.
    pub fn drop(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        x: f32,
        y: f32,
        radius: f32,
        strength: f32,
    ) {
        let params = WaterParams {
            center: [x, y],
            radius,
            strength,
            ..self.base_params()
        };
        self.run(device, encoder, Operator::Drop, params);
    }

    /// Advance the wave equation by one step.
    pub fn step(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder) {
        let params = self.base_params();
        self.run(device, encoder, Operator::Step, params);
    }

    /// Recompute the normal channels from the current heights.
    pub fn normals(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder) {
        let params = self.base_params();
        self.run(device, encoder, Operator::Normals, params);
    }

    fn base_params(&self) -> WaterParams {
        let delta = 1.0 / self.resolution as f32;
        WaterParams {
            delta: [delta, delta],
            ..WaterParams::default()
        }
    }

    fn run(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        operator: Operator,
        params: WaterParams,
    ) {
        // A fresh buffer per call keeps parameters distinct within one encoder.
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Water Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Water Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.textures.current().view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline = match operator {
            Operator::Drop => &self.drop_pipeline,
            Operator::Step => &self.step_pipeline,
            Operator::Normals => &self.normals_pipeline,
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(operator.label()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.textures.next().view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.textures.swap();
        self.operations += 1;
    }

    /// Copy the current slot back to the host, row-major.
    ///
    /// Work recorded into other encoders must be submitted first.
    pub fn read_current(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<[f32; 4]>, GpuError> {
        let row_bytes = self.resolution * TEXEL_BYTES;
        let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Water Readback Buffer"),
            size: padded_row_bytes as u64 * self.resolution as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Water Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.textures.current().texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(self.resolution),
                },
            },
            wgpu::Extent3d {
                width: self.resolution,
                height: self.resolution,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(Some(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|err| GpuError::BufferMapping(err.to_string()))?
            .map_err(|err| GpuError::BufferMapping(err.to_string()))?;

        let mut texels = Vec::with_capacity((self.resolution * self.resolution) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in data.chunks_exact(padded_row_bytes as usize) {
                texels.extend(
                    row[..row_bytes as usize]
                        .chunks_exact(TEXEL_BYTES as usize)
                        .map(bytemuck::pod_read_unaligned::<[f32; 4]>),
                );
            }
        }
        staging_buffer.unmap();

        Ok(texels)
    }
}

#[derive(Clone, Copy, Debug)]
enum Operator {
    Drop,
    Step,
    Normals,
}

impl Operator {
    fn label(self) -> &'static str {
        match self {
            Operator::Drop => "Water Drop Pass",
            Operator::Step => "Water Step Pass",
            Operator::Normals => "Water Normals Pass",
        }
    }
}

fn create_operator_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    entry_point: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(entry_point),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(entry_point),
            targets: &[Some(wgpu::ColorTargetState {
                format: WATER_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// A [`WaterSim`] bundled with its device and queue so a scene can drive it
/// through [`WaveOperators`].
///
/// Operators accumulate in one pending encoder until [`submit`](WaveOperators::submit).
pub struct GpuWaterLane {
    sim: WaterSim,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    encoder: Option<wgpu::CommandEncoder>,
}

impl GpuWaterLane {
    /// Wrap an existing simulator and the device it was created on.
    pub fn new(sim: WaterSim, device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            sim,
            device,
            queue,
            encoder: None,
        }
    }

    /// Open the default adapter and build a lane on it.
    pub fn request(resolution: u32) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        if !WaterSim::is_supported(&adapter) {
            return Err(GpuError::UnsupportedFormat(WATER_FORMAT));
        }

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Water Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))?;
        tracing::info!(adapter = ?adapter.get_info().name, "GPU water lane opened");

        let sim = WaterSim::new(&device, resolution)?;
        Ok(Self::new(sim, Arc::new(device), Arc::new(queue)))
    }

    /// The wrapped simulator.
    pub fn sim(&self) -> &WaterSim {
        &self.sim
    }

    /// Submit pending work and read the current slot back.
    pub fn read_current(&mut self) -> Result<Vec<[f32; 4]>, GpuError> {
        self.submit();
        self.sim.read_current(&self.device, &self.queue)
    }

    /// Record one operator into the pending encoder, opening it if needed.
    fn record(&mut self, op: impl FnOnce(&mut WaterSim, &wgpu::Device, &mut wgpu::CommandEncoder)) {
        let device: &wgpu::Device = &self.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Water Encoder"),
            })
        });
        op(&mut self.sim, device, encoder);
    }
}

impl WaveOperators for GpuWaterLane {
    fn add_drop(&mut self, x: f32, y: f32, radius: f32, strength: f32) {
        self.record(|sim, device, encoder| sim.drop(device, encoder, x, y, radius, strength));
    }

    fn step(&mut self) {
        self.record(|sim, device, encoder| sim.step(device, encoder));
    }

    fn normals(&mut self) {
        self.record(|sim, device, encoder| sim.normals(device, encoder));
    }

    fn operations(&self) -> u64 {
        self.sim.operations()
    }

    fn submit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    /// A device on any available adapter, or `None` on machines without one.
    fn test_device() -> Option<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Water Test Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .ok()?;
        Some((adapter, device, queue))
    }

    #[test]
    fn test_water_shader_validates() {
        validate_wgsl(WATER_SHADER).unwrap();
    }

    #[test]
    fn test_shader_has_every_operator() {
        for entry in ["vs_main", "fs_drop", "fs_step", "fs_normals"] {
            assert!(WATER_SHADER.contains(&format!("fn {entry}(")), "missing {entry}");
        }
    }

    #[test]
    fn test_params_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<WaterParams>(), 32);
    }

    #[test]
    fn test_gpu_operators_match_cpu() {
        use crate::water::CpuWaterSim;

        let Some((adapter, device, queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };
        if !WaterSim::is_supported(&adapter) {
            eprintln!("adapter cannot render {WATER_FORMAT:?}, skipping");
            return;
        }

        let resolution = 32;
        let mut gpu = WaterSim::new(&device, resolution).unwrap();
        let mut cpu = CpuWaterSim::new(resolution);
        assert_eq!(gpu.current_index(), 0);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Water Test Encoder"),
        });
        gpu.drop(&device, &mut encoder, 0.2, -0.1, 0.2, 0.5);
        gpu.drop(&device, &mut encoder, -0.5, 0.4, 0.1, -0.3);
        gpu.step(&device, &mut encoder);
        gpu.normals(&device, &mut encoder);
        queue.submit(Some(encoder.finish()));

        cpu.drop(0.2, -0.1, 0.2, 0.5);
        cpu.drop(-0.5, 0.4, 0.1, -0.3);
        cpu.step();
        cpu.normals();

        assert_eq!(gpu.operations(), 4);
        assert_eq!(gpu.current_index(), 0);

        let texels = gpu.read_current(&device, &queue).unwrap();
        assert_eq!(texels.len(), cpu.current().len());
        for (g, c) in texels.iter().zip(cpu.current()) {
            for channel in 0..4 {
                assert!((g[channel] - c[channel]).abs() < 1e-3, "{g:?} vs {c:?}");
            }
        }
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        let Some((_, device, _)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };
        assert!(matches!(
            WaterSim::new(&device, 0),
            Err(GpuError::ResourceAllocation(_))
        ));
    }
}
