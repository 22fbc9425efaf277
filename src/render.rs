//! Narrow interfaces to the rendering collaborator.
//!
//! The simulation core never rasterizes anything itself. Agents describe what
//! to draw through [`DrawSink`], read per-frame camera and timing data from
//! [`FrameUniforms`], and the water simulator hands its output over as a
//! [`TextureHandle`].

use glam::{Mat4, Vec3};

/// Which pass a draw call is submitted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// Geometry pass of the deferred pipeline.
    GBuffer,
    /// Forward pass for transparent and water geometry.
    Forward,
    /// Shadow map pass.
    Shadow,
}

/// Material slots known to the material system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Material {
    Fish,
    Shark,
    Crab,
    Kelp,
    /// Depth-only material used for shadow casting.
    ShadowCaster,
}

/// Primitive topology of a draw call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineStrip,
}

/// A light as seen by the shading collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightDescriptor {
    pub position: Vec3,
    pub color: Vec3,
    pub attenuation: f32,
}

/// Per-frame values shared by every draw call.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameUniforms {
    /// Animation time in seconds.
    pub elapsed: f32,
    /// Frame delta in seconds.
    pub delta: f32,
    /// Camera-to-world transform.
    pub camera_world: Mat4,
    /// World-to-camera transform.
    pub camera_inverse: Mat4,
    pub projection: Mat4,
    pub lights: Vec<LightDescriptor>,
}

impl FrameUniforms {
    /// Uniforms for a camera placed by its world transform.
    pub fn new(camera_world: Mat4, projection: Mat4) -> Self {
        Self {
            elapsed: 0.0,
            delta: 0.0,
            camera_world,
            camera_inverse: camera_world.inverse(),
            projection,
            lights: Vec::new(),
        }
    }

    /// Move the camera, keeping the inverse in sync.
    pub fn set_camera(&mut self, camera_world: Mat4) {
        self.camera_world = camera_world;
        self.camera_inverse = camera_world.inverse();
    }

    /// Camera position in world space.
    pub fn camera_position(&self) -> Vec3 {
        self.camera_world.w_axis.truncate()
    }
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// Receiver of draw calls.
pub trait DrawSink {
    /// Submit one piece of geometry.
    fn draw(
        &mut self,
        target: RenderTarget,
        uniforms: &FrameUniforms,
        transform: Mat4,
        material: Material,
        topology: Topology,
    );

    /// Submit the same geometry once per transform.
    ///
    /// Sinks backed by an instanced pipeline should override this.
    fn draw_instanced(
        &mut self,
        target: RenderTarget,
        uniforms: &FrameUniforms,
        transforms: &[Mat4],
        material: Material,
        topology: Topology,
    ) {
        for &transform in transforms {
            self.draw(target, uniforms, transform, material, topology);
        }
    }
}

/// A recorded draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRecord {
    pub target: RenderTarget,
    pub transform: Mat4,
    pub material: Material,
    pub topology: Topology,
}

/// A sink that keeps every call, for headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<DrawRecord>,
}

impl RecordingSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded calls matching `target` and `material`.
    pub fn count(&self, target: RenderTarget, material: Material) -> usize {
        self.calls
            .iter()
            .filter(|c| c.target == target && c.material == material)
            .count()
    }
}

impl DrawSink for RecordingSink {
    fn draw(
        &mut self,
        target: RenderTarget,
        _uniforms: &FrameUniforms,
        transform: Mat4,
        material: Material,
        topology: Topology,
    ) {
        self.calls.push(DrawRecord {
            target,
            transform,
            material,
            topology,
        });
    }
}

/// A sampled texture handed to the material system.
///
/// The handle borrows the simulator, so it cannot outlive the next operator
/// call that changes which buffer is current.
#[derive(Clone, Copy, Debug)]
pub struct TextureHandle<'a> {
    pub view: &'a wgpu::TextureView,
    pub sampler: &'a wgpu::Sampler,
}

impl<'a> TextureHandle<'a> {
    /// Bind group entries placing this texture on texture unit `unit`:
    /// the view at binding `2 * unit`, the sampler at `2 * unit + 1`.
    pub fn activate(&self, unit: u32) -> [wgpu::BindGroupEntry<'a>; 2] {
        [
            wgpu::BindGroupEntry {
                binding: unit * 2,
                resource: wgpu::BindingResource::TextureView(self.view),
            },
            wgpu::BindGroupEntry {
                binding: unit * 2 + 1,
                resource: wgpu::BindingResource::Sampler(self.sampler),
            },
        ]
    }
}
