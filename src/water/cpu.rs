//! CPU rendition of the water operators.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use super::{PingPong, WaveOperators, WAVE_DAMPING, WAVE_SPEED};

/// Height field simulated on the CPU.
///
/// Texel `(i, j)` lives at index `j * width + i` and is centered at
/// `((i + 0.5) / width, (j + 0.5) / height)` in surface UV space. Reads
/// outside the grid clamp to the nearest edge texel.
#[derive(Clone, Debug)]
pub struct CpuWaterSim {
    width: u32,
    height: u32,
    buffers: PingPong<Vec<[f32; 4]>>,
    operations: u64,
}

impl CpuWaterSim {
    /// A flat, still square surface of `resolution²` texels.
    pub fn new(resolution: u32) -> Self {
        Self::with_size(resolution, resolution)
    }

    /// A flat `width` by `height` surface.
    pub fn with_size(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            buffers: PingPong::from_fn(|_| vec![[0.0; 4]; len]),
            operations: 0,
        }
    }

    /// Grid width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texels of the current buffer.
    pub fn current(&self) -> &[[f32; 4]] {
        self.buffers.current()
    }

    /// Index of the current slot, 0 or 1.
    pub fn current_index(&self) -> usize {
        self.buffers.current_index()
    }

    /// Current texel at `(i, j)`, clamped to the grid.
    pub fn texel(&self, i: i64, j: i64) -> [f32; 4] {
        read_clamped(self.buffers.current(), self.width, self.height, i, j)
    }

    /// Sum of heights over the grid.
    pub fn total_height(&self) -> f32 {
        self.buffers.current().iter().map(|t| t[0]).sum()
    }

    /// Apply `op` to every texel, reading current and writing next.
    fn apply(&mut self, op: impl Fn(&[[f32; 4]], i64, i64) -> [f32; 4]) {
        let (width, height) = (self.width, self.height);
        let (src, dst) = self.buffers.split();
        for j in 0..height as i64 {
            for i in 0..width as i64 {
                dst[(j * width as i64 + i) as usize] = op(src, i, j);
            }
        }
        self.buffers.swap();
        self.operations += 1;
    }
}

fn read_clamped(texels: &[[f32; 4]], width: u32, height: u32, i: i64, j: i64) -> [f32; 4] {
    if texels.is_empty() {
        return [0.0; 4];
    }
    let i = i.clamp(0, width as i64 - 1);
    let j = j.clamp(0, height as i64 - 1);
    texels[(j * width as i64 + i) as usize]
}

impl CpuWaterSim {
    /// Add a cosine bump centered at `(x, y)` in `[-1, 1]` surface coordinates.
    pub fn drop(&mut self, x: f32, y: f32, radius: f32, strength: f32) {
        let (width, height) = (self.width, self.height);
        let center = Vec2::new(x, y) * 0.5 + 0.5;
        self.apply(|src, i, j| {
            let mut texel = read_clamped(src, width, height, i, j);
            let uv = Vec2::new(
                (i as f32 + 0.5) / width as f32,
                (j as f32 + 0.5) / height as f32,
            );
            let bump = (1.0 - center.distance(uv) / radius).max(0.0);
            let bump = 0.5 - (bump * PI).cos() * 0.5;
            texel[0] += bump * strength;
            texel
        });
    }

    /// Advance the wave equation by one step.
    pub fn step(&mut self) {
        let (width, height) = (self.width, self.height);
        self.apply(|src, i, j| {
            let read = |di: i64, dj: i64| read_clamped(src, width, height, i + di, j + dj);
            let mut texel = read(0, 0);
            let average = (read(-1, 0)[0] + read(1, 0)[0] + read(0, -1)[0] + read(0, 1)[0]) * 0.25;
            texel[1] += (average - texel[0]) * WAVE_SPEED;
            texel[1] *= WAVE_DAMPING;
            texel[0] += texel[1];
            texel
        });
    }

    /// Recompute the normal channels from the current heights.
    pub fn normals(&mut self) {
        let (width, height) = (self.width, self.height);
        let delta = Vec2::new(1.0 / width as f32, 1.0 / height as f32);
        self.apply(|src, i, j| {
            let read = |di: i64, dj: i64| read_clamped(src, width, height, i + di, j + dj);
            let mut texel = read(0, 0);
            let dx = Vec3::new(delta.x, read(1, 0)[0] - texel[0], 0.0);
            let dy = Vec3::new(0.0, read(0, 1)[0] - texel[0], delta.y);
            let normal = dy.cross(dx).normalize_or_zero();
            texel[2] = normal.x;
            texel[3] = normal.z;
            texel
        });
    }

    /// Total operators applied so far.
    pub fn operations(&self) -> u64 {
        self.operations
    }
}

impl WaveOperators for CpuWaterSim {
    fn add_drop(&mut self, x: f32, y: f32, radius: f32, strength: f32) {
        self.drop(x, y, radius, strength);
    }

    fn step(&mut self) {
        CpuWaterSim::step(self);
    }

    fn normals(&mut self) {
        CpuWaterSim::normals(self);
    }

    fn operations(&self) -> u64 {
        CpuWaterSim::operations(self)
    }
}
