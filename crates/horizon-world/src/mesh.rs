//! Grid mesh construction from height fields.
//!
//! A chunk mesh is a regular grid centered on the chunk origin. Detail
//! level `n` keeps every [`simplification_step`]-th sample along each axis,
//! so coarser levels share their border vertices with level 0.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use horizon_common::{ConfigError, GenerationError};
use serde::{Deserialize, Serialize};

use crate::height_field::HeightField;
use crate::lod::simplification_step;

/// Piecewise-linear remap applied to normalized heights before scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightCurve {
    keys: Vec<[f32; 2]>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl HeightCurve {
    /// Identity curve on `[0, 1]`.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            keys: vec![[0.0, 0.0], [1.0, 1.0]],
        }
    }

    /// Curve through `(time, value)` keys, ascending by time.
    pub fn new(keys: Vec<[f32; 2]>) -> Result<Self, ConfigError> {
        let curve = Self { keys };
        curve.validate()?;
        Ok(curve)
    }

    /// Checks key ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, pair) in self.keys.windows(2).enumerate() {
            if pair[1][0] < pair[0][0] {
                return Err(ConfigError::UnsortedCurve(index + 1));
            }
        }
        Ok(())
    }

    /// Curve keys.
    #[must_use]
    pub fn keys(&self) -> &[[f32; 2]] {
        &self.keys
    }

    /// Evaluates the curve, holding the end values outside the key range.
    #[must_use]
    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return t;
        };
        if t <= first[0] {
            return first[1];
        }
        if t >= last[0] {
            return last[1];
        }
        for pair in self.keys.windows(2) {
            let ([t0, v0], [t1, v1]) = (pair[0], pair[1]);
            if t <= t1 {
                if t1 <= t0 {
                    return v1;
                }
                let f = (t - t0) / (t1 - t0);
                return v0 + (v1 - v0) * f;
            }
        }
        last[1]
    }
}

/// Mesh vertex layout handed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// Local position (chunk origin at 0, 0, 0)
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// Texture coordinate into the chunk's color field
    pub uv: [f32; 2],
}

/// Renderable geometry for one chunk at one detail level.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Detail level this mesh was built for
    pub lod: u32,
    /// Vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw vertex bytes for buffer upload.
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index bytes for buffer upload.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Height multiplier and curve used when meshing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// World units of elevation at normalized height 1.0 after the curve
    pub height_multiplier: f32,
    /// Remap curve
    pub height_curve: HeightCurve,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            height_multiplier: 30.0,
            height_curve: HeightCurve::new(vec![[0.0, 0.0], [0.4, 0.05], [1.0, 1.0]])
                .unwrap_or_default(),
        }
    }
}

/// Builds a mesh of `field` at detail level `lod`.
pub fn build_mesh(
    field: &HeightField,
    height_multiplier: f32,
    curve: &HeightCurve,
    lod: u32,
) -> Result<MeshData, GenerationError> {
    let width = field.width();
    let height = field.height();
    let unsupported = GenerationError::UnsupportedDetailLevel { width, height, level: lod };
    let Some(step) = simplification_step(lod) else {
        return Err(unsupported);
    };
    let step = step as usize;

    if width < 2 || height < 2 || (width - 1) % step != 0 || (height - 1) % step != 0 {
        return Err(unsupported);
    }

    let per_row = (width - 1) / step + 1;
    let per_col = (height - 1) / step + 1;
    let top_left_x = (width - 1) as f32 / -2.0;
    let top_left_z = (height - 1) as f32 / 2.0;

    let mut vertices = Vec::with_capacity(per_row * per_col);
    let mut indices = Vec::with_capacity((per_row - 1) * (per_col - 1) * 6);

    for y in (0..height).step_by(step) {
        for x in (0..width).step_by(step) {
            let sample = field.get(x, y).ok_or_else(|| unsupported.clone())?;
            vertices.push(Vertex {
                position: [
                    top_left_x + x as f32,
                    curve.evaluate(sample) * height_multiplier,
                    top_left_z - y as f32,
                ],
                normal: [0.0, 0.0, 0.0],
                uv: [x as f32 / width as f32, y as f32 / height as f32],
            });
        }
    }

    for row in 0..per_col - 1 {
        for col in 0..per_row - 1 {
            let a = (row * per_row + col) as u32;
            let right = a + 1;
            let below = a + per_row as u32;
            let diagonal = below + 1;
            indices.extend_from_slice(&[a, diagonal, below, diagonal, a, right]);
        }
    }

    compute_normals(&mut vertices, &indices);

    Ok(MeshData { lod, vertices, indices })
}

/// Area-weighted vertex normals from the triangle list.
fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accum = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa = Vec3::from(vertices[a].position);
        let pb = Vec3::from(vertices[b].position);
        let pc = Vec3::from(vertices[c].position);
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }
    for (vertex, normal) in vertices.iter_mut().zip(accum) {
        vertex.normal = normal.normalize_or_zero().to_array();
    }
}
