//! The static full-screen quad the camera image is drawn on.

/// Clip-space corners, drawn as a triangle strip: top-left, bottom-left,
/// top-right, bottom-right.
pub const QUAD_VERTICES: [[f32; 2]; 4] =
    [[-1.0, 1.0], [-1.0, -1.0], [1.0, 1.0], [1.0, -1.0]];

/// Number of vertices in [`QUAD_VERTICES`].
pub const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

/// Texture coordinate the passthrough shader derives from a quad corner.
///
/// CPU mirror of `passthrough_uv` in `modules/quad.wgsl`: Y is flipped so
/// the top of the screen samples the first image row.
#[must_use]
pub fn passthrough_tex_coord(position: [f32; 2]) -> [f32; 2] {
    [0.5 * position[0] + 0.5, 0.5 * -position[1] + 0.5]
}

/// Vertex buffer layout: one tightly packed `vec2<f32>` at location 0.
pub const fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
        wgpu::vertex_attr_array![0 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: size_of::<[f32; 2]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}
