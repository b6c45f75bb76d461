//! Program introspection.
//!
//! After linking, the backend walks the program's uniform blocks and sampler
//! uniforms once and hands the frontend a [`ProgramReflection`]. Blocks are
//! assigned consecutive binding points and samplers consecutive texture
//! units, both in reflection order, so the frontend never deals in GL
//! locations.
//!
//! Uniform blocks must be declared `std140`; member offsets are computed
//! from that layout.

use glow::HasContext;
use tracing::trace;

use daub_gpu::{BlockUniform, ProgramReflection, TextureBinding, UniformBlock, UniformType};

/// glow has no uniform block count query, so walk the `UNIFORM_BLOCK`
/// program interface until an out-of-range index reports no properties.
fn uniform_block_count(gl: &glow::Context, program: glow::Program) -> u32 {
    let mut count = 0;
    loop {
        let props = unsafe {
            gl.get_program_resource_i32(
                program,
                glow::UNIFORM_BLOCK,
                count,
                &[glow::NUM_ACTIVE_VARIABLES],
            )
        };
        if props.is_empty() {
            break;
        }
        count += 1;
    }
    // The final out-of-range query queues an INVALID_VALUE; consume it.
    unsafe { gl.get_error() };
    count
}

pub(crate) fn reflect_program(gl: &glow::Context, program: glow::Program) -> ProgramReflection {
    let mut reflection = ProgramReflection::default();

    let block_count = uniform_block_count(gl, program);
    for block_index in 0..block_count {
        let name = unsafe { gl.get_active_uniform_block_name(program, block_index) };
        let byte_count = unsafe {
            gl.get_active_uniform_block_parameter_i32(
                program,
                block_index,
                glow::UNIFORM_BLOCK_DATA_SIZE,
            )
        } as usize;
        let member_count = unsafe {
            gl.get_active_uniform_block_parameter_i32(
                program,
                block_index,
                glow::UNIFORM_BLOCK_ACTIVE_UNIFORMS,
            )
        } as usize;
        let mut indices = vec![0i32; member_count];
        unsafe {
            gl.get_active_uniform_block_parameter_i32_slice(
                program,
                block_index,
                glow::UNIFORM_BLOCK_ACTIVE_UNIFORM_INDICES,
                &mut indices,
            );
        }
        // Member indices ascend in declaration order, which std140 layout
        // depends on.
        indices.sort_unstable();

        let mut uniforms = Vec::with_capacity(member_count);
        let mut cursor = 0usize;
        for index in indices {
            let Some(active) = (unsafe { gl.get_active_uniform(program, index as u32) }) else {
                continue;
            };
            let Some(uniform_type) = map_uniform_type(active.utype) else {
                continue;
            };
            let element_count = active.size.max(1) as usize;
            let (align, size) = std140_layout(uniform_type);
            let (align, array_stride) = if element_count > 1 {
                (align.max(16), align_up(size, 16))
            } else {
                (align, 0)
            };
            cursor = align_up(cursor, align);
            let span = if element_count > 1 {
                array_stride * element_count
            } else {
                size
            };
            uniforms.push(BlockUniform {
                name: member_name(&active.name),
                uniform_type,
                byte_offset: cursor,
                element_count,
                array_stride,
            });
            cursor += span;
        }

        // Binding points follow reflection order.
        unsafe { gl.uniform_block_binding(program, block_index, block_index) };
        trace!(block = %name, byte_count, uniforms = uniforms.len(), "reflected block");
        reflection.blocks.push(UniformBlock {
            name,
            binding_point: block_index,
            byte_count,
            uniforms,
        });
    }

    // Sampler uniforms get consecutive texture units in encounter order.
    let uniform_count = unsafe { gl.get_active_uniforms(program) };
    unsafe { gl.use_program(Some(program)) };
    for index in 0..uniform_count {
        let Some(active) = (unsafe { gl.get_active_uniform(program, index) }) else {
            continue;
        };
        if !is_sampler_type(active.utype) {
            continue;
        }
        let slot = reflection.textures.len() as u32;
        if let Some(location) = unsafe { gl.get_uniform_location(program, &active.name) } {
            unsafe { gl.uniform_1_i32(Some(&location), slot as i32) };
        }
        reflection.textures.push(TextureBinding {
            name: member_name(&active.name),
            slot,
        });
    }
    unsafe { gl.use_program(None) };

    reflection
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Strip a block instance prefix and the `[0]` suffix of array uniforms.
fn member_name(raw: &str) -> String {
    let raw = raw.strip_suffix("[0]").unwrap_or(raw);
    match raw.rfind('.') {
        Some(dot) => raw[dot + 1..].to_owned(),
        None => raw.to_owned(),
    }
}

/// Base alignment and size of one element under std140 rules.
fn std140_layout(uniform_type: UniformType) -> (usize, usize) {
    match uniform_type {
        UniformType::Float | UniformType::Int | UniformType::UInt | UniformType::Bool => (4, 4),
        UniformType::FloatVec2 | UniformType::IntVec2 | UniformType::UIntVec2 => (8, 8),
        UniformType::FloatVec3 | UniformType::IntVec3 | UniformType::UIntVec3 => (16, 12),
        UniformType::FloatVec4 | UniformType::IntVec4 | UniformType::UIntVec4 => (16, 16),
        // Matrices are arrays of vec4-aligned columns.
        UniformType::Mat2 => (16, 32),
        UniformType::Mat3 => (16, 48),
        UniformType::Mat4 => (16, 64),
    }
}

fn map_uniform_type(gl_type: u32) -> Option<UniformType> {
    Some(match gl_type {
        glow::FLOAT => UniformType::Float,
        glow::FLOAT_VEC2 => UniformType::FloatVec2,
        glow::FLOAT_VEC3 => UniformType::FloatVec3,
        glow::FLOAT_VEC4 => UniformType::FloatVec4,
        glow::INT => UniformType::Int,
        glow::INT_VEC2 => UniformType::IntVec2,
        glow::INT_VEC3 => UniformType::IntVec3,
        glow::INT_VEC4 => UniformType::IntVec4,
        glow::UNSIGNED_INT => UniformType::UInt,
        glow::UNSIGNED_INT_VEC2 => UniformType::UIntVec2,
        glow::UNSIGNED_INT_VEC3 => UniformType::UIntVec3,
        glow::UNSIGNED_INT_VEC4 => UniformType::UIntVec4,
        glow::BOOL => UniformType::Bool,
        glow::FLOAT_MAT2 => UniformType::Mat2,
        glow::FLOAT_MAT3 => UniformType::Mat3,
        glow::FLOAT_MAT4 => UniformType::Mat4,
        _ => return None,
    })
}

fn is_sampler_type(gl_type: u32) -> bool {
    matches!(
        gl_type,
        glow::SAMPLER_2D
            | glow::SAMPLER_3D
            | glow::SAMPLER_CUBE
            | glow::SAMPLER_2D_SHADOW
            | glow::SAMPLER_2D_ARRAY
            | glow::SAMPLER_2D_ARRAY_SHADOW
            | glow::SAMPLER_CUBE_SHADOW
            | glow::INT_SAMPLER_2D
            | glow::INT_SAMPLER_3D
            | glow::INT_SAMPLER_CUBE
            | glow::UNSIGNED_INT_SAMPLER_2D
            | glow::UNSIGNED_INT_SAMPLER_3D
            | glow::UNSIGNED_INT_SAMPLER_CUBE
    )
}
