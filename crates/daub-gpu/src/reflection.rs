//! Shader program reflection data.
//!
//! Backends introspect a linked program once at creation and hand back a
//! [`ProgramReflection`] describing its uniform blocks and texture uniforms.
//! The device uses it to size per-pipeline block storage and to translate
//! `(block name, uniform name)` lookups into byte offsets.

/// Data type of a reflected uniform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    Int,
    IntVec2,
    IntVec3,
    IntVec4,
    UInt,
    UIntVec2,
    UIntVec3,
    UIntVec4,
    Bool,
    Mat2,
    Mat3,
    Mat4,
}

impl UniformType {
    /// Size of one element of this type in std140 storage, excluding any
    /// array or padding considerations.
    pub fn byte_count(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::UInt | Self::Bool => 4,
            Self::FloatVec2 | Self::IntVec2 | Self::UIntVec2 => 8,
            Self::FloatVec3 | Self::IntVec3 | Self::UIntVec3 => 12,
            Self::FloatVec4 | Self::IntVec4 | Self::UIntVec4 => 16,
            Self::Mat2 => 32,
            Self::Mat3 => 48,
            Self::Mat4 => 64,
        }
    }
}

/// One uniform inside a uniform block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockUniform {
    pub name: String,
    pub uniform_type: UniformType,
    /// Byte offset within the block, as laid out by the shader compiler.
    pub byte_offset: usize,
    /// Element count; greater than one for arrays.
    pub element_count: usize,
    /// Byte stride between array elements; zero for non-arrays.
    pub array_stride: usize,
}

/// One uniform block of a linked program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformBlock {
    pub name: String,
    /// Binding point the block was assigned at link time. Blocks are bound
    /// to consecutive points in reflection order.
    pub binding_point: u32,
    pub byte_count: usize,
    pub uniforms: Vec<BlockUniform>,
}

impl UniformBlock {
    pub fn uniform(&self, name: &str) -> Option<&BlockUniform> {
        self.uniforms.iter().find(|u| u.name == name)
    }
}

/// One sampler uniform of a linked program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureBinding {
    pub name: String,
    /// Texture unit the sampler was assigned at link time, in reflection
    /// order.
    pub slot: u32,
}

/// Everything the device needs to know about a linked program's interface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramReflection {
    pub blocks: Vec<UniformBlock>,
    pub textures: Vec<TextureBinding>,
}

impl ProgramReflection {
    pub fn block(&self, name: &str) -> Option<(usize, &UniformBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.name == name)
    }

    pub fn texture(&self, name: &str) -> Option<(usize, &TextureBinding)> {
        self.textures
            .iter()
            .enumerate()
            .find(|(_, t)| t.name == name)
    }
}
