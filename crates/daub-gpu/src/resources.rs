//! Device-side resource records.
//!
//! These are the values stored in the device's registries. They pair the
//! backend's opaque raw ids with whatever bookkeeping the frontend needs:
//! reflection for programs, packed state and uniform staging for pipelines,
//! resolve tracking for render targets.

use crate::backend::RawId;
use crate::reflection::ProgramReflection;
use crate::registry::Handle;
use crate::state::StateWord;
use crate::types::{BufferUsage, Rect, SamplerSettings, TextureFormat};

pub type ProgramId = Handle<Program>;
pub type PipelineId = Handle<Pipeline>;
pub type VertexBufferId = Handle<VertexBuffer>;
pub type IndexBufferId = Handle<IndexBuffer>;
pub type MeshId = Handle<Mesh>;
pub type TextureId = Handle<Texture>;
pub type SamplerId = Handle<Sampler>;
pub type RenderTargetId = Handle<RenderTarget>;

#[derive(Debug)]
pub struct Program {
    pub raw: RawId,
    pub reflection: ProgramReflection,
    /// Pipelines currently built on this program. Destroying a referenced
    /// program is an error.
    pub pipeline_count: usize,
}

/// CPU staging copy of one uniform block, written by variable setters and
/// copied into the frame arena at draw time.
#[derive(Clone, Debug)]
pub struct BlockStorage {
    pub binding_point: u32,
    pub data: Vec<u8>,
}

/// One texture unit of a pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextureSlot {
    pub texture: Option<TextureId>,
    pub sampler: Option<SamplerId>,
}

#[derive(Debug)]
pub struct Pipeline {
    pub program: ProgramId,
    pub state: StateWord,
    pub viewport: Rect,
    pub scissor: Option<Rect>,
    /// One entry per uniform block of the program, in reflection order.
    pub blocks: Vec<BlockStorage>,
    /// One entry per sampler uniform of the program, in reflection order.
    pub textures: Vec<TextureSlot>,
}

/// Value handle into one uniform of one pipeline's block storage, resolved
/// once by name and then used for direct writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineVariable {
    pub(crate) pipeline: PipelineId,
    pub(crate) block: usize,
    pub(crate) byte_offset: usize,
    pub(crate) byte_count: usize,
}

/// Value handle into one texture unit of a pipeline, resolved once by
/// sampler uniform name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineTextureSlot {
    pub(crate) pipeline: PipelineId,
    pub(crate) slot: usize,
}

#[derive(Debug)]
pub struct VertexBuffer {
    pub raw: RawId,
    pub byte_count: usize,
    pub usage: BufferUsage,
}

/// Index data is always 32-bit.
#[derive(Debug)]
pub struct IndexBuffer {
    pub raw: RawId,
    pub index_count: usize,
    pub usage: BufferUsage,
}

#[derive(Debug)]
pub struct Mesh {
    pub raw: RawId,
    pub vertex_buffers: Vec<VertexBufferId>,
    pub index_buffer: Option<IndexBufferId>,
}

#[derive(Debug)]
pub struct Texture {
    pub raw: RawId,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TextureFormat,
    /// Set when this texture is an attachment of a render target; sampling
    /// it may require a pending multisample resolve first.
    pub owner: Option<RenderTargetId>,
}

#[derive(Debug)]
pub struct Sampler {
    pub raw: RawId,
    pub settings: SamplerSettings,
}

#[derive(Debug)]
pub struct RenderTarget {
    pub fbo: RawId,
    pub msaa_fbo: Option<RawId>,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub color_attachment_count: u32,
    pub has_depth: bool,
    /// Attachment textures in declaration order, registered in the texture
    /// registry so they can be sampled.
    pub attachments: Vec<TextureId>,
    /// Rendering has happened into the multisampled framebuffer since the
    /// last resolve.
    pub msaa_dirty: bool,
}

/// What happens to a render target's attachment textures when the target is
/// destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestroyAttachments {
    /// Detach them; they stay alive as ordinary sampleable textures.
    Detach,
    /// Destroy them along with the target.
    Destroy,
}
