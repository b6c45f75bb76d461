//! The backend seam.
//!
//! [`GpuBackend`] is the mutable-state device interface the executor drives:
//! fine-grained bind and state-set calls plus draws, matching how the
//! executor elides redundant transitions. Backends mint opaque [`RawId`]s
//! for native objects; the device never interprets them.

use crate::error::GpuError;
use crate::reflection::ProgramReflection;
use crate::types::{
    BlendFunctions, BlendMode, BufferUsage, ClearSettings, ColorWriteSettings, CompareFunction,
    DataType, DrawMode, FaceDirection, FaceType, Rect, RenderTargetSettings, SamplerSettings,
    TextureFormat, TextureUpload, VertexLayout,
};

/// Opaque backend-minted identifier for a native object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawId(pub u64);

/// Device limits the frontend adapts to.
#[derive(Clone, Copy, Debug)]
pub struct BackendCapabilities {
    /// Required alignment of uniform buffer bind offsets, in bytes.
    pub uniform_offset_alignment: usize,
    /// Largest supported multisample count.
    pub max_sample_count: u32,
}

/// A linked program plus its reflected interface.
#[derive(Clone, Debug)]
pub struct CompiledProgram {
    pub raw: RawId,
    pub reflection: ProgramReflection,
}

/// One vertex buffer feeding a mesh, with its interleaved layout.
#[derive(Clone, Debug)]
pub struct MeshVertexBuffer {
    pub buffer: RawId,
    pub layout: VertexLayout,
}

/// Buffers assembled into a mesh (vertex array) object.
#[derive(Clone, Debug)]
pub struct MeshBufferDesc<'a> {
    pub vertex_buffers: &'a [MeshVertexBuffer],
    pub index_buffer: Option<RawId>,
}

/// One attachment texture of a native render target.
#[derive(Clone, Copy, Debug)]
pub struct NativeAttachment {
    pub texture: RawId,
    pub format: TextureFormat,
}

/// Native objects backing a render target.
///
/// With multisampling, rendering goes into `msaa_fbo` and `fbo` holds the
/// single-sample attachment textures a resolve blits into.
#[derive(Clone, Debug)]
pub struct NativeRenderTarget {
    pub fbo: RawId,
    pub msaa_fbo: Option<RawId>,
    /// In declaration order of the settings.
    pub attachments: Vec<NativeAttachment>,
}

/// A resolve blit from a multisampled framebuffer into its single-sample
/// counterpart.
#[derive(Clone, Copy, Debug)]
pub struct ResolveRequest {
    pub msaa_fbo: RawId,
    pub fbo: RawId,
    pub width: u32,
    pub height: u32,
    pub color_attachment_count: u32,
    pub resolve_depth: bool,
}

/// Pixel rectangle of a framebuffer readback.
#[derive(Clone, Copy, Debug)]
pub struct ReadRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The native device interface.
///
/// All binds and state sets are sticky: the executor only issues a call when
/// the required value differs from the last one it issued, so backends must
/// not reset state behind its back.
pub trait GpuBackend {
    fn capabilities(&self) -> BackendCapabilities;

    // Programs.
    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<CompiledProgram, GpuError>;
    fn destroy_program(&mut self, raw: RawId);
    fn bind_program(&mut self, raw: RawId);

    // Vertex and index buffers.
    fn create_vertex_buffer(&mut self, data: &[u8], usage: BufferUsage) -> Result<RawId, GpuError>;
    fn update_vertex_buffer(&mut self, raw: RawId, byte_offset: usize, data: &[u8]);
    fn create_index_buffer(&mut self, data: &[u32], usage: BufferUsage) -> Result<RawId, GpuError>;
    fn update_index_buffer(&mut self, raw: RawId, index_offset: usize, data: &[u32]);
    fn destroy_buffer(&mut self, raw: RawId);

    // Meshes.
    fn create_mesh(&mut self, desc: &MeshBufferDesc<'_>) -> Result<RawId, GpuError>;
    fn destroy_mesh(&mut self, raw: RawId);
    fn bind_mesh(&mut self, raw: RawId);

    // Uniform storage.
    fn create_uniform_buffer(&mut self, byte_count: usize) -> Result<RawId, GpuError>;
    fn upload_uniforms(&mut self, raw: RawId, data: &[u8]);
    fn bind_uniform_range(
        &mut self,
        raw: RawId,
        binding_point: u32,
        byte_offset: usize,
        byte_count: usize,
    );

    // Textures and samplers.
    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<RawId, GpuError>;
    fn destroy_texture(&mut self, raw: RawId);
    fn create_sampler(&mut self, settings: &SamplerSettings) -> Result<RawId, GpuError>;
    fn destroy_sampler(&mut self, raw: RawId);
    fn bind_texture(&mut self, slot: u32, texture: RawId, sampler: Option<RawId>);

    // Render targets.
    fn create_render_target(
        &mut self,
        settings: &RenderTargetSettings,
    ) -> Result<NativeRenderTarget, GpuError>;
    fn destroy_render_target(&mut self, fbo: RawId, msaa_fbo: Option<RawId>);
    /// `None` binds the default framebuffer.
    fn bind_render_target(&mut self, fbo: Option<RawId>, color_attachment_count: u32);
    fn resolve_render_target(&mut self, request: &ResolveRequest);
    fn read_pixels(
        &mut self,
        fbo: Option<RawId>,
        region: ReadRegion,
        format: TextureFormat,
        data_type: DataType,
        out: &mut [u8],
    ) -> Result<(), GpuError>;

    // Fixed-function state.
    fn set_viewport(&mut self, rect: Rect);
    fn set_scissor(&mut self, rect: Option<Rect>);
    fn set_depth_test(&mut self, enabled: bool);
    fn set_depth_write(&mut self, enabled: bool);
    fn set_depth_function(&mut self, function: CompareFunction);
    fn set_multisample(&mut self, enabled: bool);
    fn set_blend(&mut self, enabled: bool);
    fn set_blend_modes(&mut self, color: BlendMode, alpha: BlendMode);
    fn set_blend_functions(&mut self, functions: BlendFunctions);
    fn set_color_write(&mut self, mask: ColorWriteSettings);
    fn set_front_face(&mut self, direction: FaceDirection);
    fn set_cull_face(&mut self, face: Option<FaceType>);

    // Commands.
    fn clear(&mut self, settings: &ClearSettings);
    fn draw_arrays(&mut self, mode: DrawMode, first_vertex: i32, vertex_count: i32);
    fn draw_indexed(
        &mut self,
        mode: DrawMode,
        first_index: i32,
        index_count: i32,
        base_vertex: i32,
    );
}
