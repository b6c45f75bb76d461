//! OpenGL backend for `daub-gpu`, built on [`glow`].
//!
//! [`GlBackend`] owns the GL context and a table of minted ids; the
//! frontend only ever sees opaque [`RawId`]s. Requires a 4.3 core context
//! (base-vertex draws, sampler objects, multisampled renderbuffers,
//! program interface queries for reflection).
//!
//! The frontend's executor elides redundant calls, so every method here
//! issues its GL calls unconditionally.

use std::collections::HashMap;

use glow::HasContext;
use tracing::debug;

use daub_gpu::{
    BackendCapabilities, BlendFunctions, BlendMode, BufferUsage, ClearSettings,
    ColorWriteSettings, CompareFunction, CompiledProgram, DataType, DrawMode, FaceDirection,
    FaceType, GpuBackend, GpuError, MeshBufferDesc, NativeAttachment, NativeRenderTarget, RawId,
    ReadRegion, Rect, RenderTargetSettings, ResolveRequest, SamplerSettings, TextureFormat,
    TextureUpload,
};

mod reflect;
mod translate;

struct TextureRecord {
    texture: glow::Texture,
    target: u32,
}

struct FramebufferRecord {
    framebuffer: glow::Framebuffer,
    /// Multisampled storage, owned by the framebuffer.
    renderbuffers: Vec<glow::Renderbuffer>,
}

pub struct GlBackend {
    gl: glow::Context,
    capabilities: BackendCapabilities,
    next_id: u64,
    programs: HashMap<u64, glow::Program>,
    buffers: HashMap<u64, glow::Buffer>,
    meshes: HashMap<u64, glow::VertexArray>,
    textures: HashMap<u64, TextureRecord>,
    samplers: HashMap<u64, glow::Sampler>,
    framebuffers: HashMap<u64, FramebufferRecord>,
}

impl GlBackend {
    pub fn new(gl: glow::Context) -> Self {
        let uniform_offset_alignment =
            unsafe { gl.get_parameter_i32(glow::UNIFORM_BUFFER_OFFSET_ALIGNMENT) } as usize;
        let max_sample_count = unsafe { gl.get_parameter_i32(glow::MAX_SAMPLES) } as u32;
        debug!(uniform_offset_alignment, max_sample_count, "gl backend ready");
        Self {
            gl,
            capabilities: BackendCapabilities {
                uniform_offset_alignment: uniform_offset_alignment.max(1),
                max_sample_count: max_sample_count.max(1),
            },
            next_id: 1,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            meshes: HashMap::new(),
            textures: HashMap::new(),
            samplers: HashMap::new(),
            framebuffers: HashMap::new(),
        }
    }

    /// The underlying context, for interop with custom draws.
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn mint(&mut self) -> RawId {
        let id = self.next_id;
        self.next_id += 1;
        RawId(id)
    }

    fn compile_shader(&self, stage: u32, source: &str) -> Result<glow::Shader, GpuError> {
        let gl = &self.gl;
        unsafe {
            let shader = gl.create_shader(stage).map_err(GpuError::Backend)?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                return Err(GpuError::ShaderCompilation(log));
            }
            Ok(shader)
        }
    }

    fn create_buffer_with(
        &mut self,
        target: u32,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<RawId, GpuError> {
        let gl = &self.gl;
        let buffer = unsafe {
            // Element buffer binds are VAO state; never record them into
            // whatever VAO happens to be bound.
            gl.bind_vertex_array(None);
            let buffer = gl.create_buffer().map_err(GpuError::Backend)?;
            gl.bind_buffer(target, Some(buffer));
            gl.buffer_data_u8_slice(target, data, translate::buffer_usage(usage));
            gl.bind_buffer(target, None);
            buffer
        };
        let id = self.mint();
        self.buffers.insert(id.0, buffer);
        Ok(id)
    }

    /// Framebuffer with single-sample texture attachments. Returns the
    /// attachment textures in declaration order.
    fn create_resolve_framebuffer(
        &self,
        settings: &RenderTargetSettings,
    ) -> Result<(glow::Framebuffer, Vec<(glow::Texture, TextureFormat)>), GpuError> {
        let gl = &self.gl;
        let width = settings.width as i32;
        let height = settings.height as i32;
        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(GpuError::Backend)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let mut textures = Vec::with_capacity(settings.attachments.len());
            let mut draw_buffers = Vec::new();
            let mut color_index = 0u32;
            for attachment in &settings.attachments {
                let (internal_format, pixel_format) = translate::texture_format(attachment.format);
                let point = translate::attachment_point(attachment.format, color_index);
                if attachment.format.is_color() {
                    draw_buffers.push(point);
                    color_index += 1;
                }
                let texture = match gl.create_texture() {
                    Ok(texture) => texture,
                    Err(err) => {
                        for (texture, _) in textures {
                            gl.delete_texture(texture);
                        }
                        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                        gl.delete_framebuffer(framebuffer);
                        return Err(GpuError::Backend(err));
                    }
                };
                gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    internal_format as i32,
                    width,
                    height,
                    0,
                    pixel_format,
                    translate::attachment_transfer_type(attachment.format),
                    None,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MIN_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAG_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_S,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_T,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.framebuffer_texture_2d(glow::FRAMEBUFFER, point, glow::TEXTURE_2D, Some(texture), 0);
                textures.push((texture, attachment.format));
            }
            gl.bind_texture(glow::TEXTURE_2D, None);
            if draw_buffers.is_empty() {
                // Depth-only target.
                gl.draw_buffers(&[glow::NONE]);
                gl.read_buffer(glow::NONE);
            } else {
                gl.draw_buffers(&draw_buffers);
            }

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                for (texture, _) in textures {
                    gl.delete_texture(texture);
                }
                gl.delete_framebuffer(framebuffer);
                return Err(GpuError::IncompleteRenderTarget(status_name(status).into()));
            }
            Ok((framebuffer, textures))
        }
    }

    /// Framebuffer with multisampled renderbuffer storage.
    fn create_msaa_framebuffer(
        &self,
        settings: &RenderTargetSettings,
    ) -> Result<(glow::Framebuffer, Vec<glow::Renderbuffer>), GpuError> {
        let gl = &self.gl;
        let width = settings.width as i32;
        let height = settings.height as i32;
        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(GpuError::Backend)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let mut renderbuffers = Vec::with_capacity(settings.attachments.len());
            let mut draw_buffers = Vec::new();
            let mut color_index = 0u32;
            for attachment in &settings.attachments {
                let (internal_format, _) = translate::texture_format(attachment.format);
                let point = translate::attachment_point(attachment.format, color_index);
                if attachment.format.is_color() {
                    draw_buffers.push(point);
                    color_index += 1;
                }
                let renderbuffer = gl.create_renderbuffer().map_err(GpuError::Backend)?;
                gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
                gl.renderbuffer_storage_multisample(
                    glow::RENDERBUFFER,
                    settings.sample_count as i32,
                    internal_format,
                    width,
                    height,
                );
                gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    point,
                    glow::RENDERBUFFER,
                    Some(renderbuffer),
                );
                renderbuffers.push(renderbuffer);
            }
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            if draw_buffers.is_empty() {
                gl.draw_buffers(&[glow::NONE]);
                gl.read_buffer(glow::NONE);
            } else {
                gl.draw_buffers(&draw_buffers);
            }

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                for renderbuffer in renderbuffers {
                    gl.delete_renderbuffer(renderbuffer);
                }
                gl.delete_framebuffer(framebuffer);
                return Err(GpuError::IncompleteRenderTarget(status_name(status).into()));
            }
            Ok((framebuffer, renderbuffers))
        }
    }

    fn color_draw_buffers(count: u32) -> Vec<u32> {
        (0..count).map(|i| glow::COLOR_ATTACHMENT0 + i).collect()
    }
}

impl GpuBackend for GlBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<CompiledProgram, GpuError> {
        let vertex = self.compile_shader(glow::VERTEX_SHADER, vertex_source)?;
        let fragment = match self.compile_shader(glow::FRAGMENT_SHADER, fragment_source) {
            Ok(shader) => shader,
            Err(err) => {
                unsafe { self.gl.delete_shader(vertex) };
                return Err(err);
            }
        };
        let gl = &self.gl;
        let program = unsafe {
            let program = gl.create_program().map_err(GpuError::Backend)?;
            gl.attach_shader(program, vertex);
            gl.attach_shader(program, fragment);
            gl.link_program(program);
            gl.detach_shader(program, vertex);
            gl.detach_shader(program, fragment);
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(GpuError::ProgramLink(log));
            }
            program
        };
        let reflection = reflect::reflect_program(&self.gl, program);
        let raw = self.mint();
        self.programs.insert(raw.0, program);
        Ok(CompiledProgram { raw, reflection })
    }

    fn destroy_program(&mut self, raw: RawId) {
        if let Some(program) = self.programs.remove(&raw.0) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn bind_program(&mut self, raw: RawId) {
        if let Some(&program) = self.programs.get(&raw.0) {
            unsafe { self.gl.use_program(Some(program)) };
        }
    }

    fn create_vertex_buffer(&mut self, data: &[u8], usage: BufferUsage) -> Result<RawId, GpuError> {
        self.create_buffer_with(glow::ARRAY_BUFFER, data, usage)
    }

    fn update_vertex_buffer(&mut self, raw: RawId, byte_offset: usize, data: &[u8]) {
        let Some(&buffer) = self.buffers.get(&raw.0) else {
            return;
        };
        let gl = &self.gl;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, byte_offset as i32, data);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn create_index_buffer(&mut self, data: &[u32], usage: BufferUsage) -> Result<RawId, GpuError> {
        self.create_buffer_with(glow::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(data), usage)
    }

    fn update_index_buffer(&mut self, raw: RawId, index_offset: usize, data: &[u32]) {
        let Some(&buffer) = self.buffers.get(&raw.0) else {
            return;
        };
        let gl = &self.gl;
        unsafe {
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
            gl.buffer_sub_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                (index_offset * 4) as i32,
                bytemuck::cast_slice(data),
            );
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
        }
    }

    fn destroy_buffer(&mut self, raw: RawId) {
        if let Some(buffer) = self.buffers.remove(&raw.0) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn create_mesh(&mut self, desc: &MeshBufferDesc<'_>) -> Result<RawId, GpuError> {
        let gl = &self.gl;
        let vertex_array = unsafe {
            let vertex_array = gl.create_vertex_array().map_err(GpuError::Backend)?;
            gl.bind_vertex_array(Some(vertex_array));
            for vertex_buffer in desc.vertex_buffers {
                let Some(&buffer) = self.buffers.get(&vertex_buffer.buffer.0) else {
                    gl.bind_vertex_array(None);
                    gl.delete_vertex_array(vertex_array);
                    return Err(GpuError::StaleHandle {
                        kind: "vertex buffer",
                    });
                };
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                for element in &vertex_buffer.layout.elements {
                    gl.enable_vertex_attrib_array(element.location);
                    match element.data_type {
                        DataType::Float32 | DataType::Float64 => gl.vertex_attrib_pointer_f32(
                            element.location,
                            element.element_count as i32,
                            translate::data_type(element.data_type),
                            false,
                            element.stride as i32,
                            element.offset as i32,
                        ),
                        _ => gl.vertex_attrib_pointer_i32(
                            element.location,
                            element.element_count as i32,
                            translate::data_type(element.data_type),
                            element.stride as i32,
                            element.offset as i32,
                        ),
                    }
                }
            }
            if let Some(index_buffer) = desc.index_buffer {
                let Some(&buffer) = self.buffers.get(&index_buffer.0) else {
                    gl.bind_vertex_array(None);
                    gl.delete_vertex_array(vertex_array);
                    return Err(GpuError::StaleHandle {
                        kind: "index buffer",
                    });
                };
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
            }
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            vertex_array
        };
        let id = self.mint();
        self.meshes.insert(id.0, vertex_array);
        Ok(id)
    }

    fn destroy_mesh(&mut self, raw: RawId) {
        if let Some(vertex_array) = self.meshes.remove(&raw.0) {
            unsafe { self.gl.delete_vertex_array(vertex_array) };
        }
    }

    fn bind_mesh(&mut self, raw: RawId) {
        if let Some(&vertex_array) = self.meshes.get(&raw.0) {
            unsafe { self.gl.bind_vertex_array(Some(vertex_array)) };
        }
    }

    fn create_uniform_buffer(&mut self, byte_count: usize) -> Result<RawId, GpuError> {
        let gl = &self.gl;
        let buffer = unsafe {
            let buffer = gl.create_buffer().map_err(GpuError::Backend)?;
            gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer));
            gl.buffer_data_size(glow::UNIFORM_BUFFER, byte_count as i32, glow::DYNAMIC_DRAW);
            gl.bind_buffer(glow::UNIFORM_BUFFER, None);
            buffer
        };
        let id = self.mint();
        self.buffers.insert(id.0, buffer);
        Ok(id)
    }

    fn upload_uniforms(&mut self, raw: RawId, data: &[u8]) {
        let Some(&buffer) = self.buffers.get(&raw.0) else {
            return;
        };
        let gl = &self.gl;
        unsafe {
            gl.bind_buffer(glow::UNIFORM_BUFFER, Some(buffer));
            gl.buffer_sub_data_u8_slice(glow::UNIFORM_BUFFER, 0, data);
            gl.bind_buffer(glow::UNIFORM_BUFFER, None);
        }
    }

    fn bind_uniform_range(
        &mut self,
        raw: RawId,
        binding_point: u32,
        byte_offset: usize,
        byte_count: usize,
    ) {
        let Some(&buffer) = self.buffers.get(&raw.0) else {
            return;
        };
        unsafe {
            self.gl.bind_buffer_range(
                glow::UNIFORM_BUFFER,
                binding_point,
                Some(buffer),
                byte_offset as i32,
                byte_count as i32,
            );
        }
    }

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<RawId, GpuError> {
        let gl = &self.gl;
        let target = if upload.depth > 1 {
            glow::TEXTURE_3D
        } else {
            glow::TEXTURE_2D
        };
        let (internal_format, pixel_format) = translate::texture_format(upload.format);
        let transfer_type = translate::data_type(upload.data_type);
        let texture = unsafe {
            let texture = gl.create_texture().map_err(GpuError::Backend)?;
            gl.bind_texture(target, Some(texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, upload.alignment.max(1) as i32);
            if target == glow::TEXTURE_3D {
                gl.tex_image_3d(
                    target,
                    0,
                    internal_format as i32,
                    upload.width as i32,
                    upload.height as i32,
                    upload.depth as i32,
                    0,
                    pixel_format,
                    transfer_type,
                    Some(upload.data),
                );
            } else {
                gl.tex_image_2d(
                    target,
                    0,
                    internal_format as i32,
                    upload.width as i32,
                    upload.height.max(1) as i32,
                    0,
                    pixel_format,
                    transfer_type,
                    Some(upload.data),
                );
            }
            if upload.mipmap_level_count > 1 {
                gl.generate_mipmap(target);
            }
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
            gl.bind_texture(target, None);
            texture
        };
        let id = self.mint();
        self.textures.insert(id.0, TextureRecord { texture, target });
        Ok(id)
    }

    fn destroy_texture(&mut self, raw: RawId) {
        if let Some(record) = self.textures.remove(&raw.0) {
            unsafe { self.gl.delete_texture(record.texture) };
        }
    }

    fn create_sampler(&mut self, settings: &SamplerSettings) -> Result<RawId, GpuError> {
        let gl = &self.gl;
        let sampler = unsafe {
            let sampler = gl.create_sampler().map_err(GpuError::Backend)?;
            gl.sampler_parameter_i32(
                sampler,
                glow::TEXTURE_WRAP_S,
                translate::texture_wrap(settings.wrap_s) as i32,
            );
            gl.sampler_parameter_i32(
                sampler,
                glow::TEXTURE_WRAP_T,
                translate::texture_wrap(settings.wrap_t) as i32,
            );
            gl.sampler_parameter_i32(
                sampler,
                glow::TEXTURE_WRAP_R,
                translate::texture_wrap(settings.wrap_r) as i32,
            );
            gl.sampler_parameter_i32(
                sampler,
                glow::TEXTURE_MIN_FILTER,
                translate::min_filter(settings.filtering, settings.mip_mapping) as i32,
            );
            gl.sampler_parameter_i32(
                sampler,
                glow::TEXTURE_MAG_FILTER,
                translate::mag_filter(settings.filtering) as i32,
            );
            sampler
        };
        let id = self.mint();
        self.samplers.insert(id.0, sampler);
        Ok(id)
    }

    fn destroy_sampler(&mut self, raw: RawId) {
        if let Some(sampler) = self.samplers.remove(&raw.0) {
            unsafe { self.gl.delete_sampler(sampler) };
        }
    }

    fn bind_texture(&mut self, slot: u32, texture: RawId, sampler: Option<RawId>) {
        let Some(record) = self.textures.get(&texture.0) else {
            return;
        };
        let gl = &self.gl;
        unsafe {
            gl.active_texture(glow::TEXTURE0 + slot);
            gl.bind_texture(record.target, Some(record.texture));
            let native = sampler.and_then(|raw| self.samplers.get(&raw.0).copied());
            gl.bind_sampler(slot, native);
        }
    }

    fn create_render_target(
        &mut self,
        settings: &RenderTargetSettings,
    ) -> Result<NativeRenderTarget, GpuError> {
        let (framebuffer, textures) = self.create_resolve_framebuffer(settings)?;
        let msaa = if settings.sample_count > 1 {
            match self.create_msaa_framebuffer(settings) {
                Ok(msaa) => Some(msaa),
                Err(err) => {
                    unsafe {
                        for &(texture, _) in &textures {
                            self.gl.delete_texture(texture);
                        }
                        self.gl.delete_framebuffer(framebuffer);
                    }
                    return Err(err);
                }
            }
        } else {
            None
        };

        let fbo = self.mint();
        self.framebuffers.insert(
            fbo.0,
            FramebufferRecord {
                framebuffer,
                renderbuffers: Vec::new(),
            },
        );
        let msaa_fbo = msaa.map(|(framebuffer, renderbuffers)| {
            let id = self.mint();
            self.framebuffers.insert(
                id.0,
                FramebufferRecord {
                    framebuffer,
                    renderbuffers,
                },
            );
            id
        });

        let attachments = textures
            .into_iter()
            .map(|(texture, format)| {
                let id = self.mint();
                self.textures.insert(
                    id.0,
                    TextureRecord {
                        texture,
                        target: glow::TEXTURE_2D,
                    },
                );
                NativeAttachment {
                    texture: id,
                    format,
                }
            })
            .collect();

        Ok(NativeRenderTarget {
            fbo,
            msaa_fbo,
            attachments,
        })
    }

    fn destroy_render_target(&mut self, fbo: RawId, msaa_fbo: Option<RawId>) {
        let gl = &self.gl;
        for raw in std::iter::once(fbo).chain(msaa_fbo) {
            if let Some(record) = self.framebuffers.remove(&raw.0) {
                unsafe {
                    for renderbuffer in record.renderbuffers {
                        gl.delete_renderbuffer(renderbuffer);
                    }
                    gl.delete_framebuffer(record.framebuffer);
                }
            }
        }
    }

    fn bind_render_target(&mut self, fbo: Option<RawId>, _color_attachments: u32) {
        let native = fbo.and_then(|raw| self.framebuffers.get(&raw.0).map(|r| r.framebuffer));
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, native) };
    }

    fn resolve_render_target(&mut self, request: &ResolveRequest) {
        let Some(read) = self.framebuffers.get(&request.msaa_fbo.0) else {
            return;
        };
        let Some(draw) = self.framebuffers.get(&request.fbo.0) else {
            return;
        };
        let gl = &self.gl;
        let width = request.width as i32;
        let height = request.height as i32;
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(read.framebuffer));
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(draw.framebuffer));
            for i in 0..request.color_attachment_count {
                gl.read_buffer(glow::COLOR_ATTACHMENT0 + i);
                gl.draw_buffers(&[glow::COLOR_ATTACHMENT0 + i]);
                gl.blit_framebuffer(
                    0,
                    0,
                    width,
                    height,
                    0,
                    0,
                    width,
                    height,
                    glow::COLOR_BUFFER_BIT,
                    glow::NEAREST,
                );
            }
            if request.resolve_depth {
                gl.blit_framebuffer(
                    0,
                    0,
                    width,
                    height,
                    0,
                    0,
                    width,
                    height,
                    glow::DEPTH_BUFFER_BIT,
                    glow::NEAREST,
                );
            }
            // Restore the resolve target's full draw buffer set.
            gl.read_buffer(glow::COLOR_ATTACHMENT0);
            gl.draw_buffers(&Self::color_draw_buffers(request.color_attachment_count));
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    fn read_pixels(
        &mut self,
        fbo: Option<RawId>,
        region: ReadRegion,
        format: TextureFormat,
        data_type: DataType,
        out: &mut [u8],
    ) -> Result<(), GpuError> {
        let native = match fbo {
            Some(raw) => Some(
                self.framebuffers
                    .get(&raw.0)
                    .ok_or(GpuError::StaleHandle {
                        kind: "render target",
                    })?
                    .framebuffer,
            ),
            None => None,
        };
        let (_, pixel_format) = translate::texture_format(format);
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, native);
            gl.read_buffer(if native.is_some() {
                glow::COLOR_ATTACHMENT0
            } else {
                glow::BACK
            });
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            gl.read_pixels(
                region.x as i32,
                region.y as i32,
                region.width as i32,
                region.height as i32,
                pixel_format,
                translate::data_type(data_type),
                glow::PixelPackData::Slice(out),
            );
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, 4);
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }
        Ok(())
    }

    fn set_viewport(&mut self, rect: Rect) {
        unsafe {
            self.gl.viewport(
                rect.x as i32,
                rect.y as i32,
                rect.width as i32,
                rect.height as i32,
            );
        }
    }

    fn set_scissor(&mut self, rect: Option<Rect>) {
        let gl = &self.gl;
        unsafe {
            match rect {
                Some(rect) => {
                    gl.enable(glow::SCISSOR_TEST);
                    gl.scissor(
                        rect.x as i32,
                        rect.y as i32,
                        rect.width as i32,
                        rect.height as i32,
                    );
                }
                None => gl.disable(glow::SCISSOR_TEST),
            }
        }
    }

    fn set_depth_test(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn set_depth_write(&mut self, enabled: bool) {
        unsafe { self.gl.depth_mask(enabled) };
    }

    fn set_depth_function(&mut self, function: CompareFunction) {
        unsafe { self.gl.depth_func(translate::compare_function(function)) };
    }

    fn set_multisample(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::MULTISAMPLE);
            } else {
                self.gl.disable(glow::MULTISAMPLE);
            }
        }
    }

    fn set_blend(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::BLEND);
            } else {
                self.gl.disable(glow::BLEND);
            }
        }
    }

    fn set_blend_modes(&mut self, color: BlendMode, alpha: BlendMode) {
        unsafe {
            self.gl
                .blend_equation_separate(translate::blend_mode(color), translate::blend_mode(alpha));
        }
    }

    fn set_blend_functions(&mut self, functions: BlendFunctions) {
        unsafe {
            self.gl.blend_func_separate(
                translate::blend_function(functions.color_src),
                translate::blend_function(functions.color_dest),
                translate::blend_function(functions.alpha_src),
                translate::blend_function(functions.alpha_dest),
            );
        }
    }

    fn set_color_write(&mut self, mask: ColorWriteSettings) {
        unsafe { self.gl.color_mask(mask.r, mask.g, mask.b, mask.a) };
    }

    fn set_front_face(&mut self, direction: FaceDirection) {
        unsafe { self.gl.front_face(translate::face_direction(direction)) };
    }

    fn set_cull_face(&mut self, face: Option<FaceType>) {
        let gl = &self.gl;
        unsafe {
            match face {
                Some(face) => {
                    gl.enable(glow::CULL_FACE);
                    gl.cull_face(translate::face_type(face));
                }
                None => gl.disable(glow::CULL_FACE),
            }
        }
    }

    fn clear(&mut self, settings: &ClearSettings) {
        let gl = &self.gl;
        let mut mask = 0;
        unsafe {
            if let Some(color) = settings.color {
                gl.clear_color(color.r, color.g, color.b, color.a);
                mask |= glow::COLOR_BUFFER_BIT;
            }
            if let Some(depth) = settings.depth {
                gl.clear_depth_f64(depth);
                mask |= glow::DEPTH_BUFFER_BIT;
            }
            if let Some(stencil) = settings.stencil {
                gl.clear_stencil(stencil);
                mask |= glow::STENCIL_BUFFER_BIT;
            }
            if mask != 0 {
                gl.clear(mask);
            }
        }
    }

    fn draw_arrays(&mut self, mode: DrawMode, first_vertex: i32, vertex_count: i32) {
        unsafe {
            self.gl
                .draw_arrays(translate::draw_mode(mode), first_vertex, vertex_count);
        }
    }

    fn draw_indexed(
        &mut self,
        mode: DrawMode,
        first_index: i32,
        index_count: i32,
        base_vertex: i32,
    ) {
        unsafe {
            self.gl.draw_elements_base_vertex(
                translate::draw_mode(mode),
                index_count,
                glow::UNSIGNED_INT,
                first_index * 4,
                base_vertex,
            );
        }
    }
}

fn status_name(status: u32) -> &'static str {
    match status {
        glow::FRAMEBUFFER_UNDEFINED => "undefined",
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "incomplete attachment",
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => "missing attachment",
        glow::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => "incomplete draw buffer",
        glow::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => "incomplete read buffer",
        glow::FRAMEBUFFER_UNSUPPORTED => "unsupported attachment combination",
        glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => "inconsistent sample counts",
        _ => "unknown",
    }
}
