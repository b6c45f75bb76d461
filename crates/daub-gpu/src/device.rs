//! The render device: resource construction, frame recording and playback.
//!
//! All GPU work goes through [`RenderDevice`]. Resources are created up
//! front and referred to by generational handles; per frame, the caller
//! records commands into pooled passes and `end_frame` replays them against
//! the backend with redundant transitions elided.
//!
//! Contract violations (recording outside a frame, recording into an ended
//! pass, overflowing the uniform arena) are debug assertions. Fallible
//! operations (shader compilation, framebuffer completion, stale handles at
//! playback) return [`GpuError`].

use tracing::debug;

use crate::arena::UniformArena;
use crate::backend::{
    BackendCapabilities, GpuBackend, MeshBufferDesc, MeshVertexBuffer, ReadRegion, ResolveRequest,
};
use crate::error::GpuError;
use crate::executor::{FrameMetrics, Player};
use crate::pass::{BlockBinding, DrawCmd, PassCmd, PassId, RenderPass};
use crate::reflection::ProgramReflection;
use crate::registry::Registry;
use crate::resources::{
    BlockStorage, DestroyAttachments, IndexBuffer, IndexBufferId, Mesh, MeshId, Pipeline,
    PipelineId, PipelineTextureSlot, PipelineVariable, Program, ProgramId, RenderTarget,
    RenderTargetId, Sampler, SamplerId, Texture, TextureId, TextureSlot, VertexBuffer,
    VertexBufferId,
};
use crate::state::StateWord;
use crate::types::{
    BufferUsage, ClearSettings, DataType, DrawMode, PipelineSettings, Rect, RenderTargetSettings,
    SamplerSettings, TextureFormat, TextureUpload, VertexLayout,
};

/// Device construction settings.
#[derive(Clone, Copy, Debug)]
pub struct DeviceConfig {
    /// Capacity of the per-frame uniform staging arena, in bytes.
    pub uniform_arena_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            uniform_arena_capacity: 64 * 1024,
        }
    }
}

pub struct RenderDevice<B: GpuBackend> {
    backend: B,
    capabilities: BackendCapabilities,

    programs: Registry<Program>,
    pipelines: Registry<Pipeline>,
    vertex_buffers: Registry<VertexBuffer>,
    index_buffers: Registry<IndexBuffer>,
    meshes: Registry<Mesh>,
    textures: Registry<Texture>,
    samplers: Registry<Sampler>,
    render_targets: Registry<RenderTarget>,

    arena: UniformArena,

    passes: Vec<RenderPass<B>>,
    free_passes: Vec<usize>,
    /// Indices of ended passes, in end order. Playback order.
    pending: Vec<usize>,
    frame_open: bool,
    metrics: FrameMetrics,
}

impl<B: GpuBackend> RenderDevice<B> {
    pub fn new(mut backend: B, config: DeviceConfig) -> Result<Self, GpuError> {
        let capabilities = backend.capabilities();
        let buffer = backend.create_uniform_buffer(config.uniform_arena_capacity)?;
        let arena = UniformArena::new(
            config.uniform_arena_capacity,
            capabilities.uniform_offset_alignment,
            buffer,
        );
        debug!(
            arena_capacity = config.uniform_arena_capacity,
            uniform_offset_alignment = capabilities.uniform_offset_alignment,
            "device created"
        );
        Ok(Self {
            backend,
            capabilities,
            programs: Registry::new(),
            pipelines: Registry::new(),
            vertex_buffers: Registry::new(),
            index_buffers: Registry::new(),
            meshes: Registry::new(),
            textures: Registry::new(),
            samplers: Registry::new(),
            render_targets: Registry::new(),
            arena,
            passes: Vec::new(),
            free_passes: Vec::new(),
            pending: Vec::new(),
            frame_open: false,
            metrics: FrameMetrics::default(),
        })
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    /// Direct backend access, for setup work outside recorded frames.
    /// Anything done here is invisible to playback's elision memos.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Playback counters of the most recently ended frame.
    pub fn frame_metrics(&self) -> FrameMetrics {
        self.metrics
    }

    // ---- Programs and pipelines ----

    pub fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, GpuError> {
        let compiled = self.backend.create_program(vertex_source, fragment_source)?;
        Ok(self.programs.insert(Program {
            raw: compiled.raw,
            reflection: compiled.reflection,
            pipeline_count: 0,
        }))
    }

    /// Fails with [`GpuError::ProgramInUse`] while any pipeline still
    /// references the program.
    pub fn destroy_program(&mut self, program: ProgramId) -> Result<(), GpuError> {
        let record = self
            .programs
            .get(program)
            .ok_or(GpuError::StaleHandle { kind: "program" })?;
        if record.pipeline_count > 0 {
            return Err(GpuError::ProgramInUse);
        }
        if let Some(record) = self.programs.remove(program) {
            self.backend.destroy_program(record.raw);
        }
        Ok(())
    }

    pub fn program_reflection(&self, program: ProgramId) -> Option<&ProgramReflection> {
        self.programs.get(program).map(|p| &p.reflection)
    }

    pub fn create_pipeline(&mut self, settings: PipelineSettings) -> Result<PipelineId, GpuError> {
        let program = self
            .programs
            .get_mut(settings.program)
            .ok_or(GpuError::StaleHandle { kind: "program" })?;
        let blocks = program
            .reflection
            .blocks
            .iter()
            .map(|block| BlockStorage {
                binding_point: block.binding_point,
                data: vec![0; block.byte_count],
            })
            .collect();
        let textures = vec![TextureSlot::default(); program.reflection.textures.len()];
        program.pipeline_count += 1;
        Ok(self.pipelines.insert(Pipeline {
            program: settings.program,
            state: StateWord::pack(&settings),
            viewport: settings.viewport,
            scissor: settings.scissor,
            blocks,
            textures,
        }))
    }

    pub fn destroy_pipeline(&mut self, pipeline: PipelineId) {
        let Some(record) = self.pipelines.remove(pipeline) else {
            debug_assert!(false, "stale pipeline handle");
            return;
        };
        if let Some(program) = self.programs.get_mut(record.program) {
            program.pipeline_count -= 1;
        }
    }

    /// Resolve a `(block, uniform)` name pair into a write handle. Returns
    /// `None` when the program has no such uniform.
    pub fn variable(
        &self,
        pipeline: PipelineId,
        block_name: &str,
        uniform_name: &str,
    ) -> Option<PipelineVariable> {
        let record = self.pipelines.get(pipeline)?;
        let reflection = &self.programs.get(record.program)?.reflection;
        let (block_index, block) = reflection.block(block_name)?;
        let uniform = block.uniform(uniform_name)?;
        let byte_count = if uniform.element_count > 1 && uniform.array_stride > 0 {
            uniform.array_stride * (uniform.element_count - 1) + uniform.uniform_type.byte_count()
        } else {
            uniform.uniform_type.byte_count()
        };
        Some(PipelineVariable {
            pipeline,
            block: block_index,
            byte_offset: uniform.byte_offset,
            byte_count,
        })
    }

    /// Write a plain-old-data value into the pipeline's staging copy of the
    /// uniform. Takes effect for every draw recorded afterwards.
    pub fn set_variable<T: bytemuck::Pod>(&mut self, variable: PipelineVariable, value: &T) {
        self.set_variable_bytes(variable, bytemuck::bytes_of(value));
    }

    pub fn set_variable_slice<T: bytemuck::Pod>(
        &mut self,
        variable: PipelineVariable,
        values: &[T],
    ) {
        self.set_variable_bytes(variable, bytemuck::cast_slice(values));
    }

    pub fn set_variable_bytes(&mut self, variable: PipelineVariable, bytes: &[u8]) {
        debug_assert!(
            bytes.len() <= variable.byte_count,
            "value of {} bytes overflows a {}-byte uniform",
            bytes.len(),
            variable.byte_count,
        );
        let Some(pipeline) = self.pipelines.get_mut(variable.pipeline) else {
            debug_assert!(false, "stale pipeline handle");
            return;
        };
        let data = &mut pipeline.blocks[variable.block].data;
        let dst = &mut data[variable.byte_offset..variable.byte_offset + bytes.len()];
        if dst != bytes {
            dst.copy_from_slice(bytes);
        }
    }

    /// Resolve a sampler uniform name into a texture unit handle.
    pub fn texture_slot(&self, pipeline: PipelineId, name: &str) -> Option<PipelineTextureSlot> {
        let record = self.pipelines.get(pipeline)?;
        let reflection = &self.programs.get(record.program)?.reflection;
        let (slot, _) = reflection.texture(name)?;
        Some(PipelineTextureSlot { pipeline, slot })
    }

    /// Bind a texture (and optional sampler) to a pipeline's texture unit.
    /// `None` leaves the unit unbound.
    pub fn set_texture(
        &mut self,
        slot: PipelineTextureSlot,
        texture: Option<TextureId>,
        sampler: Option<SamplerId>,
    ) {
        let Some(pipeline) = self.pipelines.get_mut(slot.pipeline) else {
            debug_assert!(false, "stale pipeline handle");
            return;
        };
        pipeline.textures[slot.slot] = TextureSlot { texture, sampler };
    }

    // ---- Buffers and meshes ----

    pub fn create_vertex_buffer(
        &mut self,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<VertexBufferId, GpuError> {
        let raw = self.backend.create_vertex_buffer(data, usage)?;
        Ok(self.vertex_buffers.insert(VertexBuffer {
            raw,
            byte_count: data.len(),
            usage,
        }))
    }

    pub fn update_vertex_buffer(&mut self, buffer: VertexBufferId, byte_offset: usize, data: &[u8]) {
        let Some(record) = self.vertex_buffers.get(buffer) else {
            debug_assert!(false, "stale vertex buffer handle");
            return;
        };
        debug_assert!(byte_offset + data.len() <= record.byte_count);
        self.backend.update_vertex_buffer(record.raw, byte_offset, data);
    }

    pub fn destroy_vertex_buffer(&mut self, buffer: VertexBufferId) {
        let Some(record) = self.vertex_buffers.remove(buffer) else {
            debug_assert!(false, "stale vertex buffer handle");
            return;
        };
        self.backend.destroy_buffer(record.raw);
    }

    pub fn create_index_buffer(
        &mut self,
        data: &[u32],
        usage: BufferUsage,
    ) -> Result<IndexBufferId, GpuError> {
        let raw = self.backend.create_index_buffer(data, usage)?;
        Ok(self.index_buffers.insert(IndexBuffer {
            raw,
            index_count: data.len(),
            usage,
        }))
    }

    pub fn update_index_buffer(&mut self, buffer: IndexBufferId, index_offset: usize, data: &[u32]) {
        let Some(record) = self.index_buffers.get(buffer) else {
            debug_assert!(false, "stale index buffer handle");
            return;
        };
        debug_assert!(index_offset + data.len() <= record.index_count);
        self.backend.update_index_buffer(record.raw, index_offset, data);
    }

    pub fn destroy_index_buffer(&mut self, buffer: IndexBufferId) {
        let Some(record) = self.index_buffers.remove(buffer) else {
            debug_assert!(false, "stale index buffer handle");
            return;
        };
        self.backend.destroy_buffer(record.raw);
    }

    /// Assemble vertex buffers (each with its interleaved layout) and an
    /// optional index buffer into a drawable mesh.
    pub fn create_mesh(
        &mut self,
        vertex_buffers: &[(VertexBufferId, VertexLayout)],
        index_buffer: Option<IndexBufferId>,
    ) -> Result<MeshId, GpuError> {
        let mut native = Vec::with_capacity(vertex_buffers.len());
        for (id, layout) in vertex_buffers {
            let record = self
                .vertex_buffers
                .get(*id)
                .ok_or(GpuError::StaleHandle {
                    kind: "vertex buffer",
                })?;
            native.push(MeshVertexBuffer {
                buffer: record.raw,
                layout: layout.clone(),
            });
        }
        let native_index = match index_buffer {
            Some(id) => Some(
                self.index_buffers
                    .get(id)
                    .ok_or(GpuError::StaleHandle {
                        kind: "index buffer",
                    })?
                    .raw,
            ),
            None => None,
        };
        let raw = self.backend.create_mesh(&MeshBufferDesc {
            vertex_buffers: &native,
            index_buffer: native_index,
        })?;
        Ok(self.meshes.insert(Mesh {
            raw,
            vertex_buffers: vertex_buffers.iter().map(|(id, _)| *id).collect(),
            index_buffer,
        }))
    }

    pub fn destroy_mesh(&mut self, mesh: MeshId) {
        let Some(record) = self.meshes.remove(mesh) else {
            debug_assert!(false, "stale mesh handle");
            return;
        };
        self.backend.destroy_mesh(record.raw);
    }

    // ---- Textures, samplers, render targets ----

    pub fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureId, GpuError> {
        let raw = self.backend.create_texture(upload)?;
        Ok(self.textures.insert(Texture {
            raw,
            width: upload.width,
            height: upload.height,
            depth: upload.depth,
            format: upload.format,
            owner: None,
        }))
    }

    /// Attachment textures belong to their render target and must be
    /// destroyed through [`Self::destroy_render_target`].
    pub fn destroy_texture(&mut self, texture: TextureId) {
        let Some(record) = self.textures.get(texture) else {
            debug_assert!(false, "stale texture handle");
            return;
        };
        debug_assert!(
            record.owner.is_none(),
            "texture is an attachment of a live render target"
        );
        if let Some(record) = self.textures.remove(texture) {
            self.backend.destroy_texture(record.raw);
        }
    }

    pub fn create_sampler(&mut self, settings: &SamplerSettings) -> Result<SamplerId, GpuError> {
        let raw = self.backend.create_sampler(settings)?;
        Ok(self.samplers.insert(Sampler {
            raw,
            settings: *settings,
        }))
    }

    pub fn destroy_sampler(&mut self, sampler: SamplerId) {
        let Some(record) = self.samplers.remove(sampler) else {
            debug_assert!(false, "stale sampler handle");
            return;
        };
        self.backend.destroy_sampler(record.raw);
    }

    pub fn create_render_target(
        &mut self,
        settings: &RenderTargetSettings,
    ) -> Result<RenderTargetId, GpuError> {
        let depth_attachments = settings
            .attachments
            .iter()
            .filter(|a| !a.format.is_color())
            .count();
        debug_assert!(depth_attachments <= 1, "at most one depth attachment");

        let mut settings = settings.clone();
        settings.sample_count = settings
            .sample_count
            .clamp(1, self.capabilities.max_sample_count);

        let native = self.backend.create_render_target(&settings)?;
        let color_attachment_count = (settings.attachments.len() - depth_attachments) as u32;
        let id = self.render_targets.insert(RenderTarget {
            fbo: native.fbo,
            msaa_fbo: native.msaa_fbo,
            width: settings.width,
            height: settings.height,
            sample_count: settings.sample_count,
            color_attachment_count,
            has_depth: depth_attachments > 0,
            attachments: Vec::new(),
            msaa_dirty: false,
        });

        let attachments: Vec<TextureId> = native
            .attachments
            .iter()
            .map(|attachment| {
                self.textures.insert(Texture {
                    raw: attachment.texture,
                    width: settings.width,
                    height: settings.height,
                    depth: 1,
                    format: attachment.format,
                    owner: Some(id),
                })
            })
            .collect();
        if let Some(rt) = self.render_targets.get_mut(id) {
            rt.attachments = attachments;
        }
        Ok(id)
    }

    /// Texture backing the `index`-th attachment, sampleable like any other
    /// texture. Sampling it resolves pending multisampled writes first.
    pub fn render_target_texture(
        &self,
        render_target: RenderTargetId,
        index: usize,
    ) -> Option<TextureId> {
        self.render_targets
            .get(render_target)?
            .attachments
            .get(index)
            .copied()
    }

    pub fn destroy_render_target(
        &mut self,
        render_target: RenderTargetId,
        attachments: DestroyAttachments,
    ) {
        let Some(record) = self.render_targets.remove(render_target) else {
            debug_assert!(false, "stale render target handle");
            return;
        };
        for texture in record.attachments {
            match attachments {
                DestroyAttachments::Destroy => {
                    if let Some(texture) = self.textures.remove(texture) {
                        self.backend.destroy_texture(texture.raw);
                    }
                }
                DestroyAttachments::Detach => {
                    if let Some(texture) = self.textures.get_mut(texture) {
                        texture.owner = None;
                    }
                }
            }
        }
        self.backend
            .destroy_render_target(record.fbo, record.msaa_fbo);
    }

    /// Read back a pixel rectangle, resolving pending multisampled writes
    /// first. `None` reads the default framebuffer. Must not be called
    /// inside a frame: recorded passes have not executed yet.
    pub fn read_pixels(
        &mut self,
        render_target: Option<RenderTargetId>,
        region: ReadRegion,
        format: TextureFormat,
        data_type: DataType,
        out: &mut [u8],
    ) -> Result<(), GpuError> {
        debug_assert!(!self.frame_open, "read_pixels inside an open frame");
        let fbo = match render_target {
            None => None,
            Some(id) => {
                let rt = self
                    .render_targets
                    .get_mut(id)
                    .ok_or(GpuError::StaleHandle {
                        kind: "render target",
                    })?;
                if rt.msaa_dirty {
                    if let Some(msaa_fbo) = rt.msaa_fbo {
                        self.backend.resolve_render_target(&ResolveRequest {
                            msaa_fbo,
                            fbo: rt.fbo,
                            width: rt.width,
                            height: rt.height,
                            color_attachment_count: rt.color_attachment_count,
                            resolve_depth: rt.has_depth,
                        });
                    }
                    rt.msaa_dirty = false;
                }
                Some(rt.fbo)
            }
        };
        self.backend.read_pixels(fbo, region, format, data_type, out)
    }

    // ---- Frames and passes ----

    pub fn begin_frame(&mut self) {
        debug_assert!(!self.frame_open, "frame already open");
        self.frame_open = true;
        self.metrics = FrameMetrics::default();
        self.arena.begin_frame();
    }

    /// Acquire a pooled pass targeting `target` (`None` for the default
    /// framebuffer). Passes execute in the order they are *ended*.
    pub fn begin_pass(&mut self, target: Option<RenderTargetId>) -> PassId {
        debug_assert!(self.frame_open, "begin_pass outside a frame");
        debug_assert!(
            target.map_or(true, |t| self.render_targets.contains(t)),
            "stale render target handle"
        );
        if let Some(index) = self.free_passes.pop() {
            self.passes[index].reset(target);
            PassId(index)
        } else {
            self.passes.push(RenderPass::new(target));
            PassId(self.passes.len() - 1)
        }
    }

    /// [`Self::begin_pass`] with a clear recorded as the first command.
    pub fn begin_pass_cleared(
        &mut self,
        target: Option<RenderTargetId>,
        settings: ClearSettings,
    ) -> PassId {
        let pass = self.begin_pass(target);
        self.clear(pass, settings);
        pass
    }

    fn open_pass(&mut self, pass: PassId) -> &mut RenderPass<B> {
        debug_assert!(self.frame_open, "recording outside a frame");
        let record = &mut self.passes[pass.0];
        debug_assert!(record.open, "pass already ended");
        record
    }

    pub fn clear(&mut self, pass: PassId, settings: ClearSettings) {
        self.open_pass(pass).cmds.push(PassCmd::Clear(settings));
    }

    pub fn set_viewport(&mut self, pass: PassId, rect: Rect) {
        self.open_pass(pass).cmds.push(PassCmd::Viewport(rect));
    }

    /// Record a triangle draw of `element_count` indices (or vertices, for
    /// non-indexed meshes) starting at `first_element`.
    pub fn draw(
        &mut self,
        pass: PassId,
        mesh: MeshId,
        pipeline: PipelineId,
        first_element: i32,
        element_count: i32,
    ) {
        self.draw_mode(
            pass,
            mesh,
            pipeline,
            DrawMode::Triangles,
            first_element,
            element_count,
            0,
        );
    }

    /// Record a draw with explicit topology and base vertex. Snapshots the
    /// pipeline's uniform block values into the frame arena, so later
    /// variable writes do not affect this draw.
    pub fn draw_mode(
        &mut self,
        pass: PassId,
        mesh: MeshId,
        pipeline: PipelineId,
        mode: DrawMode,
        first_element: i32,
        element_count: i32,
        base_vertex: i32,
    ) {
        debug_assert!(self.frame_open, "draw outside a frame");
        let Some(record) = self.pipelines.get(pipeline) else {
            debug_assert!(false, "stale pipeline handle");
            return;
        };
        let mut block_bindings = Vec::with_capacity(record.blocks.len());
        for block in &record.blocks {
            if block.data.is_empty() {
                continue;
            }
            let range = self.arena.write(&block.data);
            block_bindings.push(BlockBinding {
                binding_point: block.binding_point,
                byte_offset: range.byte_offset,
                byte_count: range.byte_count,
            });
        }
        self.open_pass(pass).cmds.push(PassCmd::Draw(DrawCmd {
            mesh,
            pipeline,
            first_element,
            element_count,
            base_vertex,
            mode,
            block_bindings,
        }));
    }

    /// Record a closure that runs against the raw backend with the pass's
    /// target bound. An error aborts the frame; playback of later passes is
    /// skipped and the error is returned from [`Self::end_frame`].
    pub fn custom_draw(
        &mut self,
        pass: PassId,
        f: impl FnOnce(&mut B) -> Result<(), GpuError> + 'static,
    ) {
        self.open_pass(pass).cmds.push(PassCmd::Custom(Box::new(f)));
    }

    /// Close a pass and append it to the frame's playback order.
    pub fn end_pass(&mut self, pass: PassId) {
        let record = self.open_pass(pass);
        record.open = false;
        self.pending.push(pass.0);
    }

    /// Upload the frame's uniform data and replay every ended pass. All
    /// pass objects are recycled whether or not playback succeeds.
    pub fn end_frame(&mut self) -> Result<FrameMetrics, GpuError> {
        debug_assert!(self.frame_open, "no frame open");
        debug_assert!(
            self.passes.iter().all(|p| !p.open),
            "all passes must be ended before end_frame"
        );
        self.frame_open = false;

        let buffer = self.arena.buffer();
        let staged = self.arena.end_frame();
        self.metrics.uniform_bytes = staged.len();
        if !staged.is_empty() {
            self.backend.upload_uniforms(buffer, staged);
        }

        let pending = std::mem::take(&mut self.pending);
        let mut player = Player::new(
            &mut self.backend,
            &self.programs,
            &self.pipelines,
            &self.meshes,
            &self.textures,
            &self.samplers,
            &mut self.render_targets,
            buffer,
            &mut self.metrics,
        );
        let mut result = Ok(());
        for &index in &pending {
            if result.is_err() {
                break;
            }
            let pass = &mut self.passes[index];
            let target = pass.target;
            let cmds = std::mem::take(&mut pass.cmds);
            result = player.play_pass(target, cmds);
        }

        // Recycle every pass object, executed or not.
        self.free_passes.clear();
        for (index, pass) in self.passes.iter_mut().enumerate() {
            pass.cmds.clear();
            pass.open = false;
            self.free_passes.push(index);
        }

        debug!(
            passes = self.metrics.passes,
            draw_calls = self.metrics.draw_calls,
            state_changes = self.metrics.state_changes,
            uniform_bytes = self.metrics.uniform_bytes,
            "frame played"
        );
        result.map(|()| self.metrics)
    }
}

/// Teardown releases every live native resource, attachment textures and
/// the uniform arena's backing buffer included.
impl<B: GpuBackend> Drop for RenderDevice<B> {
    fn drop(&mut self) {
        for mesh in self.meshes.drain() {
            self.backend.destroy_mesh(mesh.raw);
        }
        for buffer in self.vertex_buffers.drain() {
            self.backend.destroy_buffer(buffer.raw);
        }
        for buffer in self.index_buffers.drain() {
            self.backend.destroy_buffer(buffer.raw);
        }
        for texture in self.textures.drain() {
            self.backend.destroy_texture(texture.raw);
        }
        for sampler in self.samplers.drain() {
            self.backend.destroy_sampler(sampler.raw);
        }
        for target in self.render_targets.drain() {
            self.backend.destroy_render_target(target.fbo, target.msaa_fbo);
        }
        for program in self.programs.drain() {
            self.backend.destroy_program(program.raw);
        }
        self.backend.destroy_buffer(self.arena.buffer());
    }
}
