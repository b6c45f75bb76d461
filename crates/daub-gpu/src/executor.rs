//! Frame playback.
//!
//! [`Player`] replays the frame's passes against the backend in the order
//! the passes were ended. It keeps a memo of everything it last issued
//! (program, mesh, packed state word, uniform ranges, texture units) and
//! skips any call that would be a no-op, so the backend only sees real
//! transitions. The memo survives across pass boundaries; only a custom
//! draw wipes it.

use tracing::trace;

use crate::backend::{GpuBackend, RawId, ResolveRequest};
use crate::error::GpuError;
use crate::pass::{DrawCmd, PassCmd};
use crate::registry::Registry;
use crate::resources::{
    Mesh, Pipeline, Program, RenderTarget, RenderTargetId, Sampler, Texture,
};
use crate::state::{
    StateDiff, StateFlags, StateWord, BLEND_FUNC_MASKS, BLEND_MODE_MASKS, CULL_FACE_MASK,
    DEPTH_FUNC_MASK,
};
use crate::types::Rect;

/// Counters for one frame's playback, reset at `begin_frame`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameMetrics {
    pub passes: u32,
    pub draw_calls: u32,
    pub custom_draws: u32,
    /// Program binds actually issued after elision.
    pub program_binds: u32,
    /// Individual fixed-function state calls issued after elision.
    pub state_changes: u32,
    /// Uniform range binds issued after elision.
    pub uniform_rebinds: u32,
    /// Texture unit binds issued after elision.
    pub texture_binds: u32,
    /// Multisample resolves triggered by sampling an attachment.
    pub resolves: u32,
    /// Bytes of uniform data staged this frame.
    pub uniform_bytes: usize,
}

/// What the player last told the backend.
#[derive(Default)]
pub(crate) struct LastIssued {
    program: Option<RawId>,
    mesh: Option<RawId>,
    state: Option<StateWord>,
    viewport: Option<Rect>,
    scissor: Option<Option<Rect>>,
    /// Indexed by binding point.
    uniform_ranges: Vec<Option<(usize, usize)>>,
    /// Indexed by texture unit: (texture, sampler).
    textures: Vec<Option<(RawId, Option<RawId>)>>,
}

impl LastIssued {
    fn invalidate(&mut self) {
        *self = Self::default();
    }

    fn uniform_range(&mut self, binding_point: u32) -> &mut Option<(usize, usize)> {
        let index = binding_point as usize;
        if self.uniform_ranges.len() <= index {
            self.uniform_ranges.resize(index + 1, None);
        }
        &mut self.uniform_ranges[index]
    }

    fn texture_unit(&mut self, slot: u32) -> &mut Option<(RawId, Option<RawId>)> {
        let index = slot as usize;
        if self.textures.len() <= index {
            self.textures.resize(index + 1, None);
        }
        &mut self.textures[index]
    }
}

pub(crate) struct Player<'a, B: GpuBackend> {
    pub backend: &'a mut B,
    pub programs: &'a Registry<Program>,
    pub pipelines: &'a Registry<Pipeline>,
    pub meshes: &'a Registry<Mesh>,
    pub textures: &'a Registry<Texture>,
    pub samplers: &'a Registry<Sampler>,
    pub render_targets: &'a mut Registry<RenderTarget>,
    pub arena_buffer: RawId,
    pub metrics: &'a mut FrameMetrics,
    pub last: LastIssued,
    /// Framebuffer currently bound, for rebinding after resolves and custom
    /// draws.
    current_fbo: (Option<RawId>, u32),
}

impl<'a, B: GpuBackend> Player<'a, B> {
    pub fn new(
        backend: &'a mut B,
        programs: &'a Registry<Program>,
        pipelines: &'a Registry<Pipeline>,
        meshes: &'a Registry<Mesh>,
        textures: &'a Registry<Texture>,
        samplers: &'a Registry<Sampler>,
        render_targets: &'a mut Registry<RenderTarget>,
        arena_buffer: RawId,
        metrics: &'a mut FrameMetrics,
    ) -> Self {
        Self {
            backend,
            programs,
            pipelines,
            meshes,
            textures,
            samplers,
            render_targets,
            arena_buffer,
            metrics,
            last: LastIssued::default(),
            current_fbo: (None, 1),
        }
    }

    pub fn play_pass(
        &mut self,
        target: Option<RenderTargetId>,
        cmds: Vec<PassCmd<B>>,
    ) -> Result<(), GpuError> {
        self.metrics.passes += 1;
        self.bind_target(target, true)?;
        trace!(cmds = cmds.len(), "pass");

        for cmd in cmds {
            match cmd {
                PassCmd::Clear(settings) => self.backend.clear(&settings),
                PassCmd::Viewport(rect) => {
                    if self.last.viewport != Some(rect) {
                        self.backend.set_viewport(rect);
                        self.last.viewport = Some(rect);
                        self.metrics.state_changes += 1;
                    }
                }
                PassCmd::Draw(draw) => self.play_draw(&draw)?,
                PassCmd::Custom(f) => {
                    self.metrics.custom_draws += 1;
                    f(&mut *self.backend)?;
                    // The closure may have changed anything; drop all memos
                    // and restore the pass's framebuffer.
                    self.last.invalidate();
                    let (fbo, count) = self.current_fbo;
                    self.backend.bind_render_target(fbo, count);
                }
            }
        }
        Ok(())
    }

    fn play_draw(&mut self, draw: &DrawCmd) -> Result<(), GpuError> {
        // Copies of the shared registry refs, so lookups do not hold a
        // borrow of `self` across the mutating calls below.
        let pipelines = self.pipelines;
        let programs = self.programs;
        let meshes = self.meshes;
        let textures = self.textures;
        let samplers = self.samplers;

        let pipeline = pipelines
            .get(draw.pipeline)
            .ok_or(GpuError::StaleHandle { kind: "pipeline" })?;
        let program = programs
            .get(pipeline.program)
            .ok_or(GpuError::StaleHandle { kind: "program" })?;
        let mesh = meshes
            .get(draw.mesh)
            .ok_or(GpuError::StaleHandle { kind: "mesh" })?;

        if self.last.program != Some(program.raw) {
            self.backend.bind_program(program.raw);
            self.last.program = Some(program.raw);
            self.metrics.program_binds += 1;
        }

        self.apply_state(pipeline);

        for binding in &draw.block_bindings {
            let range = (binding.byte_offset, binding.byte_count);
            let slot = self.last.uniform_range(binding.binding_point);
            if *slot != Some(range) {
                *slot = Some(range);
                self.backend.bind_uniform_range(
                    self.arena_buffer,
                    binding.binding_point,
                    binding.byte_offset,
                    binding.byte_count,
                );
                self.metrics.uniform_rebinds += 1;
            }
        }

        for (unit, slot) in pipeline.textures.iter().enumerate() {
            let Some(texture_id) = slot.texture else {
                continue;
            };
            // A slot whose texture or sampler has been destroyed reads as
            // unbound; the draw itself is unaffected.
            let Some(texture) = textures.get(texture_id) else {
                continue;
            };
            let texture_raw = texture.raw;
            if let Some(owner) = texture.owner {
                self.resolve_if_dirty(owner)?;
            }
            let sampler_raw = slot
                .sampler
                .and_then(|sampler_id| samplers.get(sampler_id))
                .map(|sampler| sampler.raw);
            let unit = unit as u32;
            let memo = self.last.texture_unit(unit);
            if *memo != Some((texture_raw, sampler_raw)) {
                *memo = Some((texture_raw, sampler_raw));
                self.backend.bind_texture(unit, texture_raw, sampler_raw);
                self.metrics.texture_binds += 1;
            }
        }

        if self.last.mesh != Some(mesh.raw) {
            self.backend.bind_mesh(mesh.raw);
            self.last.mesh = Some(mesh.raw);
        }

        if mesh.index_buffer.is_some() {
            self.backend.draw_indexed(
                draw.mode,
                draw.first_element,
                draw.element_count,
                draw.base_vertex,
            );
        } else {
            self.backend
                .draw_arrays(draw.mode, draw.first_element, draw.element_count);
        }
        self.metrics.draw_calls += 1;
        Ok(())
    }

    /// Issue only the fixed-function calls whose packed bits changed since
    /// the last draw.
    fn apply_state(&mut self, pipeline: &Pipeline) {
        let word = pipeline.state;
        let diff = match self.last.state {
            Some(prev) => prev.diff(word),
            None => StateDiff::all(),
        };

        if diff.flag_changed(StateFlags::DEPTH_TEST) {
            self.backend
                .set_depth_test(word.contains(StateFlags::DEPTH_TEST));
            self.metrics.state_changes += 1;
        }
        if diff.flag_changed(StateFlags::DEPTH_WRITE) {
            self.backend
                .set_depth_write(word.contains(StateFlags::DEPTH_WRITE));
            self.metrics.state_changes += 1;
        }
        if diff.field_changed(DEPTH_FUNC_MASK) {
            self.backend.set_depth_function(word.depth_function());
            self.metrics.state_changes += 1;
        }
        if diff.flag_changed(StateFlags::MULTISAMPLE) {
            self.backend
                .set_multisample(word.contains(StateFlags::MULTISAMPLE));
            self.metrics.state_changes += 1;
        }
        if diff.flag_changed(StateFlags::BLEND) {
            self.backend.set_blend(word.contains(StateFlags::BLEND));
            self.metrics.state_changes += 1;
        }
        if diff.field_changed(BLEND_MODE_MASKS) {
            let (color, alpha) = word.blend_modes();
            self.backend.set_blend_modes(color, alpha);
            self.metrics.state_changes += 1;
        }
        if diff.field_changed(BLEND_FUNC_MASKS) {
            self.backend.set_blend_functions(word.blend_functions());
            self.metrics.state_changes += 1;
        }
        if diff.flag_changed(StateFlags::COLOR_WRITE_MASK) {
            self.backend.set_color_write(word.color_write());
            self.metrics.state_changes += 1;
        }
        if diff.flag_changed(StateFlags::FRONT_FACE_CW) {
            let direction = if word.contains(StateFlags::FRONT_FACE_CW) {
                crate::types::FaceDirection::Clockwise
            } else {
                crate::types::FaceDirection::CounterClockwise
            };
            self.backend.set_front_face(direction);
            self.metrics.state_changes += 1;
        }
        if diff.field_changed(CULL_FACE_MASK) {
            self.backend.set_cull_face(word.cull_face());
            self.metrics.state_changes += 1;
        }

        // The scissor rect lives outside the word, so compare it directly
        // whenever the pipeline carries one or the enable bit flipped.
        let scissor = if word.contains(StateFlags::SCISSOR_TEST) {
            pipeline.scissor
        } else {
            None
        };
        if self.last.scissor != Some(scissor) {
            self.backend.set_scissor(scissor);
            self.last.scissor = Some(scissor);
            self.metrics.state_changes += 1;
        }

        // A pipeline without a viewport inherits whatever is current.
        if word.contains(StateFlags::VIEWPORT) && self.last.viewport != Some(pipeline.viewport) {
            self.backend.set_viewport(pipeline.viewport);
            self.last.viewport = Some(pipeline.viewport);
            self.metrics.state_changes += 1;
        }

        self.last.state = Some(word);
    }

    fn bind_target(
        &mut self,
        target: Option<RenderTargetId>,
        mark_dirty: bool,
    ) -> Result<(), GpuError> {
        let (fbo, count) = match target {
            None => (None, 1),
            Some(id) => {
                let rt = self
                    .render_targets
                    .get_mut(id)
                    .ok_or(GpuError::StaleHandle {
                        kind: "render target",
                    })?;
                if rt.msaa_fbo.is_some() && mark_dirty {
                    rt.msaa_dirty = true;
                }
                (
                    Some(rt.msaa_fbo.unwrap_or(rt.fbo)),
                    rt.color_attachment_count,
                )
            }
        };
        self.current_fbo = (fbo, count);
        self.backend.bind_render_target(fbo, count);
        Ok(())
    }

    /// Blit a multisampled target into its single-sample textures before
    /// they get sampled, then restore the current framebuffer. The restore
    /// must not re-mark the target dirty.
    fn resolve_if_dirty(&mut self, owner: RenderTargetId) -> Result<(), GpuError> {
        let Some(rt) = self.render_targets.get_mut(owner) else {
            return Err(GpuError::StaleHandle {
                kind: "render target",
            });
        };
        let Some(msaa_fbo) = rt.msaa_fbo else {
            return Ok(());
        };
        if !rt.msaa_dirty {
            return Ok(());
        }
        rt.msaa_dirty = false;
        let request = ResolveRequest {
            msaa_fbo,
            fbo: rt.fbo,
            width: rt.width,
            height: rt.height,
            color_attachment_count: rt.color_attachment_count,
            resolve_depth: rt.has_depth,
        };
        self.backend.resolve_render_target(&request);
        self.metrics.resolves += 1;
        let (fbo, count) = self.current_fbo;
        self.backend.bind_render_target(fbo, count);
        Ok(())
    }
}
