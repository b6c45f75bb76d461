//! Render pass recording.
//!
//! A pass is a command list targeting one render target (or the default
//! framebuffer). Passes are pooled by the device: ending a frame recycles
//! every pass object for the next frame, so steady-state recording performs
//! no allocation beyond command vector growth.

use std::fmt;

use crate::backend::GpuBackend;
use crate::error::GpuError;
use crate::resources::{MeshId, PipelineId, RenderTargetId};
use crate::types::{ClearSettings, DrawMode, Rect};

/// Handle to a pass acquired this frame. Only valid until the frame ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassId(pub(crate) usize);

/// One uniform block bind of a draw, captured as a range of the frame's
/// uniform arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockBinding {
    pub binding_point: u32,
    pub byte_offset: usize,
    pub byte_count: usize,
}

/// A recorded mesh draw.
#[derive(Clone, Debug)]
pub struct DrawCmd {
    pub mesh: MeshId,
    pub pipeline: PipelineId,
    /// First index for indexed meshes, first vertex otherwise.
    pub first_element: i32,
    pub element_count: i32,
    /// Added to each fetched index; ignored for non-indexed meshes.
    pub base_vertex: i32,
    pub mode: DrawMode,
    pub block_bindings: Vec<BlockBinding>,
}

/// One recorded command of a pass.
pub enum PassCmd<B: GpuBackend> {
    Clear(ClearSettings),
    Viewport(Rect),
    Draw(DrawCmd),
    /// Escape hatch: runs against the raw backend with the pass's target
    /// bound. Invalidates all cached bind/state memos.
    Custom(Box<dyn FnOnce(&mut B) -> Result<(), GpuError>>),
}

impl<B: GpuBackend> fmt::Debug for PassCmd<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear(settings) => f.debug_tuple("Clear").field(settings).finish(),
            Self::Viewport(rect) => f.debug_tuple("Viewport").field(rect).finish(),
            Self::Draw(cmd) => f.debug_tuple("Draw").field(cmd).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A pooled pass object.
pub(crate) struct RenderPass<B: GpuBackend> {
    pub target: Option<RenderTargetId>,
    pub cmds: Vec<PassCmd<B>>,
    /// Recording is only legal between acquire and end.
    pub open: bool,
}

impl<B: GpuBackend> RenderPass<B> {
    pub fn new(target: Option<RenderTargetId>) -> Self {
        Self {
            target,
            cmds: Vec::new(),
            open: true,
        }
    }

    /// Rearm a recycled pass, keeping its command vector's capacity.
    pub fn reset(&mut self, target: Option<RenderTargetId>) {
        self.target = target;
        self.cmds.clear();
        self.open = true;
    }
}
