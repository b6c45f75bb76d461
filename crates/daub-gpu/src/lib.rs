//! Retained-command rendering frontend.
//!
//! `daub-gpu` sits between application code and a native graphics API. The
//! application creates resources through a [`RenderDevice`], then each frame
//! records clears, viewport changes and draws into pooled render passes.
//! Ending the frame uploads all staged uniform data in one call and replays
//! the passes against a [`GpuBackend`], eliding every bind and
//! fixed-function transition that would be a no-op.
//!
//! The key pieces:
//!
//! - [`state::StateWord`]: a pipeline's fixed-function configuration packed
//!   into 64 bits, diffed with one XOR per draw.
//! - [`arena::UniformArena`]: a per-frame bump arena for uniform data; draws
//!   bind aligned sub-ranges of a single buffer.
//! - [`registry::Registry`]: generational storage, so handles to destroyed
//!   resources go stale instead of aliasing their replacements.
//! - [`executor`]: frame playback with cross-pass state elision.
//!
//! Backends implement [`GpuBackend`]; see the `daub-gl` crate for the
//! OpenGL implementation.

pub mod arena;
pub mod backend;
pub mod device;
pub mod error;
pub mod executor;
pub mod pass;
pub mod reflection;
pub mod registry;
pub mod resources;
pub mod state;
pub mod types;

pub use backend::{
    BackendCapabilities, CompiledProgram, GpuBackend, MeshBufferDesc, MeshVertexBuffer,
    NativeAttachment, NativeRenderTarget, RawId, ReadRegion, ResolveRequest,
};
pub use device::{DeviceConfig, RenderDevice};
pub use error::GpuError;
pub use executor::FrameMetrics;
pub use pass::PassId;
pub use reflection::{BlockUniform, ProgramReflection, TextureBinding, UniformBlock, UniformType};
pub use registry::Handle;
pub use resources::{
    DestroyAttachments, IndexBufferId, MeshId, PipelineId, PipelineTextureSlot, PipelineVariable,
    ProgramId, RenderTargetId, SamplerId, TextureId, VertexBufferId,
};
pub use state::{StateDiff, StateFlags, StateWord};
pub use types::*;
