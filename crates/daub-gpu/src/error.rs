use thiserror::Error;

/// Errors surfaced by resource construction and frame execution.
///
/// Contract violations (recording into a closed pass, overflowing the
/// uniform arena, nesting frames) are debug assertions, not error values;
/// see the crate docs.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),

    #[error("program link failed: {0}")]
    ProgramLink(String),

    #[error("render target is incomplete: {0}")]
    IncompleteRenderTarget(String),

    #[error("stale {kind} handle")]
    StaleHandle { kind: &'static str },

    #[error("program is still referenced by at least one pipeline")]
    ProgramInUse,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("custom draw failed: {0}")]
    CustomDraw(String),
}
