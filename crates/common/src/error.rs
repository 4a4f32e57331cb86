/// Errors surfaced by mesh generation, the update lifecycle and mesh sinks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("invalid grid config: {0}")]
    InvalidConfig(String),
    #[error("mesh already built; a lifecycle accepts a single build request")]
    AlreadyBuilt,
    #[error("background generation terminated before delivering buffers")]
    GenerationFailed,
    #[error("sink error: {0}")]
    Sink(String),
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSize { expected: usize, actual: usize },
}
