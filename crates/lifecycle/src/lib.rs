//! Mesh buffer lifecycle: owns grid buffers from background generation to disposal.
//!
//! # Invariants
//! - Only the frame context (the thread calling `per_frame_update`) talks to the sink.
//! - The vertex buffer has one writer at a time: the generator thread while
//!   generating, the kernel's worker batch while updating.
//! - A frame never publishes a partially generated or partially updated buffer.
//!
//! Generation runs on a background thread and hands its buffers back over a
//! channel that the frame context drains once per frame.

mod lifecycle;
mod timer;

pub use lifecycle::{
    BuildTicket, Generator, LifecycleState, MeshBufferLifecycle, UpdateMode, UpdateStats,
};
pub use timer::FrameTimer;

pub fn crate_info() -> &'static str {
    "planegrid-lifecycle v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("lifecycle"));
    }
}
