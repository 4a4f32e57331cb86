use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use planegrid_common::{Bounds, GridConfig, MeshError, Vertex};
use planegrid_displace::{NoiseSource, PerlinNoise, Plane, VertexDisplacementKernel};
use planegrid_grid::GridMesh;
use planegrid_render::{MeshSink, SubmeshDescriptor};

use crate::timer::FrameTimer;

/// Builds the mesh on the background thread.
pub type Generator = Arc<dyn Fn(&GridConfig) -> Result<GridMesh, MeshError> + Send + Sync>;

/// Whether buffers outlive the first publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Publish once, then release the CPU buffers.
    SingleShot,
    /// Keep the buffers and re-displace them every frame.
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Generating,
    Ready,
    Updating,
    Disposed,
}

/// One-shot completion handle returned by [`MeshBufferLifecycle::build`].
///
/// Becomes ready once the mesh has been published to the sink on the frame
/// context, not merely when the background generation finishes.
#[derive(Debug, Clone)]
pub struct BuildTicket {
    ready: Arc<AtomicBool>,
}

impl BuildTicket {
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Statistics of the most recent displacement frame.
#[derive(Debug, Clone, Default)]
pub struct UpdateStats {
    pub frames: u64,
    pub vertices_updated: usize,
    pub kernel_time: Duration,
    pub upload_time: Duration,
}

struct PendingBuild {
    rx: Receiver<Result<GridMesh, MeshError>>,
    worker: JoinHandle<()>,
    ready: Arc<AtomicBool>,
}

/// Owns the grid buffers across background generation and per-frame updates.
///
/// Every method is meant to be called from the frame context. The sink is
/// only ever touched from here, so renderer state never crosses threads.
pub struct MeshBufferLifecycle<S: MeshSink, N: NoiseSource = PerlinNoise> {
    sink: S,
    mode: UpdateMode,
    kernel: VertexDisplacementKernel<N>,
    generator: Generator,
    state: LifecycleState,
    pending: Option<PendingBuild>,
    mesh: Option<GridMesh>,
    config: Option<GridConfig>,
    stats: UpdateStats,
    timer: FrameTimer,
}

impl<S: MeshSink, N: NoiseSource> MeshBufferLifecycle<S, N> {
    pub fn new(sink: S, mode: UpdateMode, kernel: VertexDisplacementKernel<N>) -> Self {
        Self {
            sink,
            mode,
            kernel,
            generator: Arc::new(planegrid_grid::generate),
            state: LifecycleState::Uninitialized,
            pending: None,
            mesh: None,
            config: None,
            stats: UpdateStats::default(),
            timer: FrameTimer::default(),
        }
    }

    /// Replace the function run on the generation thread.
    pub fn with_generator(mut self, generator: Generator) -> Self {
        self.generator = generator;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn config(&self) -> Option<&GridConfig> {
        self.config.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn kernel(&self) -> &VertexDisplacementKernel<N> {
        &self.kernel
    }

    /// Retained vertices. `None` before publish, in single-shot mode after
    /// publish, and after disposal.
    pub fn vertices(&self) -> Option<&[Vertex]> {
        self.mesh.as_ref().map(GridMesh::vertices)
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.mesh.as_ref().map(GridMesh::indices)
    }

    pub fn stats(&self) -> &UpdateStats {
        &self.stats
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Start generating `config` on a background thread.
    ///
    /// The config is validated here so a bad request fails synchronously and
    /// leaves the lifecycle untouched. A lifecycle accepts one build.
    pub fn build(&mut self, config: GridConfig) -> Result<BuildTicket, MeshError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(MeshError::AlreadyBuilt);
        }
        config.validate()?;

        let (tx, rx) = mpsc::channel();
        let generator = Arc::clone(&self.generator);
        let worker = thread::Builder::new()
            .name("planegrid-generate".into())
            .spawn(move || {
                let _span = tracing::info_span!("background_generate").entered();
                let result = generator(&config);
                // The receiver is gone only if the lifecycle was dropped.
                let _ = tx.send(result);
            })
            .map_err(|e| {
                tracing::error!(error = %e, "failed to spawn generation thread");
                MeshError::GenerationFailed
            })?;

        let ready = Arc::new(AtomicBool::new(false));
        self.pending = Some(PendingBuild {
            rx,
            worker,
            ready: Arc::clone(&ready),
        });
        self.config = Some(config);
        self.state = LifecycleState::Generating;
        tracing::debug!(
            width = config.width,
            height = config.height,
            mode = ?self.mode,
            "generation started"
        );
        Ok(BuildTicket { ready })
    }

    /// Publish the mesh if background generation has finished.
    ///
    /// Never blocks. Returns `true` when this call performed the publish.
    pub fn poll(&mut self) -> Result<bool, MeshError> {
        let Some(pending) = self.pending.as_ref() else {
            return Ok(false);
        };
        let result = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return Ok(false),
            Err(TryRecvError::Disconnected) => Err(MeshError::GenerationFailed),
        };
        self.finish(result).map(|()| true)
    }

    /// Block the frame context until generation finishes, then publish.
    ///
    /// Returns immediately when nothing is being generated.
    pub fn wait_ready(&mut self) -> Result<(), MeshError> {
        let Some(pending) = self.pending.as_ref() else {
            return Ok(());
        };
        let result = pending
            .rx
            .recv()
            .unwrap_or(Err(MeshError::GenerationFailed));
        self.finish(result)
    }

    /// Advance one frame at animation time `time`.
    ///
    /// Publishes a freshly generated mesh if one arrived, then, in persistent
    /// mode and once ready, displaces every vertex (blocking until all worker
    /// batches have joined) and re-uploads the vertex buffer. Before the mesh
    /// is ready this is a no-op. Returns `true` when the kernel ran.
    pub fn per_frame_update(&mut self, time: f32) -> Result<bool, MeshError> {
        self.poll()?;

        if self.state != LifecycleState::Ready || self.mode != UpdateMode::Persistent {
            return Ok(false);
        }
        let Some(mesh) = self.mesh.as_mut() else {
            return Ok(false);
        };
        let _span = tracing::debug_span!("per_frame_update", time).entered();
        self.state = LifecycleState::Updating;

        let kernel_start = Instant::now();
        self.kernel.update(mesh.vertices_mut(), time);
        let kernel_time = kernel_start.elapsed();

        let upload_start = Instant::now();
        let count = mesh.vertex_count();
        let uploaded = self
            .sink
            .upload_vertex_buffer(mesh.vertices(), 0, count)
            .and_then(|()| self.sink.recompute_normals());
        let upload_time = upload_start.elapsed();
        self.state = LifecycleState::Ready;

        if let Err(e) = uploaded {
            tracing::error!(error = %e, "vertex upload failed");
            return Err(e);
        }

        self.stats = UpdateStats {
            frames: self.stats.frames + 1,
            vertices_updated: count,
            kernel_time,
            upload_time,
        };
        self.timer.record(kernel_time);
        tracing::trace!(
            vertices = count,
            kernel_us = kernel_time.as_micros() as u64,
            upload_us = upload_time.as_micros() as u64,
            "frame update complete"
        );
        Ok(true)
    }

    /// Release the buffers. Idempotent.
    ///
    /// If generation is still running this waits for the worker so its
    /// buffers are never freed mid-write; they are dropped unpublished.
    pub fn dispose(&mut self) {
        if self.state == LifecycleState::Disposed {
            return;
        }
        if let Some(pending) = self.pending.take() {
            tracing::debug!("dispose while generating, waiting for worker");
            drop(pending.rx);
            if pending.worker.join().is_err() {
                tracing::warn!("generation thread panicked");
            }
        }
        self.mesh = None;
        self.state = LifecycleState::Disposed;
        tracing::debug!("mesh buffers disposed");
    }

    fn finish(&mut self, result: Result<GridMesh, MeshError>) -> Result<(), MeshError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        if pending.worker.join().is_err() {
            tracing::warn!("generation thread panicked");
        }
        let mesh = match result {
            Ok(mesh) => mesh,
            Err(e) => {
                tracing::error!(error = %e, "background generation failed");
                self.state = LifecycleState::Uninitialized;
                self.config = None;
                return Err(e);
            }
        };

        self.kernel.set_plane(Plane::from_config(mesh.config()));
        let published = self.publish(&mesh);

        match self.mode {
            UpdateMode::Persistent => self.mesh = Some(mesh),
            UpdateMode::SingleShot => {
                drop(mesh);
                tracing::debug!("single-shot mode, buffers released after publish");
            }
        }
        self.state = LifecycleState::Ready;
        pending.ready.store(true, Ordering::Release);

        if let Err(e) = published {
            tracing::error!(error = %e, "mesh publish failed");
            return Err(e);
        }
        Ok(())
    }

    fn publish(&mut self, mesh: &GridMesh) -> Result<(), MeshError> {
        let _span = tracing::debug_span!(
            "publish_mesh",
            vertices = mesh.vertex_count(),
            indices = mesh.index_count()
        )
        .entered();

        let vertex_count = mesh.vertex_count();
        let index_count = mesh.index_count();
        self.sink.set_vertex_buffer_params(vertex_count)?;
        self.sink.set_index_buffer_params(index_count)?;
        self.sink
            .upload_vertex_buffer(mesh.vertices(), 0, vertex_count)?;
        self.sink.upload_index_buffer(mesh.indices(), 0, index_count)?;
        self.sink
            .define_submesh(SubmeshDescriptor::triangles(index_count))?;
        self.sink.set_bounds(self.publish_bounds(mesh))?;
        self.sink.recompute_normals()?;
        tracing::debug!("mesh published");
        Ok(())
    }

    /// Content bounds, widened along the height axis when the mesh will animate.
    fn publish_bounds(&self, mesh: &GridMesh) -> Bounds {
        let bounds = mesh.bounds();
        match self.mode {
            UpdateMode::SingleShot => bounds,
            UpdateMode::Persistent => {
                let (lo, hi) = self.kernel.params().height_range();
                bounds.include_range(self.kernel.plane().height_axis(), lo, hi)
            }
        }
    }
}

impl<S: MeshSink, N: NoiseSource> Drop for MeshBufferLifecycle<S, N> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planegrid_render::{CpuMeshSink, DebugTextSink};
    use std::sync::Mutex;

    fn persistent() -> MeshBufferLifecycle<CpuMeshSink> {
        MeshBufferLifecycle::new(
            CpuMeshSink::new(),
            UpdateMode::Persistent,
            VertexDisplacementKernel::default(),
        )
    }

    fn single_shot() -> MeshBufferLifecycle<CpuMeshSink> {
        MeshBufferLifecycle::new(
            CpuMeshSink::new(),
            UpdateMode::SingleShot,
            VertexDisplacementKernel::default(),
        )
    }

    /// A generator that blocks until the returned sender fires.
    fn gated_generator() -> (Generator, mpsc::Sender<()>) {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let generator: Generator = Arc::new(move |config: &GridConfig| {
            let _ = release_rx.lock().unwrap().recv();
            planegrid_grid::generate(config)
        });
        (generator, release_tx)
    }

    fn three_by_three() -> GridConfig {
        GridConfig::new(3, 3, 1.0)
    }

    #[test]
    fn update_before_build_is_noop() {
        let mut lc = persistent();
        assert_eq!(lc.per_frame_update(0.5), Ok(false));
        assert_eq!(lc.state(), LifecycleState::Uninitialized);
        assert_eq!(lc.sink().vertex_uploads(), 0);
        assert!(lc.vertices().is_none());
    }

    #[test]
    fn update_while_generating_is_noop() {
        let (generator, release) = gated_generator();
        let mut lc = persistent().with_generator(generator);
        let ticket = lc.build(three_by_three()).unwrap();

        for frame in 0..5 {
            assert_eq!(lc.per_frame_update(frame as f32), Ok(false));
            assert_eq!(lc.state(), LifecycleState::Generating);
        }
        assert_eq!(lc.sink().vertex_uploads(), 0);
        assert!(!ticket.is_ready());

        release.send(()).unwrap();
        lc.wait_ready().unwrap();
        assert!(ticket.is_ready());
        assert_eq!(lc.state(), LifecycleState::Ready);
        assert_eq!(lc.sink().vertex_uploads(), 1);
        assert_eq!(lc.sink().index_uploads(), 1);
    }

    #[test]
    fn publish_happens_on_poll_not_in_background() {
        let mut lc = persistent();
        let ticket = lc.build(three_by_three()).unwrap();
        // Give the worker ample time; nothing may reach the sink until polled.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(lc.sink().vertex_uploads(), 0);
        assert!(!ticket.is_ready());

        while !lc.poll().unwrap() {
            thread::yield_now();
        }
        assert!(ticket.is_ready());
        assert_eq!(lc.sink().vertex_uploads(), 1);
    }

    #[test]
    fn three_by_three_publish() {
        let mut lc = persistent();
        lc.build(three_by_three()).unwrap();
        lc.wait_ready().unwrap();

        let sink = lc.sink();
        assert_eq!(sink.vertices().len(), 9);
        assert_eq!(sink.indices().len(), 24);
        assert_eq!(sink.submesh().unwrap().index_count, 24);
        assert_eq!(sink.vertices()[4].position, [0.0, 0.0, 0.0]);
        assert_eq!(sink.vertices()[4].uv0, [0.5, 0.5]);
        assert_eq!(sink.normal_recomputes(), 1);

        let bounds = sink.bounds().unwrap();
        assert_eq!(bounds.min.x, -1.0);
        assert_eq!(bounds.max.y, 1.0);
        assert!(bounds.min.z <= -0.5 && bounds.max.z >= 0.6 - 1e-6);
    }

    #[test]
    fn frame_update_changes_only_height() {
        let mut lc = persistent();
        lc.build(three_by_three()).unwrap();
        lc.wait_ready().unwrap();
        let before = lc.vertices().unwrap().to_vec();

        assert_eq!(lc.per_frame_update(0.0), Ok(true));
        let after = lc.vertices().unwrap();
        for (b, a) in before.iter().zip(after) {
            assert_eq!(a.position[0].to_bits(), b.position[0].to_bits());
            assert_eq!(a.position[1].to_bits(), b.position[1].to_bits());
            assert_eq!(a.uv0, b.uv0);
            assert_eq!(a.uv1, b.uv1);
        }

        let sink = lc.sink();
        assert_eq!(sink.vertex_uploads(), 2);
        assert_eq!(sink.index_uploads(), 1);
        assert_eq!(sink.normal_recomputes(), 2);
        for (published, retained) in sink.vertices().iter().zip(after) {
            assert_eq!(published.position, retained.position);
        }
        assert_eq!(lc.stats().frames, 1);
        assert_eq!(lc.stats().vertices_updated, 9);
        assert_eq!(lc.timer().count(), 1);
        assert_eq!(lc.state(), LifecycleState::Ready);
    }

    #[test]
    fn frame_update_matches_kernel() {
        let config = GridConfig::new(12, 9, 0.3);
        let mut lc = persistent();
        lc.build(config).unwrap();
        lc.wait_ready().unwrap();
        lc.per_frame_update(2.5).unwrap();

        let mut expected = planegrid_grid::generate(&config).unwrap();
        VertexDisplacementKernel::default().update_serial(expected.vertices_mut(), 2.5);
        for (e, a) in expected.vertices().iter().zip(lc.vertices().unwrap()) {
            assert_eq!(e.position[2].to_bits(), a.position[2].to_bits());
        }
    }

    #[test]
    fn depth_grid_animates_along_y() {
        let config = GridConfig::new(5, 5, 0.5).with_depth(true);
        let mut lc = persistent();
        lc.build(config).unwrap();
        lc.wait_ready().unwrap();
        assert_eq!(lc.kernel().plane(), Plane::Xz);

        let before = lc.vertices().unwrap().to_vec();
        lc.per_frame_update(1.0).unwrap();
        for (b, a) in before.iter().zip(lc.vertices().unwrap()) {
            assert_eq!(a.position[0], b.position[0]);
            assert_eq!(a.position[2], b.position[2]);
        }
        let bounds = lc.sink().bounds().unwrap();
        assert!(bounds.min.y <= -0.5);
    }

    #[test]
    fn single_shot_releases_after_publish() {
        let mut lc = single_shot();
        let ticket = lc.build(three_by_three()).unwrap();
        lc.wait_ready().unwrap();

        assert!(ticket.is_ready());
        assert_eq!(lc.state(), LifecycleState::Ready);
        assert!(lc.vertices().is_none());
        assert_eq!(lc.sink().vertices().len(), 9);
        assert_eq!(lc.sink().bounds().unwrap().max.z, 0.0);

        assert_eq!(lc.per_frame_update(1.0), Ok(false));
        assert_eq!(lc.sink().vertex_uploads(), 1);
    }

    #[test]
    fn invalid_config_fails_synchronously() {
        let mut lc = persistent();
        assert!(matches!(
            lc.build(GridConfig::new(1, 3, 1.0)),
            Err(MeshError::InvalidConfig(_))
        ));
        assert_eq!(lc.state(), LifecycleState::Uninitialized);
        // Still usable after a rejected request.
        lc.build(three_by_three()).unwrap();
        lc.wait_ready().unwrap();
        assert_eq!(lc.state(), LifecycleState::Ready);
    }

    #[test]
    fn second_build_is_rejected() {
        let mut lc = persistent();
        lc.build(three_by_three()).unwrap();
        assert_eq!(lc.build(three_by_three()).unwrap_err(), MeshError::AlreadyBuilt);
        lc.wait_ready().unwrap();
        assert_eq!(lc.build(three_by_three()).unwrap_err(), MeshError::AlreadyBuilt);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut lc = persistent();
        lc.build(three_by_three()).unwrap();
        lc.wait_ready().unwrap();
        lc.dispose();
        assert_eq!(lc.state(), LifecycleState::Disposed);
        assert!(lc.vertices().is_none());
        lc.dispose();
        assert_eq!(lc.state(), LifecycleState::Disposed);
        assert_eq!(lc.per_frame_update(1.0), Ok(false));
    }

    #[test]
    fn dispose_while_generating_waits_for_worker() {
        let (generator, release) = gated_generator();
        let mut lc = persistent().with_generator(generator);
        let ticket = lc.build(three_by_three()).unwrap();

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            release.send(()).unwrap();
        });
        lc.dispose();
        releaser.join().unwrap();

        assert_eq!(lc.state(), LifecycleState::Disposed);
        assert!(!ticket.is_ready());
        assert_eq!(lc.sink().vertex_uploads(), 0);
        assert_eq!(lc.wait_ready(), Ok(()));
    }

    #[test]
    fn failing_generator_reports_error() {
        let generator: Generator = Arc::new(|_: &GridConfig| -> Result<GridMesh, MeshError> {
            Err(MeshError::Sink("boom".into()))
        });
        let mut lc = persistent().with_generator(generator);
        lc.build(three_by_three()).unwrap();
        assert_eq!(lc.wait_ready(), Err(MeshError::Sink("boom".into())));
        assert_eq!(lc.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn panicking_generator_is_generation_failed() {
        let generator: Generator = Arc::new(|_: &GridConfig| -> Result<GridMesh, MeshError> {
            panic!("generator panicked")
        });
        let mut lc = persistent().with_generator(generator);
        lc.build(three_by_three()).unwrap();
        assert_eq!(lc.wait_ready(), Err(MeshError::GenerationFailed));
        assert_eq!(lc.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn publish_order_on_debug_sink() {
        let mut lc = MeshBufferLifecycle::new(
            DebugTextSink::new(),
            UpdateMode::Persistent,
            VertexDisplacementKernel::default(),
        );
        lc.build(three_by_three()).unwrap();
        lc.wait_ready().unwrap();
        lc.per_frame_update(0.25).unwrap();

        let lines = lc.sink_mut().take_lines();
        let kinds: Vec<&str> = lines
            .iter()
            .map(|l| l.split_whitespace().next().unwrap_or(""))
            .collect();
        assert_eq!(
            kinds,
            [
                "vertex_params",
                "index_params",
                "upload_vertices",
                "upload_indices",
                "submesh",
                "bounds",
                "recompute_normals",
                "upload_vertices",
                "recompute_normals",
            ]
        );
    }

    #[test]
    fn drop_while_generating_does_not_hang() {
        let mut lc = persistent();
        lc.build(GridConfig::new(64, 64, 0.1)).unwrap();
        drop(lc);
    }
}
