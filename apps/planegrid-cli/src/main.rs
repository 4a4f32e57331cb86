mod config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use planegrid_common::Vertex;
use planegrid_displace::{AnimationClock, PerlinNoise, Plane, VertexDisplacementKernel};
use planegrid_lifecycle::{MeshBufferLifecycle, UpdateMode};
use planegrid_render::{CpuMeshSink, MeshSink};
use planegrid_render_wgpu::{GpuMeshSink, headless_device};
use tracing_subscriber::EnvFilter;

use crate::config::{SceneArgs, SceneConfig};

#[derive(Parser)]
#[command(name = "planegrid-cli", about = "Generate, animate and export noise-displaced grid meshes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, crate info and the vertex layout
    Info,
    /// Build a grid and print its counts, bounds and corner vertices
    Generate {
        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Drive the buffer lifecycle for a number of frames
    Animate {
        #[command(flatten)]
        scene: SceneArgs,
        /// Frames to run after the build is requested
        #[arg(short, long, default_value = "120")]
        frames: u32,
        /// Seconds per frame
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// Publish once and release buffers instead of animating
        #[arg(long)]
        single_shot: bool,
        /// Publish to a headless wgpu device instead of a CPU sink
        #[arg(long)]
        gpu: bool,
    },
    /// Write raw vertex and index buffers to `<out>.vtx` and `<out>.idx`
    Export {
        #[command(flatten)]
        scene: SceneArgs,
        /// Output path stem
        #[arg(short, long)]
        out: PathBuf,
        /// Displace at this animation time before writing
        #[arg(long)]
        time: Option<f32>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("planegrid-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", planegrid_render::crate_info());
            println!("lifecycle: {}", planegrid_lifecycle::crate_info());
            println!("vertex stride: {} bytes", Vertex::STRIDE);
            for attr in Vertex::ATTRIBUTES {
                println!(
                    "  {:?}: {:?}x{} @ {}",
                    attr.semantic, attr.format, attr.components, attr.offset
                );
            }
        }
        Commands::Generate { scene } => {
            let scene = scene.resolve()?;
            let mesh = planegrid_grid::generate(&scene.grid)?;
            let bounds = mesh.bounds();
            println!(
                "Grid {}x{} scale={} depth={}",
                scene.grid.width, scene.grid.height, scene.grid.scale, scene.grid.use_depth
            );
            println!(
                "vertices={} indices={} quads={}",
                mesh.vertex_count(),
                mesh.index_count(),
                mesh.quad_count()
            );
            println!(
                "bounds min={} max={} size={}",
                bounds.min,
                bounds.max,
                bounds.size()
            );
            let (w, h) = (scene.grid.width - 1, scene.grid.height - 1);
            for (x, y) in [(0, 0), (w, 0), (0, h), (w, h)] {
                if let Some(v) = mesh.vertex(x, y) {
                    println!("  ({x}, {y}): pos={} uv={}", v.position(), v.uv0());
                }
            }
        }
        Commands::Animate {
            scene,
            frames,
            dt,
            single_shot,
            gpu,
        } => {
            let scene = scene.resolve()?;
            let mode = if single_shot {
                UpdateMode::SingleShot
            } else {
                UpdateMode::Persistent
            };
            if gpu {
                let (device, queue) = headless_device()?;
                let mut sink = GpuMeshSink::new(&device, &queue);
                animate(&mut sink, &scene, mode, frames, dt)?;
                sink.flush();
                println!(
                    "gpu: submesh={:?} bounds={:?}",
                    sink.submesh(),
                    sink.bounds()
                );
            } else {
                let mut sink = CpuMeshSink::new();
                animate(&mut sink, &scene, mode, frames, dt)?;
                println!(
                    "sink: vertex_uploads={} normal_recomputes={}",
                    sink.vertex_uploads(),
                    sink.normal_recomputes()
                );
            }
        }
        Commands::Export { scene, out, time } => {
            let scene = scene.resolve()?;
            export(&scene, &out, time)?;
        }
    }

    Ok(())
}

fn kernel_for(scene: &SceneConfig) -> VertexDisplacementKernel {
    let kernel = VertexDisplacementKernel::new(PerlinNoise::new(scene.seed), scene.displacement);
    tracing::debug!(
        seed = kernel.noise().seed(),
        batch_size = kernel.params().batch_size,
        "displacement kernel ready"
    );
    kernel
}

/// Wall-clock pause per frame while waiting for generation.
fn frame_duration(dt: f32) -> anyhow::Result<Duration> {
    anyhow::ensure!(
        dt.is_finite() && dt >= 0.0,
        "--dt must be a finite, non-negative number of seconds, got {dt}"
    );
    Ok(Duration::try_from_secs_f32(dt)?)
}

/// Run the lifecycle frame by frame against a borrowed sink.
fn animate<S: MeshSink>(
    sink: &mut S,
    scene: &SceneConfig,
    mode: UpdateMode,
    frames: u32,
    dt: f32,
) -> anyhow::Result<()> {
    let mut lifecycle = MeshBufferLifecycle::new(sink, mode, kernel_for(scene));
    let frame_time = frame_duration(dt)?;
    let ticket = lifecycle.build(scene.grid)?;
    let mut clock = AnimationClock::default();
    let mut ready_at = None;

    for frame in 0..frames {
        let time = clock.advance(dt);
        lifecycle.per_frame_update(time)?;
        if ready_at.is_none() && ticket.is_ready() {
            ready_at = Some(frame);
            tracing::info!(frame, "mesh published");
        }
        if !ticket.is_ready() {
            std::thread::sleep(frame_time);
        }
    }
    if !ticket.is_ready() {
        tracing::info!("frames exhausted before publish, waiting for generation");
        lifecycle.wait_ready()?;
    }

    let stats = lifecycle.stats();
    let timer = lifecycle.timer();
    println!(
        "mode={:?} ready_at_frame={} state={:?}",
        lifecycle.mode(),
        ready_at.map_or_else(|| "never".to_string(), |f| f.to_string()),
        lifecycle.state()
    );
    println!(
        "updated_frames={} vertices={} time={:.3} speed={}",
        stats.frames,
        stats.vertices_updated,
        clock.time(),
        clock.speed()
    );
    println!(
        "kernel avg={:?} min={:?} max={:?} (last {} frames)",
        timer.average(),
        timer.min(),
        timer.max(),
        timer.count()
    );

    lifecycle.dispose();
    Ok(())
}

fn export(scene: &SceneConfig, out: &Path, time: Option<f32>) -> anyhow::Result<()> {
    let mut mesh = planegrid_grid::generate(&scene.grid)?;
    if let Some(time) = time {
        let kernel = kernel_for(scene).with_plane(Plane::from_config(&scene.grid));
        kernel.update(mesh.vertices_mut(), time);
    }
    let (_, mut vertices, indices) = mesh.into_parts();
    planegrid_render::recompute_normals(&mut vertices, &indices);

    let vtx_path = out.with_extension("vtx");
    let idx_path = out.with_extension("idx");
    std::fs::write(&vtx_path, bytemuck::cast_slice::<Vertex, u8>(&vertices))?;
    std::fs::write(&idx_path, bytemuck::cast_slice::<u32, u8>(&indices))?;
    println!(
        "wrote {} ({} vertices, stride {}) and {} ({} indices)",
        vtx_path.display(),
        vertices.len(),
        Vertex::STRIDE,
        idx_path.display(),
        indices.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_accepts_normal_steps() {
        assert_eq!(frame_duration(0.0).unwrap(), Duration::ZERO);
        assert_eq!(frame_duration(0.5).unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn frame_duration_rejects_bad_steps() {
        assert!(frame_duration(f32::INFINITY).is_err());
        assert!(frame_duration(f32::NAN).is_err());
        assert!(frame_duration(-0.016).is_err());
        assert!(frame_duration(f32::MAX).is_err());
    }
}
