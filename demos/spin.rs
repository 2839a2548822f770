//! Spinning tesseract, driven headless - demonstrates a UI thread feeding the render loop.
//!
//! Run with `RUST_LOG=debug cargo run --example spin` to watch slot allocation.

use std::thread;
use std::time::Duration;

use tesseract::{AppConfig, Geometry, RenderLoop, RotationPlane, Visualizer};

const FRAMES: u32 = 120;

fn main() -> tesseract::Result<()> {
    env_logger::init();

    let mut render_loop = RenderLoop::new(AppConfig::new().visualizer(Visualizer::Wireframe))?;
    render_loop.add_geometry(Geometry::grid(), None)?;
    let hypercube = render_loop.add_geometry(Geometry::tesseract(1.0)?, None)?;
    render_loop.add_geometry(Geometry::axis(), Some(hypercube))?;

    // Stand-in for touch input: rotates the hypercube and orbits the camera.
    let handle = render_loop.handle();
    let input = thread::spawn(move || -> tesseract::Result<()> {
        for step in 0..FRAMES {
            handle.with(|data| {
                data.camera.orbit(0.01, 0.0);
                if step == FRAMES / 2 {
                    data.visualizer = Visualizer::CollapseZ;
                }
                data.hierarchy.rotate(hypercube, RotationPlane::XQ, 0.02)?;
                data.hierarchy.rotate(hypercube, RotationPlane::ZX, 0.005)
            })?;
            thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    });

    let mut bytes = 0;
    for _ in 0..FRAMES {
        let frame = render_loop.frame()?;
        bytes += frame.vertex_bytes().len() + frame.matrix_bytes().len();
        if frame.index % 30 == 0 {
            let first = frame.vertices.first().map(|v| v.position);
            println!(
                "frame {:>3}: {} vertices, {} matrices, first vertex {:?}, {:.0} fps",
                frame.index,
                frame.vertices.len(),
                frame.active_count,
                first,
                frame.fps()
            );
        }
        thread::sleep(Duration::from_millis(2));
    }

    match input.join() {
        Ok(result) => result?,
        Err(_) => eprintln!("input thread panicked"),
    }
    println!("staged {} KiB for upload", bytes / 1024);
    Ok(())
}
