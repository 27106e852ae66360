//! Panel: a strip of labelled knobs, batched and dispatched for a few frames.
//!
//! Run with `RUST_LOG=debug` to see culling, batching and reset summaries.

use konsol::prelude::*;

/// Stands in for a GPU backend: counts what it would draw.
#[derive(Default)]
struct ConsoleBackend {
    draw_calls: usize,
    sprites: usize,
}

impl RenderDispatch for ConsoleBackend {
    fn begin_layer(&mut self, layer: usize) {
        log::info!("layer {layer}");
    }

    fn draw_job(&mut self, layer: usize, job: &DrawJob) {
        self.draw_calls += 1;
        let sprites = job.batch_entries().len().max(1);
        self.sprites += sprites;
        match job.text() {
            Some(text) => log::info!("  [{layer}] z={} text {:?}", job.z_order(), text.lines),
            None => log::info!(
                "  [{layer}] z={} {:?} at {} ({sprites} sprite(s))",
                job.z_order(),
                job.shape(),
                job.position()
            ),
        }
    }
}

/// A 32x32 knob cap: opaque disc on a transparent background.
fn knob_pixels() -> Vec<u8> {
    let mut pixels = vec![0u8; 32 * 32 * 4];
    for y in 0..32 {
        for x in 0..32 {
            let (dx, dy) = (x as f32 - 15.5, y as f32 - 15.5);
            if dx * dx + dy * dy <= 15.0 * 15.0 {
                let i = (y * 32 + x) * 4;
                pixels[i..i + 4].copy_from_slice(&[180, 180, 190, 255]);
            }
        }
    }
    pixels
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = RenderConfig::from_json_str(r#"{ "width": 640, "height": 200, "layers": 3 }"#)?;
    let mut surfaces = SurfaceStore::new();
    let mut fonts = FontStore::new();
    let mut frame = FrameContext::new(&config);
    let mut backend = ConsoleBackend::default();
    #[cfg(feature = "diagnostics")]
    let mut diag = DiagSender::new();

    let knob = surfaces.create(32, 32, knob_pixels(), true)?;
    let font = fonts.insert(MonospaceShaper::new(7.0, 12.0));
    let dimmed = VisualFilter::IDENTITY.brightness(-0.3);

    for tick in 0..3u32 {
        // Background plate.
        let plate = Sprite::shape(ShapeKind::FilledRectangle, 640, 200).color(Color::rgb(0.1, 0.1, 0.12));
        frame.submit_sprite(&mut surfaces, &plate, 0);

        // Nine knobs, every third one muted and dimmed. The ninth lands past the right edge.
        for channel in 0..9 {
            let muted = channel % 3 == 2;
            surfaces.set_filter(knob, if muted { dimmed } else { VisualFilter::IDENTITY });
            let angle = (tick + channel) as f32 * 0.3;
            let sprite = Sprite::new(knob, Rect::from_size(32, 32))
                .at(20.0 + channel as f32 * 80.0, 60.0)
                .rotation(angle, Vec2::new(16.0, 16.0))
                .flags(DrawFlags::BATCH);
            frame.submit_sprite(&mut surfaces, &sprite, 1);

            let label = TextJob::new(font, format!("ch {}", channel + 1))
                .at(20.0 + channel as f32 * 80.0, 100.0)
                .max_size(64.0, 24.0)
                .align(Align::Center);
            frame.submit_text(&mut fonts, &label, 2);
        }

        frame.build_batches(&mut surfaces);
        frame.dispatch(&mut backend);

        let stats = frame.stats();
        log::info!(
            "frame {}: {} submitted, {} culled, {} merged",
            stats.frame,
            stats.submitted,
            stats.culled,
            stats.batched
        );
        #[cfg(feature = "diagnostics")]
        if let Some(diag) = diag.as_mut() {
            diag.send(&stats);
        }
        frame.frame_reset(&mut surfaces, &mut fonts);
    }

    println!(
        "{} draw calls for {} sprites over 3 frames",
        backend.draw_calls, backend.sprites
    );
    Ok(())
}
