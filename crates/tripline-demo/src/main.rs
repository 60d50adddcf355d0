//! Headless tripline driver
//!
//! Builds a trip layer from synthetic trips, attaches it to a CPU engine and draws
//! frames while simulating a zoom gesture, logging how much of the network the
//! trail currently lights up.

mod engine;
mod logging;
mod settings;
mod synthetic;

use clap::Parser;
use engine::{EngineError, HeadlessEngine};
use settings::Settings;
use std::time::Duration;
use tripline_lib::{
    Interaction, LayerError, StyleError, TripError, TripLayer, WebMercatorProjector,
};

/// Error types for the demo run
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("Invalid options: {0}")]
    Options(#[from] serde_json::Error),

    #[error(transparent)]
    Trip(#[from] TripError),

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Layer(#[from] LayerError<EngineError>),
}

fn main() {
    let settings = Settings::parse();
    logging::setup_logging();

    if let Err(e) = run(&settings) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(settings: &Settings) -> Result<(), DemoError> {
    let options = settings.layer_options()?;
    let trips = synthetic::generate_trips(
        settings.trips,
        settings.points_per_trip,
        (settings.lon, settings.lat),
    )?;
    tracing::info!(
        "Generated {} synthetic trips ({} points)",
        trips.line_count(),
        trips.vertex_count()
    );

    let mut projector =
        WebMercatorProjector::new(settings.zoom).with_center(settings.lon, settings.lat);
    let mut layer = TripLayer::new("trips", trips, options)?;
    layer.add_to(&projector, HeadlessEngine::new())?;

    // Pan over the first quarter, then zoom over the middle half and settle
    let zoom_start = settings.frames / 4;
    let zoom_end = 3 * settings.frames / 4;
    let clock = instant::Instant::now();
    let mut skipped = 0;

    for frame in 0..settings.frames {
        let now = if settings.realtime {
            clock.elapsed().as_secs_f64()
        } else {
            frame as f64 * settings.frame_interval
        };

        let moving = frame < zoom_start;
        let zooming = (zoom_start..zoom_end).contains(&frame);
        if moving {
            projector.pan_by(settings.pan_step, 0.0);
        } else if zooming {
            let progress = (frame - zoom_start) as f64 / (zoom_end - zoom_start) as f64;
            projector.set_zoom(settings.zoom + progress);
        } else if frame == zoom_end {
            projector.set_zoom(settings.zoom + 1.0);
            projector.set_reference_zoom(settings.zoom + 1.0);
            layer.refresh_projection(&projector)?;
        }

        let interaction = if moving {
            Some(Interaction::Moving)
        } else if zooming {
            Some(Interaction::Zooming)
        } else {
            None
        };
        if interaction.is_some_and(|i| !layer.should_redraw_during(i)) {
            skipped += 1;
        } else if layer.draw(now, &projector)? && frame % 50 == 0 {
            log_frame(frame, &layer);
        }

        if settings.realtime {
            std::thread::sleep(Duration::from_secs_f64(settings.frame_interval.max(0.0)));
        }
    }

    if let Some(renderer) = layer.renderer() {
        let engine = renderer.engine();
        tracing::info!(
            "Drew {} frames ({} skipped during interaction), uploaded {} bytes, {} live meshes",
            engine.frames(),
            skipped,
            engine.uploaded_bytes(),
            engine.live_meshes()
        );
    }
    layer.remove();
    Ok(())
}

fn log_frame(frame: usize, layer: &TripLayer<HeadlessEngine>) {
    let Some(stats) = layer
        .renderer()
        .and_then(|renderer| renderer.engine().last_frame())
    else {
        return;
    };
    tracing::info!(
        "Frame {}: t={:.1}, {}/{} segments lit",
        frame,
        stats.current_time,
        stats.lit_segments,
        stats.total_segments
    );
}
