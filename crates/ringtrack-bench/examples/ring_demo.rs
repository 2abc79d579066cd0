//! Track a beam around a small ring and report losses per turn block.
//!
//! ```text
//! RUST_LOG=debug cargo run -p ringtrack-bench --example ring_demo -- [tracker.toml]
//! ```

use ringtrack_bench::{beam_profile, ring_profile};
use ringtrack_engine::{MonitorRequest, TrackRequest, Tracker, TrackerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrackerConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => TrackerConfig::default(),
    };
    log::info!("tracking on {}", config.backend);

    let line = ring_profile(16)?;
    println!(
        "=== ringtrack demo: {} elements, {:.1} m ===\n",
        line.len(),
        line.total_length()
    );
    let mut tracker = Tracker::new(line, config)?;
    let mut particles = beam_profile(5_000, 42, 1.2e-2)?;

    for block in 0..5 {
        let out = tracker.track(
            &mut particles,
            TrackRequest::turns(200).monitor(MonitorRequest::On),
        )?;
        let recording = out.recording.as_ref();
        let x0 = recording.and_then(|m| m.get(0, 0)).map(|p| p.x);
        println!(
            "turns {:>4}..{:>4}: {:>5} alive, {:>4} lost this block, {:>8} us{}, first x {:?}",
            block * 200,
            (block + 1) * 200,
            particles.num_alive(),
            out.metrics.newly_lost(),
            out.metrics.total_us,
            if out.metrics.compiled { " (compiled)" } else { "" },
            x0
        );
    }

    if let Some(source) = tracker.source() {
        println!("\nkernel source: {} lines", source.lines().count());
    }
    Ok(())
}
