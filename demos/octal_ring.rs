//! Clicks circling an eight-speaker ring, panned with DBAP.
//!
//! Run with `RUST_LOG=audioscene=debug` to see sources come and go.

use audioscene::{sources, Dbap, SceneBuilder, SpeakerLayout};
use std::thread::sleep;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> audioscene::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let scene = SceneBuilder::default()
        .with_speaker_layout(SpeakerLayout::octal())
        .with_spatializer(Dbap::new(3.0))
        .build()?;

    let sound = scene.play_at(sources::Impulse::with_rate(8.0, 44100), [4.0, 0.0, 0.0]);

    for i in 0..800 {
        let phi = i as f64 * 0.01;
        sound.set_position([4.0 * phi.cos(), 4.0 * phi.sin(), 0.0]);
        sleep(Duration::from_millis(10));
    }
    Ok(())
}
