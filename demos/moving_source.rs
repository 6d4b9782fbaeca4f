//! A noise source flying past the listener from front to back.

use audioscene::{sources, Attenuation, Pose, SceneBuilder};
use std::thread::sleep;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> audioscene::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let scene = SceneBuilder::default().with_reverb(0.2).build()?;

    let atten = Attenuation {
        clip_range: 60.0,
        ..Attenuation::default()
    };
    let source = sources::Noise::new(44100).with_amplitude(0.3);
    let sound = scene.play(source, Pose::from_array([30.0, 2.0, 0.0]), atten);

    for i in 0..1000 {
        sound.set_position([30.0 - i as f64 * 0.06, 2.0, 0.0]);
        sleep(Duration::from_millis(10));
    }
    sound.stop();
    sleep(Duration::from_millis(500));
    Ok(())
}
