//! groovebox - plays a drum pattern through the default audio output.
//!
//! Run with: cargo run

use std::thread;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;

use groovebox_dsp::buffer::AudioBuffer;
use groovebox_dsp::engine::{DrumEngine, EngineMessage};
use groovebox_dsp::voices::VoiceKind;
use groovebox_dsp::MAX_BLOCK_SIZE;

const BPM: f32 = 120.0;
const STEPS: usize = 16;
const BARS: usize = 8;

/// One row per voice: velocity per sixteenth step, 0 = rest.
const PATTERN: &[(VoiceKind, [u8; STEPS])] = &[
    (VoiceKind::BassDrum,    [9, 0, 0, 0, 9, 0, 0, 0, 9, 0, 0, 0, 9, 0, 0, 5]),
    (VoiceKind::SnareDrum,   [0, 0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0, 9, 0, 0, 0]),
    (VoiceKind::Clap,        [0, 0, 0, 0, 9, 0, 0, 0, 0, 0, 0, 0, 9, 0, 0, 3]),
    (VoiceKind::ClosedHiHat, [7, 0, 5, 0, 7, 0, 5, 0, 7, 0, 5, 0, 7, 0, 5, 0]),
    (VoiceKind::OpenHiHat,   [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 0]),
    (VoiceKind::Cowbell,     [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0]),
];

fn main() -> Result<()> {
    color_eyre::install()?;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no audio output device available"))?;
    let config = device.default_output_config()?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(eyre!("demo expects an f32 output stream"));
    }

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    let mut engine = DrumEngine::new();
    engine.prepare(sample_rate, MAX_BLOCK_SIZE);
    engine.set_compressor_enabled(true);
    engine.set_limiter_enabled(true);
    engine.set_reverb_enabled(true);
    engine.master_mut().set_threshold(-12.0);
    engine.master_mut().set_ratio(3.0);
    engine.master_mut().set_limiter_ceiling(-0.3);
    engine.reverb_mut().set_wet_level(0.15);
    engine.reverb_mut().set_room_size(0.4);

    let (mut tx, mut rx) = RingBuffer::<EngineMessage>::new(256);
    let mut block = AudioBuffer::new(2, MAX_BLOCK_SIZE);

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            for frame_chunk in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                let frames = frame_chunk.len() / channels;
                block.set_num_samples(frames);
                engine.render_next_block_with_messages(&mut block, &mut rx);
                for (f, frame) in frame_chunk.chunks_mut(channels).enumerate() {
                    frame[0] = block.sample(0, f);
                    if channels > 1 {
                        frame[1] = block.sample(1, f);
                    }
                    for extra in frame.iter_mut().skip(2) {
                        *extra = 0.0;
                    }
                }
            }
        },
        |err| eprintln!("stream error: {err}"),
        None,
    )?;
    stream.play()?;

    // Step the pattern from the control thread; the queue carries the
    // triggers across to the audio callback.
    let step_duration = Duration::from_secs_f32(60.0 / BPM / 4.0);
    for _ in 0..BARS {
        for step in 0..STEPS {
            for (kind, row) in PATTERN {
                if row[step] > 0 {
                    let _ = tx.push(EngineMessage::Trigger {
                        kind: *kind,
                        velocity: row[step] as f32 / 9.0,
                    });
                }
            }
            thread::sleep(step_duration);
        }
    }

    // Let the tails ring out.
    thread::sleep(Duration::from_secs(2));
    Ok(())
}
