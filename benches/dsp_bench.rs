//! Benchmarks for the drum voices and the master processing chain.
//!
//! Run with: cargo bench
//!
//! These measure core render paths against real-time audio deadlines.
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use groovebox_dsp::buffer::AudioBuffer;
use groovebox_dsp::engine::DrumEngine;
use groovebox_dsp::master::MasterDynamics;
use groovebox_dsp::reverb::AlgorithmicReverb;
use groovebox_dsp::voices::{BassDrum, ClosedHiHat, SnareDrum, Voice, VoiceKind};

/// Common buffer sizes used in audio applications.
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

const SAMPLE_RATE: f32 = 48_000.0;

fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("voices");

    for &size in BLOCK_SIZES {
        group.bench_with_input(BenchmarkId::new("bass_drum", size), &size, |b, &size| {
            let mut voice = BassDrum::new();
            voice.prepare(SAMPLE_RATE, size);
            let mut buffer = AudioBuffer::new(2, size);
            b.iter(|| {
                voice.trigger(1.0);
                buffer.clear();
                voice.render_next_block(black_box(&mut buffer), 0, size);
            })
        });

        group.bench_with_input(BenchmarkId::new("snare_drum", size), &size, |b, &size| {
            let mut voice = SnareDrum::new();
            voice.prepare(SAMPLE_RATE, size);
            let mut buffer = AudioBuffer::new(2, size);
            b.iter(|| {
                voice.trigger(1.0);
                buffer.clear();
                voice.render_next_block(black_box(&mut buffer), 0, size);
            })
        });

        group.bench_with_input(BenchmarkId::new("closed_hihat", size), &size, |b, &size| {
            let mut voice = ClosedHiHat::new();
            voice.prepare(SAMPLE_RATE, size);
            let mut buffer = AudioBuffer::new(2, size);
            b.iter(|| {
                voice.trigger(1.0);
                buffer.clear();
                voice.render_next_block(black_box(&mut buffer), 0, size);
            })
        });
    }

    group.finish();
}

fn bench_master_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("master");

    for &size in BLOCK_SIZES {
        let mut input = AudioBuffer::new(2, size);
        for ch in 0..2 {
            for i in 0..size {
                input.set_sample(ch, i, ((i as f32 * 0.07).sin()) * 0.9);
            }
        }

        group.bench_with_input(BenchmarkId::new("full_chain", size), &size, |b, &size| {
            let mut dynamics = MasterDynamics::new();
            dynamics.set_threshold(-12.0);
            dynamics.set_ratio(4.0);
            dynamics.set_clipper_drive(6.0);
            dynamics.prepare(SAMPLE_RATE, size);
            let mut buffer = AudioBuffer::new(2, size);
            b.iter(|| {
                for ch in 0..2 {
                    for i in 0..size {
                        buffer.set_sample(ch, i, input.sample(ch, i));
                    }
                }
                dynamics.process(black_box(&mut buffer), true, true, true);
            })
        });

        group.bench_with_input(BenchmarkId::new("limiter_only", size), &size, |b, &size| {
            let mut dynamics = MasterDynamics::new();
            dynamics.prepare(SAMPLE_RATE, size);
            let mut buffer = AudioBuffer::new(2, size);
            b.iter(|| {
                for ch in 0..2 {
                    for i in 0..size {
                        buffer.set_sample(ch, i, input.sample(ch, i));
                    }
                }
                dynamics.process(black_box(&mut buffer), false, true, false);
            })
        });
    }

    group.finish();
}

fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverb");

    for &size in BLOCK_SIZES {
        group.bench_with_input(BenchmarkId::new("stereo_tank", size), &size, |b, &size| {
            let mut reverb = AlgorithmicReverb::new();
            reverb.prepare(SAMPLE_RATE, size);
            reverb.set_room_size(0.7);
            let mut buffer = AudioBuffer::new(2, size);
            b.iter(|| {
                for ch in 0..2 {
                    for i in 0..size {
                        buffer.set_sample(ch, i, ((i as f32 * 0.03).sin()) * 0.5);
                    }
                }
                reverb.process(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    group.bench_function("all_voices_through_master", |b| {
        let mut engine = DrumEngine::new();
        engine.prepare(SAMPLE_RATE, 512);
        engine.set_compressor_enabled(true);
        engine.set_limiter_enabled(true);
        let mut buffer = AudioBuffer::new(2, 512);
        b.iter(|| {
            for kind in VoiceKind::ALL {
                engine.trigger(kind, 1.0);
            }
            engine.render_next_block(black_box(&mut buffer));
        })
    });

    group.finish();
}

criterion_group!(benches, bench_voices, bench_master_chain, bench_reverb, bench_engine);
criterion_main!(benches);
