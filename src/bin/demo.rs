//! # Media Fastpath Demo
//!
//! Drives both fast paths end to end with the simulated GPU backend:
//! an audio producer/consumer pair exchanging samples through the ring
//! buffer, and a decoder loop submitting frames that the "render
//! thread" resolves to textures.
//!
//! Run with: `cargo run --bin demo`

use std::thread;
use std::time::Duration;

use anyhow::Result;

use media_fastpath::{
    AudioFormat, AudioTransport, BufferId, Config, FrameTextureCache, PixelFormat, SimulatedGpu,
    SoftwareFrame,
};

fn main() -> Result<()> {
    media_fastpath::init_logging();

    println!("=== media-fastpath demo ===");
    println!();

    audio_demo()?;
    println!();
    video_demo()?;

    Ok(())
}

/// Streams one second of audio through the lock-free ring.
fn audio_demo() -> Result<()> {
    let config = Config::default();
    let format = AudioFormat::cd_quality();
    let transport = AudioTransport::open(format, &config)?;

    println!("Audio: {} byte ring for {} ms of CD-quality stereo",
        transport.capacity(),
        config.audio_buffer_ms
    );

    let total = format.bytes_per_second() as usize;
    let (mut producer, mut consumer) = transport.start();

    let feeder = thread::spawn(move || {
        let mut sent = 0usize;
        let chunk = [0x5Au8; 1764]; // 10 ms of frames
        while sent < total {
            let want = chunk.len().min(total - sent);
            let accepted = producer.write(&chunk[..want]);
            sent += accepted;
            if accepted == 0 {
                thread::yield_now();
            }
        }
    });

    // Stand-in for the realtime callback: drain in fixed-size bites.
    let mut received = 0usize;
    let mut callback_buffer = [0u8; 882];
    while received < total {
        let n = consumer.read(&mut callback_buffer);
        received += n;
        if n == 0 {
            thread::sleep(Duration::from_micros(500));
        }
    }
    feeder.join().expect("feeder thread");

    println!("Audio: moved {} bytes producer -> callback, zero locks", received);
    Ok(())
}

/// Runs a decoder-style buffer pool through the texture cache.
fn video_demo() -> Result<()> {
    let (mut cache, sink) = FrameTextureCache::new(SimulatedGpu::new());

    // A decoder recycling a pool of three NV12 buffers.
    println!("Video: 90 frames from a 3-buffer decoder pool, 1280x720 NV12");
    for n in 0..90u64 {
        let frame = SoftwareFrame::new(BufferId(n % 3), 1280, 720, PixelFormat::Nv12)?;
        sink.submit(frame, true);
        cache.bind();
    }

    // A filtered frame cannot be mapped and takes the copy path.
    let filtered = SoftwareFrame::new(BufferId(1000), 1280, 720, PixelFormat::Nv12)?;
    sink.submit(filtered, false);
    cache.bind();

    let stats = cache.stats();
    println!("Video: {} textures created, {} hot binds, {} plane copies",
        stats.textures_created, stats.hot_binds, stats.copies
    );
    println!("       (four texture objects for ninety-one frames is the whole point)");

    Ok(())
}
