use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use a2dp::media::rtp::PREAMBLE_SIZE;
use a2dp::quality::{Backpressure, QualityAction, QualityController, QualityControllerConfig};
use a2dp::{A2dpCodec, LdacCodec, PassthroughEngine, SessionOptions};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "a2dp-pack",
    about = "Negotiate an LDAC configuration and pack PCM into A2DP media packets"
)]
struct Args {
    /// Remote capability blob as hex (default: our own capabilities)
    #[arg(long, short)]
    caps: Option<String>,

    /// Transport MTU in bytes (packets carry a u16 length prefix)
    #[arg(long, short, default_value_t = 895)]
    mtu: u16,

    /// Raw S16LE interleaved PCM input (default: synthesized noise)
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Seconds of noise to synthesize when no input is given
    #[arg(long, default_value_t = 1)]
    seconds: u32,

    /// Write packets here, each prefixed with a big-endian u16 length
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Report congestion every N packets (0 = never)
    #[arg(long, default_value_t = 0)]
    congestion_every: usize,
}

fn parse_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = s.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
    hex::decode(digits)
}

fn noise(bytes: usize) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(bytes);
    while pcm.len() + 2 <= bytes {
        // Quiet noise, well below full scale.
        let sample = rand::random::<i16>() / 64;
        pcm.extend_from_slice(&sample.to_le_bytes());
    }
    pcm
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let codec = LdacCodec::new();
    let mtu = usize::from(args.mtu);

    let remote = match &args.caps {
        Some(hex) => parse_hex(hex)?,
        None => codec.fill_capabilities(),
    };
    let config = codec.select_configuration(&remote)?;

    let options = SessionOptions {
        mtu,
        ..SessionOptions::default()
    };
    let (mut session, info) = codec.init(&config, &PassthroughEngine::factory(), &options)?;
    tracing::info!(
        rate = info.rate,
        channels = info.channels,
        block_size = session.block_size(),
        "session ready"
    );

    let pcm = match &args.input {
        Some(path) => fs::read(path)?,
        None => noise(info.rate as usize * info.channels * 2 * args.seconds as usize),
    };

    let mut out = match &args.output {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let mut controller = QualityController::new(QualityControllerConfig::default());
    let block_size = session.block_size();
    let bytes_per_frame = info.channels * 2;
    let mut buf = vec![0u8; mtu];
    let mut offset = 0usize;
    let mut sequence = 0u16;
    let mut timestamp = 0u32;
    let mut packets = 0usize;
    let mut frames = 0usize;

    while offset + block_size <= pcm.len() {
        let blocks = session.num_blocks(mtu).max(1);
        let mut packet = session.start_packet(&mut buf, sequence, timestamp)?;
        let start = offset;
        for _ in 0..blocks {
            if offset + block_size > pcm.len() {
                break;
            }
            let result = packet.encode(&pcm[offset..offset + block_size])?;
            if result.consumed == 0 {
                break;
            }
            offset += result.consumed;
        }
        let count = packet.frame_count();
        let len = packet.finish();
        if len == PREAMBLE_SIZE {
            tracing::warn!(mtu, "MTU too small for a single frame");
            break;
        }

        if let Some(w) = out.as_mut() {
            w.write_all(&u16::try_from(len)?.to_be_bytes())?;
            w.write_all(&buf[..len])?;
        }

        packets += 1;
        frames += count as usize;
        sequence = sequence.wrapping_add(1);
        timestamp = timestamp.wrapping_add(((offset - start) / bytes_per_frame) as u32);

        let pressure = if args.congestion_every > 0 && packets % args.congestion_every == 0 {
            Backpressure::Congested
        } else {
            Backpressure::Clear
        };
        match controller.observe(&mut session, pressure) {
            QualityAction::None => {}
            action => tracing::info!(packet = packets, ?action, "quality adjusted"),
        }
    }

    if let Some(mut w) = out {
        w.flush()?;
    }

    tracing::info!(
        packets,
        frames,
        pcm_bytes = offset,
        leftover = pcm.len() - offset,
        "packing finished"
    );
    println!(
        "{} packets, {} frames, {} of {} PCM bytes consumed",
        packets,
        frames,
        offset,
        pcm.len()
    );

    session.deinit();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("a2dp-pack failed: {}", e);
        std::process::exit(1);
    }
}
