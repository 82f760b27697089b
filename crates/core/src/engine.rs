//! Encoding engine contract.
//!
//! The compression algorithm lives behind [`EncodingEngine`]. An
//! [`EncoderSession`](crate::EncoderSession) acquires one engine through an
//! [`EngineFactory`], owns it exclusively, and releases it exactly once.
//!
//! [`PassthroughEngine`] is a reference implementation that frames raw PCM
//! blocks without compressing them. It exercises the packing path end to
//! end (CLI dry runs, tests) and is not an LDAC encoder.

use crate::caps::{ChannelMode, SampleRate};

/// Failure reported by an engine, carrying its native status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("engine status {code}")]
pub struct EngineError {
    pub code: i32,
}

impl EngineError {
    pub const fn new(code: i32) -> Self {
        Self { code }
    }
}

/// PCM sample format accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 16-bit little-endian.
    S16,
}

impl SampleFormat {
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::S16 => 2,
        }
    }
}

/// Encoder quality tier (LDAC "EQMID").
///
/// Ordered from highest bitrate to lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum QualityLevel {
    /// 990 kbps class.
    High,
    /// 660 kbps class.
    #[default]
    Standard,
    /// 330 kbps class, favours connection stability.
    Mobile,
}

impl QualityLevel {
    /// Nominal encoded frame size used for packet capacity planning.
    ///
    /// Actual frames produced by the engine vary in size.
    pub const fn frame_length(self) -> usize {
        match self {
            Self::High => 330,
            Self::Standard => 220,
            Self::Mobile => 110,
        }
    }

    /// One tier toward connection stability, if any.
    pub const fn lower(self) -> Option<Self> {
        match self {
            Self::High => Some(Self::Standard),
            Self::Standard => Some(Self::Mobile),
            Self::Mobile => None,
        }
    }

    /// One tier toward audio quality, if any.
    pub const fn higher(self) -> Option<Self> {
        match self {
            Self::High => None,
            Self::Standard => Some(Self::High),
            Self::Mobile => Some(Self::Standard),
        }
    }
}

/// Direction of a quality priority shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityDirection {
    /// Lower bitrate, more robust under congestion.
    Connection,
    /// Higher bitrate, better fidelity.
    Quality,
}

/// Parameters an engine is configured with once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    pub mtu: usize,
    pub quality: QualityLevel,
    pub channel_mode: ChannelMode,
    pub sample_format: SampleFormat,
    pub sample_rate: SampleRate,
}

/// Result of one engine encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineOutput {
    /// PCM bytes consumed from the input.
    pub consumed: usize,
    /// Encoded bytes written to the output.
    pub produced: usize,
    /// Number of complete frames contained in the output.
    pub frames: usize,
}

/// Opaque encoding engine.
pub trait EncodingEngine {
    /// Apply session parameters. Called once, before any `encode`.
    fn configure(&mut self, params: &EngineParams) -> Result<(), EngineError>;

    /// Encode PCM from `pcm` into `out`.
    ///
    /// May consume input without producing frames while the engine
    /// buffers internally.
    fn encode(&mut self, pcm: &[u8], out: &mut [u8]) -> Result<EngineOutput, EngineError>;

    /// Shift the internal quality priority one step. Returns the engine's
    /// status code (0 on success, negative when no step was possible).
    fn adjust_quality(&mut self, direction: QualityDirection) -> i32;

    /// Free engine resources. Never called twice for one engine.
    fn release(&mut self);
}

/// Source of engine handles.
pub trait EngineFactory {
    type Engine: EncodingEngine;

    fn acquire(&self) -> Result<Self::Engine, EngineError>;
}

impl<F, E> EngineFactory for F
where
    F: Fn() -> Result<E, EngineError>,
    E: EncodingEngine,
{
    type Engine = E;

    fn acquire(&self) -> Result<E, EngineError> {
        self()
    }
}

/// Status returned when the engine is used before `configure` or after `release`.
const NOT_READY: i32 = -1;

/// Reference engine: one block of PCM in, one frame out.
///
/// Each frame is the leading `frame_length` bytes of the block for the
/// current quality tier, zero-padded when the block is shorter. Input
/// shorter than a block, or output shorter than a frame, is left untouched.
#[derive(Debug, Default)]
pub struct PassthroughEngine {
    params: Option<EngineParams>,
    quality: QualityLevel,
    released: bool,
}

impl PassthroughEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory suitable for [`LdacCodec::init`](crate::LdacCodec::init).
    pub fn factory() -> impl EngineFactory<Engine = Self> {
        || Ok::<_, EngineError>(Self::new())
    }

    pub fn quality(&self) -> QualityLevel {
        self.quality
    }

    fn block_size(params: &EngineParams) -> usize {
        params.sample_rate.samples_per_block()
            * params.channel_mode.channels()
            * params.sample_format.bytes_per_sample()
    }
}

impl EncodingEngine for PassthroughEngine {
    fn configure(&mut self, params: &EngineParams) -> Result<(), EngineError> {
        if self.released {
            return Err(EngineError::new(NOT_READY));
        }
        self.params = Some(*params);
        self.quality = params.quality;
        Ok(())
    }

    fn encode(&mut self, pcm: &[u8], out: &mut [u8]) -> Result<EngineOutput, EngineError> {
        let params = match (&self.params, self.released) {
            (Some(params), false) => params,
            _ => return Err(EngineError::new(NOT_READY)),
        };
        let block_size = Self::block_size(params);
        let frame_length = self.quality.frame_length();
        if pcm.len() < block_size || out.len() < frame_length {
            return Ok(EngineOutput::default());
        }

        let copied = block_size.min(frame_length);
        out[..copied].copy_from_slice(&pcm[..copied]);
        out[copied..frame_length].fill(0);

        Ok(EngineOutput {
            consumed: block_size,
            produced: frame_length,
            frames: 1,
        })
    }

    fn adjust_quality(&mut self, direction: QualityDirection) -> i32 {
        let next = match direction {
            QualityDirection::Connection => self.quality.lower(),
            QualityDirection::Quality => self.quality.higher(),
        };
        match next {
            Some(level) => {
                self.quality = level;
                0
            }
            None => NOT_READY,
        }
    }

    fn release(&mut self) {
        self.released = true;
        self.params = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EngineParams {
        EngineParams {
            mtu: 679,
            quality: QualityLevel::Standard,
            channel_mode: ChannelMode::Stereo,
            sample_format: SampleFormat::S16,
            sample_rate: SampleRate::Hz48000,
        }
    }

    #[test]
    fn quality_tiers() {
        assert_eq!(QualityLevel::default(), QualityLevel::Standard);
        assert_eq!(QualityLevel::High.frame_length(), 330);
        assert_eq!(QualityLevel::Standard.frame_length(), 220);
        assert_eq!(QualityLevel::Mobile.frame_length(), 110);
        assert_eq!(QualityLevel::Mobile.lower(), None);
        assert_eq!(QualityLevel::High.higher(), None);
        assert_eq!(QualityLevel::Standard.lower(), Some(QualityLevel::Mobile));
    }

    #[test]
    fn passthrough_requires_configure() {
        let mut engine = PassthroughEngine::new();
        let mut out = [0u8; 512];
        assert_eq!(
            engine.encode(&[0u8; 512], &mut out),
            Err(EngineError::new(NOT_READY))
        );
    }

    #[test]
    fn passthrough_frames_one_block() {
        let mut engine = PassthroughEngine::new();
        engine.configure(&params()).unwrap();

        let pcm: Vec<u8> = (0..1024).map(|i| i as u8).collect();
        let mut out = [0xFFu8; 400];
        let result = engine.encode(&pcm, &mut out).unwrap();
        assert_eq!(
            result,
            EngineOutput {
                consumed: 512,
                produced: 220,
                frames: 1
            }
        );
        assert_eq!(&out[..220], &pcm[..220]);
        assert_eq!(out[220], 0xFF);
    }

    #[test]
    fn passthrough_short_input_consumes_nothing() {
        let mut engine = PassthroughEngine::new();
        engine.configure(&params()).unwrap();
        let mut out = [0u8; 400];
        assert_eq!(
            engine.encode(&[0u8; 100], &mut out).unwrap(),
            EngineOutput::default()
        );
        assert_eq!(
            engine.encode(&[0u8; 512], &mut out[..10]).unwrap(),
            EngineOutput::default()
        );
    }

    #[test]
    fn passthrough_pads_short_blocks() {
        let mut engine = PassthroughEngine::new();
        let mut p = params();
        p.channel_mode = ChannelMode::Mono;
        p.sample_rate = SampleRate::Hz44100;
        p.quality = QualityLevel::High;
        engine.configure(&p).unwrap();

        let mut out = [0xFFu8; 330];
        let result = engine.encode(&[0x11u8; 256], &mut out).unwrap();
        assert_eq!(result.produced, 330);
        assert!(out[..256].iter().all(|b| *b == 0x11));
        assert!(out[256..].iter().all(|b| *b == 0));
    }

    #[test]
    fn passthrough_quality_steps() {
        let mut engine = PassthroughEngine::new();
        engine.configure(&params()).unwrap();
        assert_eq!(engine.adjust_quality(QualityDirection::Connection), 0);
        assert_eq!(engine.quality(), QualityLevel::Mobile);
        assert!(engine.adjust_quality(QualityDirection::Connection) < 0);
        assert_eq!(engine.adjust_quality(QualityDirection::Quality), 0);
        assert_eq!(engine.adjust_quality(QualityDirection::Quality), 0);
        assert_eq!(engine.quality(), QualityLevel::High);
        assert!(engine.adjust_quality(QualityDirection::Quality) < 0);
    }

    #[test]
    fn passthrough_unusable_after_release() {
        let mut engine = PassthroughEngine::new();
        engine.configure(&params()).unwrap();
        engine.release();
        let mut out = [0u8; 400];
        assert!(engine.encode(&[0u8; 512], &mut out).is_err());
    }
}
