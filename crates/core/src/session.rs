//! LDAC encoder session.
//!
//! A session is created from a [`SelectedConfiguration`] and owns one
//! encoding engine for its whole life:
//!
//! ```text
//! init         -> engine acquired + configured
//! num_blocks   -> mtu updated, packet capacity reported
//! start_packet -> preamble written, frame count = 0
//! encode (xN)  -> frames appended, frame count += frames
//! deinit/drop  -> engine released (exactly once)
//! ```
//!
//! Sessions carry no locking. The transport manager serializes all calls,
//! and finishes one packet before starting the next.

use crate::caps::{ChannelMode, SampleRate};
use crate::engine::{
    EncodingEngine, EngineError, EngineFactory, EngineOutput, EngineParams, QualityDirection,
    QualityLevel, SampleFormat,
};
use crate::error::{CodecError, Result};
use crate::media::rtp::{self, A2DP_PAYLOAD_TYPE, A2DP_SSRC, MAX_FRAME_COUNT, PREAMBLE_SIZE, RtpHeader};
use crate::negotiate::SelectedConfiguration;

/// Status used when an engine reports more bytes than the buffers it was given.
const ENGINE_OVERRUN: i32 = -22;

/// Session-level options supplied by the transport manager.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Transport MTU known at creation time. Stays 0 until the transport
    /// reports one through [`EncoderSession::num_blocks`].
    pub mtu: usize,
    /// Synchronization source written into every packet of this session.
    pub ssrc: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mtu: 0,
            ssrc: A2DP_SSRC,
        }
    }
}

/// Raw audio format the session expects as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub format: SampleFormat,
    pub rate: u32,
    pub channels: usize,
}

/// One negotiated encoder instance.
pub struct EncoderSession<E: EncodingEngine> {
    engine: E,
    released: bool,
    mtu: usize,
    ssrc: u32,
    quality: QualityLevel,
    channel_mode: ChannelMode,
    sample_rate: SampleRate,
    sample_format: SampleFormat,
    samples_per_block: usize,
    block_size: usize,
    frame_length: usize,
}

impl<E: EncodingEngine> EncoderSession<E> {
    /// Acquire and configure an engine for `config`.
    ///
    /// On failure nothing is left to clean up: an engine that was acquired
    /// but rejected the configuration is released before returning.
    pub fn init<F>(
        config: &SelectedConfiguration,
        factory: &F,
        options: &SessionOptions,
    ) -> Result<(Self, AudioInfo)>
    where
        F: EngineFactory<Engine = E>,
    {
        let engine = factory.acquire().map_err(|e| {
            tracing::warn!(code = e.code, "encoding engine acquisition failed");
            CodecError::ResourceExhausted(e)
        })?;

        let sample_rate = config.sample_rate();
        let channel_mode = config.channel_mode();
        let sample_format = SampleFormat::S16;
        let quality = QualityLevel::Standard;
        let samples_per_block = sample_rate.samples_per_block();

        let mut session = Self {
            engine,
            released: false,
            mtu: options.mtu,
            ssrc: options.ssrc,
            quality,
            channel_mode,
            sample_rate,
            sample_format,
            samples_per_block,
            block_size: samples_per_block
                * channel_mode.channels()
                * sample_format.bytes_per_sample(),
            frame_length: quality.frame_length(),
        };

        let params = EngineParams {
            mtu: session.mtu,
            quality,
            channel_mode,
            sample_format,
            sample_rate,
        };
        if let Err(e) = session.engine.configure(&params) {
            tracing::warn!(code = e.code, ?params, "engine rejected configuration");
            // Dropping the session releases the engine.
            drop(session);
            return Err(CodecError::InvalidConfiguration(e));
        }

        tracing::debug!(
            %sample_rate,
            %channel_mode,
            ?quality,
            block_size = session.block_size,
            frame_length = session.frame_length,
            "LDAC encoder session created"
        );

        let info = session.audio_info();
        Ok((session, info))
    }

    /// Release the engine and end the session.
    pub fn deinit(mut self) {
        self.release_engine();
    }

    fn release_engine(&mut self) {
        if !self.released {
            self.released = true;
            self.engine.release();
            tracing::debug!("LDAC encoder session released");
        }
    }

    /// PCM bytes the engine consumes per encode call.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of encode calls whose frames fit in one packet of `mtu` bytes.
    ///
    /// Records `mtu` as the current transport MTU. The result never exceeds
    /// 15, the largest count the payload header can carry.
    pub fn num_blocks(&mut self, mtu: usize) -> usize {
        self.mtu = mtu;
        let frames = mtu.saturating_sub(PREAMBLE_SIZE) / self.frame_length;
        frames.min(MAX_FRAME_COUNT as usize)
    }

    /// Encode PCM from `pcm` into `dest`. Frames are counted by the
    /// [`Packet`] that owns `dest`.
    pub(crate) fn encode(&mut self, pcm: &[u8], dest: &mut [u8]) -> Result<EngineOutput> {
        let output = self.engine.encode(pcm, dest).map_err(|e| {
            tracing::warn!(code = e.code, input = pcm.len(), "engine encode failed");
            CodecError::InvalidInput(e)
        })?;
        if output.consumed > pcm.len() || output.produced > dest.len() {
            return Err(CodecError::InvalidInput(EngineError::new(ENGINE_OVERRUN)));
        }

        tracing::trace!(
            consumed = output.consumed,
            produced = output.produced,
            frames = output.frames,
            "pcm encoded"
        );
        Ok(output)
    }

    /// Write the packet preamble into `buf` and return a writer for the
    /// frames of that packet.
    pub fn start_packet<'a>(
        &'a mut self,
        buf: &'a mut [u8],
        sequence: u16,
        timestamp: u32,
    ) -> Result<Packet<'a, E>> {
        let header = RtpHeader {
            pt: A2DP_PAYLOAD_TYPE,
            sequence,
            timestamp,
            ssrc: self.ssrc,
        };
        let len = rtp::write_preamble(buf, &header)?;
        Ok(Packet {
            session: self,
            buf,
            len,
            frames: 0,
        })
    }

    /// Ask the engine to favour connection stability over quality.
    pub fn reduce_quality(&mut self) -> i32 {
        let status = self.engine.adjust_quality(QualityDirection::Connection);
        tracing::debug!(status, "quality priority reduced");
        status
    }

    /// Ask the engine to favour quality over connection stability.
    pub fn increase_quality(&mut self) -> i32 {
        let status = self.engine.adjust_quality(QualityDirection::Quality);
        tracing::debug!(status, "quality priority increased");
        status
    }

    pub fn audio_info(&self) -> AudioInfo {
        AudioInfo {
            format: self.sample_format,
            rate: self.sample_rate.hz(),
            channels: self.channel_mode.channels(),
        }
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn channel_mode(&self) -> ChannelMode {
        self.channel_mode
    }

    pub fn channels(&self) -> usize {
        self.channel_mode.channels()
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn samples_per_block(&self) -> usize {
        self.samples_per_block
    }

    /// Nominal frame size for the session's quality tier.
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Quality tier the session was configured with. Later priority
    /// shifts are tracked by the engine, not here.
    pub fn quality(&self) -> QualityLevel {
        self.quality
    }

    /// Last MTU reported by the transport.
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: EncodingEngine> Drop for EncoderSession<E> {
    fn drop(&mut self) {
        self.release_engine();
    }
}

impl<E: EncodingEngine> std::fmt::Debug for EncoderSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderSession")
            .field("sample_rate", &self.sample_rate)
            .field("channel_mode", &self.channel_mode)
            .field("quality", &self.quality)
            .field("mtu", &self.mtu)
            .field("block_size", &self.block_size)
            .field("frame_length", &self.frame_length)
            .finish_non_exhaustive()
    }
}

/// Frames being written into one outgoing media packet.
///
/// Created by [`EncoderSession::start_packet`]. Holds the session and the
/// packet buffer until [`finish`](Self::finish), so no other packet can be
/// started while this one is open.
pub struct Packet<'a, E: EncodingEngine> {
    session: &'a mut EncoderSession<E>,
    buf: &'a mut [u8],
    len: usize,
    frames: usize,
}

impl<E: EncodingEngine> Packet<'_, E> {
    /// Encode `pcm` into the free space of the packet.
    ///
    /// On success the frame count in the payload header grows by the
    /// number of frames the engine reported. On failure the packet is left
    /// as it was.
    pub fn encode(&mut self, pcm: &[u8]) -> Result<EngineOutput> {
        let output = self.session.encode(pcm, &mut self.buf[self.len..])?;
        self.len += output.produced;
        self.frames = self.frames.saturating_add(output.frames);
        let count = self.frame_count();

        if self.frames > MAX_FRAME_COUNT as usize {
            tracing::warn!(
                frames = self.frames,
                "frame count exceeds payload header field, saturating"
            );
        }
        rtp::set_frame_count(self.buf, count);
        Ok(output)
    }

    /// Frame count as written in the payload header.
    pub fn frame_count(&self) -> u8 {
        self.frames.min(MAX_FRAME_COUNT as usize) as u8
    }

    /// Bytes written so far, preamble included.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Free bytes left in the packet buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.len
    }

    /// Close the packet and return its total length.
    pub fn finish(self) -> usize {
        tracing::trace!(
            len = self.len,
            frames = self.frame_count(),
            "media packet finished"
        );
        self.len
    }
}
