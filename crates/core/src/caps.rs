//! LDAC capability descriptor (vendor-specific A2DP codec information element).
//!
//! The descriptor is a fixed 8-byte structure exchanged during AVDTP
//! capability discovery and configuration:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Vendor ID                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           Codec ID            |  Sample rates |  Channel modes|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Advertised capabilities set every supported bit; a selected
//! configuration carries exactly one bit in each mask.

use std::fmt;

use crate::error::{CodecError, Result};

/// Sony's Bluetooth SIG company identifier.
pub const LDAC_VENDOR_ID: u32 = 0x0000_012D;

/// LDAC vendor codec identifier.
pub const LDAC_CODEC_ID: u16 = 0x00AA;

/// Size of the capability structure on the wire.
pub const CAPS_SIZE: usize = 8;

/// Sampling frequencies the adapter can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz88200,
    Hz96000,
    Hz176400,
    Hz192000,
}

impl SampleRate {
    /// All rates in ascending frequency order.
    pub const ALL: [SampleRate; 6] = [
        SampleRate::Hz44100,
        SampleRate::Hz48000,
        SampleRate::Hz88200,
        SampleRate::Hz96000,
        SampleRate::Hz176400,
        SampleRate::Hz192000,
    ];

    /// Bit for this rate in [`SampleRateMask`].
    pub const fn bit(self) -> u8 {
        match self {
            Self::Hz44100 => 0x20,
            Self::Hz48000 => 0x10,
            Self::Hz88200 => 0x08,
            Self::Hz96000 => 0x04,
            Self::Hz176400 => 0x02,
            Self::Hz192000 => 0x01,
        }
    }

    /// Frequency in Hz.
    pub const fn hz(self) -> u32 {
        match self {
            Self::Hz44100 => 44_100,
            Self::Hz48000 => 48_000,
            Self::Hz88200 => 88_200,
            Self::Hz96000 => 96_000,
            Self::Hz176400 => 176_400,
            Self::Hz192000 => 192_000,
        }
    }

    /// Look up a rate by frequency in Hz.
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.hz() == hz)
    }

    /// PCM samples per channel the engine consumes per encode call.
    ///
    /// LDAC processes 128 samples at 44.1/48 kHz and scales the block with
    /// the rate tier.
    pub const fn samples_per_block(self) -> usize {
        match self {
            Self::Hz44100 | Self::Hz48000 => 128,
            Self::Hz88200 | Self::Hz96000 => 256,
            Self::Hz176400 | Self::Hz192000 => 512,
        }
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// Channel modes the adapter can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Mono,
    DualChannel,
    Stereo,
}

impl ChannelMode {
    /// Negotiation preference, most preferred first.
    pub const PREFERENCE: [ChannelMode; 3] = [
        ChannelMode::Stereo,
        ChannelMode::DualChannel,
        ChannelMode::Mono,
    ];

    /// Bit for this mode in [`ChannelModeMask`].
    pub const fn bit(self) -> u8 {
        match self {
            Self::Mono => 0x04,
            Self::DualChannel => 0x02,
            Self::Stereo => 0x01,
        }
    }

    /// Number of PCM channels carried by this mode.
    pub const fn channels(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::DualChannel | Self::Stereo => 2,
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => write!(f, "mono"),
            Self::DualChannel => write!(f, "dual-channel"),
            Self::Stereo => write!(f, "stereo"),
        }
    }
}

/// Sample rate support (bitfield).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleRateMask(pub u8);

impl SampleRateMask {
    /// Every rate the adapter supports.
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < SampleRate::ALL.len() {
            bits |= SampleRate::ALL[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub const fn supports(&self, rate: SampleRate) -> bool {
        (self.0 & rate.bit()) != 0
    }

    /// Highest supported frequency among the set bits.
    pub fn highest(&self) -> Option<SampleRate> {
        SampleRate::ALL
            .into_iter()
            .rev()
            .find(|rate| self.supports(*rate))
    }

    /// The rate when exactly one known bit is set and nothing else.
    pub fn single(&self) -> Option<SampleRate> {
        SampleRate::ALL.into_iter().find(|rate| rate.bit() == self.0)
    }
}

impl From<SampleRate> for SampleRateMask {
    fn from(rate: SampleRate) -> Self {
        Self(rate.bit())
    }
}

impl FromIterator<SampleRate> for SampleRateMask {
    fn from_iter<I: IntoIterator<Item = SampleRate>>(iter: I) -> Self {
        Self(iter.into_iter().fold(0, |bits, rate| bits | rate.bit()))
    }
}

/// Channel mode support (bitfield).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelModeMask(pub u8);

impl ChannelModeMask {
    /// Every mode the adapter supports.
    pub const fn all() -> Self {
        Self(ChannelMode::Mono.bit() | ChannelMode::DualChannel.bit() | ChannelMode::Stereo.bit())
    }

    pub const fn supports(&self, mode: ChannelMode) -> bool {
        (self.0 & mode.bit()) != 0
    }

    /// Most preferred mode among the set bits.
    pub fn preferred(&self) -> Option<ChannelMode> {
        ChannelMode::PREFERENCE
            .into_iter()
            .find(|mode| self.supports(*mode))
    }

    /// The mode when exactly one known bit is set and nothing else.
    pub fn single(&self) -> Option<ChannelMode> {
        ChannelMode::PREFERENCE
            .into_iter()
            .find(|mode| mode.bit() == self.0)
    }
}

impl From<ChannelMode> for ChannelModeMask {
    fn from(mode: ChannelMode) -> Self {
        Self(mode.bit())
    }
}

impl FromIterator<ChannelMode> for ChannelModeMask {
    fn from_iter<I: IntoIterator<Item = ChannelMode>>(iter: I) -> Self {
        Self(iter.into_iter().fold(0, |bits, mode| bits | mode.bit()))
    }
}

/// LDAC codec information element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    /// Bluetooth SIG company identifier (big-endian on the wire).
    pub vendor_id: u32,
    /// Vendor-assigned codec identifier (big-endian on the wire).
    pub codec_id: u16,
    /// Supported (or selected) sampling frequencies.
    pub sample_rates: SampleRateMask,
    /// Supported (or selected) channel modes.
    pub channel_modes: ChannelModeMask,
}

impl CapabilityDescriptor {
    /// Descriptor with LDAC identifiers and the given masks.
    pub const fn ldac(sample_rates: SampleRateMask, channel_modes: ChannelModeMask) -> Self {
        Self {
            vendor_id: LDAC_VENDOR_ID,
            codec_id: LDAC_CODEC_ID,
            sample_rates,
            channel_modes,
        }
    }

    /// Everything the adapter can do.
    pub const fn supported() -> Self {
        Self::ldac(SampleRateMask::all(), ChannelModeMask::all())
    }

    /// Serialize to the 8-byte wire structure.
    pub fn to_bytes(&self) -> [u8; CAPS_SIZE] {
        let mut buf = [0u8; CAPS_SIZE];
        buf[0..4].copy_from_slice(&self.vendor_id.to_be_bytes());
        buf[4..6].copy_from_slice(&self.codec_id.to_be_bytes());
        buf[6] = self.sample_rates.0;
        buf[7] = self.channel_modes.0;
        buf
    }

    /// Write the wire structure into `buf`, returning the bytes written.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < CAPS_SIZE {
            return Err(CodecError::BufferTooSmall {
                needed: CAPS_SIZE,
                available: buf.len(),
            });
        }
        buf[..CAPS_SIZE].copy_from_slice(&self.to_bytes());
        Ok(CAPS_SIZE)
    }

    /// Parse the wire structure. Bytes past [`CAPS_SIZE`] are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < CAPS_SIZE {
            return Err(CodecError::MalformedInput {
                expected: CAPS_SIZE,
                actual: data.len(),
            });
        }
        Ok(Self {
            vendor_id: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            codec_id: u16::from_be_bytes([data[4], data[5]]),
            sample_rates: SampleRateMask(data[6]),
            channel_modes: ChannelModeMask(data[7]),
        })
    }
}

/// Capabilities advertised by this adapter, in wire form.
pub fn fill_capabilities() -> [u8; CAPS_SIZE] {
    CapabilityDescriptor::supported().to_bytes()
}

/// Parse a remote capability blob.
pub fn parse_capabilities(data: &[u8]) -> Result<CapabilityDescriptor> {
    CapabilityDescriptor::parse(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertised_caps_layout() {
        let caps = fill_capabilities();
        assert_eq!(caps, [0x00, 0x00, 0x01, 0x2D, 0x00, 0xAA, 0x3F, 0x07]);
    }

    #[test]
    fn parse_advertised_caps() {
        let desc = parse_capabilities(&fill_capabilities()).unwrap();
        assert_eq!(desc, CapabilityDescriptor::supported());
        for rate in SampleRate::ALL {
            assert!(desc.sample_rates.supports(rate));
        }
        for mode in ChannelMode::PREFERENCE {
            assert!(desc.channel_modes.supports(mode));
        }
    }

    #[test]
    fn parse_short_buffer_is_malformed() {
        let err = parse_capabilities(&[0x00, 0x00, 0x01, 0x2D, 0x00, 0xAA, 0x3F]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedInput {
                expected: 8,
                actual: 7
            }
        ));
        assert!(parse_capabilities(&[]).is_err());
    }

    #[test]
    fn parse_ignores_trailing_bytes() {
        let mut data = fill_capabilities().to_vec();
        data.extend_from_slice(&[0xFF, 0xFF]);
        assert_eq!(
            parse_capabilities(&data).unwrap(),
            CapabilityDescriptor::supported()
        );
    }

    #[test]
    fn write_to_short_buffer() {
        let mut buf = [0u8; 4];
        let err = CapabilityDescriptor::supported()
            .write_to(&mut buf)
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::BufferTooSmall {
                needed: 8,
                available: 4
            }
        ));

        let mut buf = [0u8; 16];
        assert_eq!(CapabilityDescriptor::supported().write_to(&mut buf).unwrap(), 8);
        assert_eq!(&buf[..8], &fill_capabilities());
    }

    #[test]
    fn rate_mask_highest_and_single() {
        let mask: SampleRateMask = [SampleRate::Hz44100, SampleRate::Hz96000, SampleRate::Hz176400]
            .into_iter()
            .collect();
        assert_eq!(mask.highest(), Some(SampleRate::Hz176400));
        assert_eq!(mask.single(), None);
        assert_eq!(SampleRateMask(0x10).single(), Some(SampleRate::Hz48000));
        assert_eq!(SampleRateMask(0).highest(), None);
        // Bits above the six known rates are not rates.
        assert_eq!(SampleRateMask(0xC0).highest(), None);
    }

    #[test]
    fn channel_mask_preference() {
        assert_eq!(ChannelModeMask::all().preferred(), Some(ChannelMode::Stereo));
        assert_eq!(ChannelModeMask(0x06).preferred(), Some(ChannelMode::DualChannel));
        assert_eq!(ChannelModeMask(0x04).preferred(), Some(ChannelMode::Mono));
        assert_eq!(ChannelModeMask(0x00).preferred(), None);
    }

    #[test]
    fn samples_per_block_tiers() {
        assert_eq!(SampleRate::Hz44100.samples_per_block(), 128);
        assert_eq!(SampleRate::Hz48000.samples_per_block(), 128);
        assert_eq!(SampleRate::Hz88200.samples_per_block(), 256);
        assert_eq!(SampleRate::Hz96000.samples_per_block(), 256);
        assert_eq!(SampleRate::Hz176400.samples_per_block(), 512);
        assert_eq!(SampleRate::Hz192000.samples_per_block(), 512);
    }

    #[test]
    fn rate_from_hz() {
        assert_eq!(SampleRate::from_hz(88_200), Some(SampleRate::Hz88200));
        assert_eq!(SampleRate::from_hz(32_000), None);
    }
}
