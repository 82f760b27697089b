//! Configuration selection from a remote capability set.
//!
//! The selection rules are part of the interoperability contract and
//! must not change:
//!
//! - **Sample rate**: the highest frequency present in the remote mask.
//! - **Channel mode**: stereo, then dual-channel, then mono.
//!
//! Vendor and codec identifiers sent by the remote are ignored and replaced
//! with the LDAC identifiers.

use crate::caps::{
    CAPS_SIZE, CapabilityDescriptor, ChannelMode, ChannelModeMask, LDAC_CODEC_ID, LDAC_VENDOR_ID,
    SampleRate, SampleRateMask,
};
use crate::error::{CodecError, Result};

/// One concrete sample rate and channel mode agreed with the remote.
///
/// Only produced by [`select_configuration`] or by validating a
/// configuration blob with [`SelectedConfiguration::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedConfiguration {
    sample_rate: SampleRate,
    channel_mode: ChannelMode,
}

impl SelectedConfiguration {
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn channel_mode(&self) -> ChannelMode {
        self.channel_mode
    }

    /// Descriptor with exactly one bit set in each mask.
    pub fn to_descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::ldac(self.sample_rate.into(), self.channel_mode.into())
    }

    pub fn to_bytes(&self) -> [u8; CAPS_SIZE] {
        self.to_descriptor().to_bytes()
    }

    /// Validate a configuration blob (as set by the remote via
    /// SET_CONFIGURATION, or echoed back from [`to_bytes`](Self::to_bytes)).
    ///
    /// Each mask must carry exactly one known bit.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let desc = CapabilityDescriptor::parse(data)?;
        if desc.vendor_id != LDAC_VENDOR_ID || desc.codec_id != LDAC_CODEC_ID {
            return Err(CodecError::Unsupported("not an LDAC configuration"));
        }
        let sample_rate = desc
            .sample_rates
            .single()
            .ok_or(CodecError::Unsupported("configuration must select one sample rate"))?;
        let channel_mode = desc
            .channel_modes
            .single()
            .ok_or(CodecError::Unsupported("configuration must select one channel mode"))?;
        Ok(Self {
            sample_rate,
            channel_mode,
        })
    }
}

/// Pick one configuration out of the remote's capability set.
pub fn select_configuration(remote: &CapabilityDescriptor) -> Result<SelectedConfiguration> {
    let conf = CapabilityDescriptor {
        vendor_id: LDAC_VENDOR_ID,
        codec_id: LDAC_CODEC_ID,
        ..*remote
    };

    let sample_rate = select_sample_rate(conf.sample_rates)
        .ok_or(CodecError::Unsupported("no common sample rate"))?;
    let channel_mode = select_channel_mode(conf.channel_modes)
        .ok_or(CodecError::Unsupported("no common channel mode"))?;

    tracing::debug!(
        rates = remote.sample_rates.0,
        modes = remote.channel_modes.0,
        %sample_rate,
        %channel_mode,
        "LDAC configuration selected"
    );

    Ok(SelectedConfiguration {
        sample_rate,
        channel_mode,
    })
}

/// Parse remote capabilities and return the selected configuration blob.
pub fn select_configuration_bytes(remote: &[u8]) -> Result<[u8; CAPS_SIZE]> {
    let caps = CapabilityDescriptor::parse(remote)?;
    Ok(select_configuration(&caps)?.to_bytes())
}

/// Highest set rate bit. Equivalent to scanning the rates in ascending
/// order and letting each set bit overwrite the previous choice.
fn select_sample_rate(mask: SampleRateMask) -> Option<SampleRate> {
    mask.highest()
}

fn select_channel_mode(mask: ChannelModeMask) -> Option<ChannelMode> {
    mask.preferred()
}
