use super::{A2DP_CODEC_VENDOR, A2dpCodec, CodecId};
use crate::caps::{self, CapabilityDescriptor, LDAC_CODEC_ID, LDAC_VENDOR_ID};
use crate::engine::EngineFactory;
use crate::error::Result;
use crate::negotiate::{self, SelectedConfiguration};
use crate::session::{AudioInfo, EncoderSession, SessionOptions};

/// LDAC codec plugin.
///
/// Stateless: capability handling is pure, and each stream gets its own
/// [`EncoderSession`] from [`init`](Self::init).
///
/// ## Negotiation
///
/// - Advertises all six sample rates (44.1 – 192 kHz) and all three
///   channel modes.
/// - Selects the highest common sample rate and prefers stereo over
///   dual-channel over mono.
///
/// ## Packet capacity
///
/// Nominal frame sizes per quality tier (330 / 220 / 110 bytes) decide how
/// many encode calls fit into one packet, capped at 15 frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct LdacCodec;

impl LdacCodec {
    pub fn new() -> Self {
        Self
    }

    /// Parsed form of [`A2dpCodec::select_configuration`].
    pub fn select(&self, remote: &CapabilityDescriptor) -> Result<SelectedConfiguration> {
        negotiate::select_configuration(remote)
    }

    /// Create an encoder session from a configuration blob previously
    /// produced by negotiation.
    pub fn init<F>(
        &self,
        config: &[u8],
        factory: &F,
        options: &SessionOptions,
    ) -> Result<(EncoderSession<F::Engine>, AudioInfo)>
    where
        F: EngineFactory,
    {
        let config = SelectedConfiguration::parse(config)?;
        EncoderSession::init(&config, factory, options)
    }
}

impl A2dpCodec for LdacCodec {
    fn name(&self) -> &'static str {
        "ldac"
    }

    fn description(&self) -> &'static str {
        "LDAC"
    }

    fn id(&self) -> CodecId {
        CodecId {
            codec_type: A2DP_CODEC_VENDOR,
            vendor_id: LDAC_VENDOR_ID,
            vendor_codec_id: LDAC_CODEC_ID,
        }
    }

    fn fill_capabilities(&self) -> Vec<u8> {
        caps::fill_capabilities().to_vec()
    }

    fn select_configuration(&self, remote_caps: &[u8]) -> Result<Vec<u8>> {
        Ok(negotiate::select_configuration_bytes(remote_caps)?.to_vec())
    }
}
