//! A2DP codec plugins and media packet framing.
//!
//! A transport manager talks to codecs through the [`A2dpCodec`] trait
//! for everything that happens before streaming: advertising capabilities
//! during AVDTP discovery and turning a remote capability set into a
//! configuration. Streaming itself goes through the codec's concrete
//! session type, which owns the encoding engine.
//!
//! ## Media packets
//!
//! Every outgoing packet starts with the 12-byte RTP fixed header
//! ([`rtp::RtpHeader`]) followed by a one-byte media payload header
//! whose low nibble counts the frames in the packet:
//!
//! ```text
//! | RTP header (12) | count (1) | frame | frame | ... |
//! ```
//!
//! ## Supported codecs
//!
//! | Codec | Module | Status |
//! |-------|--------|--------|
//! | LDAC  | [`ldac`] | Implemented |

pub mod ldac;
pub mod rtp;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;

/// AVDTP media codec type for vendor-specific codecs.
pub const A2DP_CODEC_VENDOR: u8 = 0xFF;

/// Identity of a codec as seen in AVDTP capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecId {
    pub codec_type: u8,
    pub vendor_id: u32,
    pub vendor_codec_id: u16,
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#04x}:{:#010x}:{:#06x}",
            self.codec_type, self.vendor_id, self.vendor_codec_id
        )
    }
}

/// Codec plugin contract used during stream setup.
///
/// ## Implementing a new codec
///
/// 1. Create a new module (e.g. `media/aptx.rs`)
/// 2. Implement `A2dpCodec` for your type, plus a session type for encoding
/// 3. Register it with [`CodecRegistry::add`]
pub trait A2dpCodec: Send + Sync {
    /// Short name, e.g. `"ldac"`.
    fn name(&self) -> &'static str;

    /// Human-readable name, e.g. `"LDAC"`.
    fn description(&self) -> &'static str;

    fn id(&self) -> CodecId;

    /// Capability blob advertised to the remote.
    fn fill_capabilities(&self) -> Vec<u8>;

    /// Pick one configuration out of the remote's capability blob and
    /// return it in wire form.
    fn select_configuration(&self, remote_caps: &[u8]) -> Result<Vec<u8>>;
}

/// Registry of available codecs, keyed by name.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: Arc<RwLock<HashMap<&'static str, Arc<dyn A2dpCodec>>>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            codecs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry with every codec this crate implements.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.add(Arc::new(ldac::LdacCodec::new()));
        registry
    }

    /// Register a codec. Replaces any codec with the same name.
    pub fn add(&self, codec: Arc<dyn A2dpCodec>) {
        let name = codec.name();
        let id = codec.id();
        self.codecs.write().insert(name, codec);
        tracing::info!(name, %id, "codec registered");
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn A2dpCodec>> {
        self.codecs.read().get(name).cloned()
    }

    /// Look up a codec by its AVDTP identity.
    pub fn find(&self, id: &CodecId) -> Option<Arc<dyn A2dpCodec>> {
        self.codecs
            .read()
            .values()
            .find(|codec| codec.id() == *id)
            .cloned()
    }

    /// Registered codec names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.codecs.read().keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{LDAC_CODEC_ID, LDAC_VENDOR_ID};

    struct Dummy(&'static str, u16);

    impl A2dpCodec for Dummy {
        fn name(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &'static str {
            "dummy"
        }

        fn id(&self) -> CodecId {
            CodecId {
                codec_type: A2DP_CODEC_VENDOR,
                vendor_id: 0x4F,
                vendor_codec_id: self.1,
            }
        }

        fn fill_capabilities(&self) -> Vec<u8> {
            vec![self.1 as u8]
        }

        fn select_configuration(&self, remote_caps: &[u8]) -> Result<Vec<u8>> {
            Ok(remote_caps.to_vec())
        }
    }

    #[test]
    fn defaults_contain_ldac() {
        let registry = CodecRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["ldac"]);

        let ldac = registry.get("ldac").unwrap();
        assert_eq!(ldac.description(), "LDAC");

        let id = CodecId {
            codec_type: A2DP_CODEC_VENDOR,
            vendor_id: LDAC_VENDOR_ID,
            vendor_codec_id: LDAC_CODEC_ID,
        };
        assert_eq!(registry.find(&id).unwrap().name(), "ldac");
    }

    #[test]
    fn add_replaces_same_name() {
        let registry = CodecRegistry::new();
        registry.add(Arc::new(Dummy("x", 1)));
        registry.add(Arc::new(Dummy("x", 2)));
        registry.add(Arc::new(Dummy("y", 3)));

        assert_eq!(registry.names(), vec!["x", "y"]);
        assert_eq!(registry.get("x").unwrap().fill_capabilities(), vec![2]);
        assert!(registry.get("z").is_none());
    }

    #[test]
    fn find_unknown_id() {
        let registry = CodecRegistry::with_defaults();
        let id = CodecId {
            codec_type: 0x00,
            vendor_id: 0,
            vendor_codec_id: 0,
        };
        assert!(registry.find(&id).is_none());
    }
}
