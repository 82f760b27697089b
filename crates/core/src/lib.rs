pub mod caps;
pub mod engine;
pub mod error;
pub mod media;
pub mod negotiate;
pub mod quality;
pub mod session;

pub use caps::{CapabilityDescriptor, ChannelMode, SampleRate, fill_capabilities, parse_capabilities};
pub use engine::{EncodingEngine, EngineFactory, PassthroughEngine, QualityLevel};
pub use error::{CodecError, Result};
pub use media::ldac::LdacCodec;
pub use media::{A2dpCodec, CodecRegistry};
pub use negotiate::{SelectedConfiguration, select_configuration};
pub use quality::{Backpressure, QualityController};
pub use session::{EncoderSession, Packet, SessionOptions};
