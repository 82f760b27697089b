//! Backpressure-driven quality control.
//!
//! The transport manager reports, once per packet or per write attempt,
//! whether the link is congested (socket would block, queue above a
//! threshold, ...). [`QualityController`] applies hysteresis to those
//! observations and steps the session's engine down quickly under
//! congestion and back up slowly once the link has been clear for a while.

use crate::engine::EncodingEngine;
use crate::session::EncoderSession;

/// Default number of consecutive congested observations before stepping down.
pub const DEFAULT_REDUCE_AFTER: u32 = 2;

/// Default number of consecutive clear observations before stepping up.
pub const DEFAULT_INCREASE_AFTER: u32 = 50;

/// Hysteresis thresholds for [`QualityController`].
#[derive(Debug, Clone)]
pub struct QualityControllerConfig {
    pub reduce_after: u32,
    pub increase_after: u32,
}

impl Default for QualityControllerConfig {
    fn default() -> Self {
        Self {
            reduce_after: DEFAULT_REDUCE_AFTER,
            increase_after: DEFAULT_INCREASE_AFTER,
        }
    }
}

/// Link state reported by the transport manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backpressure {
    Congested,
    Clear,
}

/// What the controller did with one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityAction {
    None,
    /// `reduce_quality` was called; carries the engine status.
    Reduced(i32),
    /// `increase_quality` was called; carries the engine status.
    Increased(i32),
}

#[derive(Debug)]
pub struct QualityController {
    config: QualityControllerConfig,
    congested: u32,
    clear: u32,
}

impl QualityController {
    pub fn new(config: QualityControllerConfig) -> Self {
        Self {
            config,
            congested: 0,
            clear: 0,
        }
    }

    /// Feed one observation, adjusting `session` when a threshold is hit.
    pub fn observe<E: EncodingEngine>(
        &mut self,
        session: &mut EncoderSession<E>,
        pressure: Backpressure,
    ) -> QualityAction {
        match pressure {
            Backpressure::Congested => {
                self.clear = 0;
                self.congested += 1;
                if self.congested >= self.config.reduce_after.max(1) {
                    self.congested = 0;
                    let status = session.reduce_quality();
                    tracing::debug!(status, "link congested, quality reduced");
                    return QualityAction::Reduced(status);
                }
            }
            Backpressure::Clear => {
                self.congested = 0;
                self.clear += 1;
                if self.clear >= self.config.increase_after.max(1) {
                    self.clear = 0;
                    let status = session.increase_quality();
                    tracing::debug!(status, "link clear, quality increased");
                    return QualityAction::Increased(status);
                }
            }
        }
        QualityAction::None
    }

    /// Forget any partial streak, e.g. after the stream was suspended.
    pub fn reset(&mut self) {
        self.congested = 0;
        self.clear = 0;
    }
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new(QualityControllerConfig::default())
    }
}
