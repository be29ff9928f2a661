//! ADTS (Audio Data Transport Stream) framing for AAC.
//!
//! `Frame` decodes the fixed-layout 7/9-byte header; [`AdtsSync`] recovers
//! frame boundaries from an arbitrary byte stream.

mod frame;
mod sync;

pub use frame::Frame;
pub use sync::AdtsSync;
