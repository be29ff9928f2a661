// MPEG-TS muxing primitives (ITU-T H.222.0 / ISO 13818-1) for a single
// ADTS/AAC program, plus the segment-aware packetizer that turns ADTS
// frames into transport-stream packets.

pub mod define;
pub mod errors;
pub mod packetizer;
pub mod pes;
pub mod psi;
pub mod ts;

mod crc32;

pub use pes::{optional_pes_header, pes_packet, PesStream};
pub use psi::PsiTables;
pub use ts::{adaptation_field, af_pcr, nano_90khz, transport_stream_packet, TsPacket};
