//! Transport-stream constants. The program layout values are taken from a
//! working reference server (Wowza) and must not drift: downstream players
//! key on them.

pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;
/// Payload bytes in a packet with no adaptation field.
pub const TS_PAYLOAD_SIZE: usize = 184;

pub const PROGRAM_NUMBER: u16 = 1;
pub const PROGRAM_MAP_PID: u16 = 4095;
pub const AUDIO_PID: u16 = 257;
pub const ESD_PID: u16 = 258;

/// PES stream id for the audio elementary stream.
pub const AUDIO_STREAM_ID: u8 = 0xc0;

/// PMT stream type: ISO/IEC 13818-7 audio with ADTS transport syntax.
pub const STREAM_TYPE_AAC_ADTS: u8 = 0x0f;

/// Program descriptor blob (metadata pointer, "ID3"), copied verbatim from
/// the reference server's PMT.
pub const PROGRAM_DESCRIPTORS: [u8; 16] = [
    0x25, 255, 255, 73, 68, 51, 32, 255, 73, 68, 51, 32, 0, 3, 0, 1,
];

/// Metadata elementary stream entry: stream type byte followed by its
/// descriptor blob ("ID3" metadata descriptor), copied verbatim.
pub const ES_INFO: [u8; 16] = [
    0x15, 38, 13, 255, 255, 73, 68, 51, 32, 255, 73, 68, 51, 32, 0, 15,
];
