use bytes::{BufMut, BytesMut};

use super::define::{TS_PACKET_SIZE, TS_PAYLOAD_SIZE, TS_SYNC_BYTE};

/// One 188-byte transport-stream packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsPacket([u8; TS_PACKET_SIZE]);

impl TsPacket {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn tei(&self) -> bool {
        self.0[1] & 0x80 != 0
    }

    pub fn pusi(&self) -> bool {
        self.0[1] & 0x40 != 0
    }

    pub fn pid(&self) -> u16 {
        (u16::from(self.0[1] & 0x1f) << 8) | u16::from(self.0[2])
    }

    pub fn continuity_counter(&self) -> u8 {
        self.0[3] & 0x0f
    }

    pub fn has_adaptation_field(&self) -> bool {
        self.0[3] & 0x20 != 0
    }

    /// Payload bytes after the header and any adaptation field.
    pub fn payload(&self) -> &[u8] {
        let start = if self.has_adaptation_field() {
            4 + 1 + usize::from(self.0[4])
        } else {
            4
        };
        &self.0[start..]
    }
}

impl AsRef<[u8]> for TsPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Builds one TS packet. `adaptation_field`, when present, must be sized by
/// the caller so field plus payload fill the packet exactly; without one, a
/// payload shorter than 184 bytes is padded out with a stuffing adaptation
/// field.
pub fn transport_stream_packet(
    pusi: bool,
    priority: bool,
    pid: u16,
    continuity: u8,
    adaptation_field: Option<&[u8]>,
    payload: &[u8],
) -> TsPacket {
    let mut buf = [0u8; TS_PACKET_SIZE];
    buf[0] = TS_SYNC_BYTE;
    buf[1] = (u8::from(pusi) << 6) | (u8::from(priority) << 5) | ((pid >> 8) as u8 & 0x1f);
    buf[2] = (pid & 0xff) as u8;

    let mut pos = 4;
    match adaptation_field {
        Some(field) => {
            debug_assert_eq!(field.len() + payload.len(), TS_PAYLOAD_SIZE);
            buf[3] = 0x30 | (continuity & 0x0f);
            buf[pos..pos + field.len()].copy_from_slice(field);
            pos += field.len();
        }
        None if payload.len() < TS_PAYLOAD_SIZE => {
            buf[3] = 0x30 | (continuity & 0x0f);
            let pad = TS_PAYLOAD_SIZE - payload.len();
            buf[4] = (pad - 1) as u8;
            if pad > 1 {
                buf[5] = 0x00;
                for b in &mut buf[6..4 + pad] {
                    *b = 0xff;
                }
            }
            pos += pad;
        }
        None => {
            buf[3] = 0x10 | (continuity & 0x0f);
        }
    }

    buf[pos..pos + payload.len()].copy_from_slice(payload);
    TsPacket(buf)
}

/// Builds an adaptation field of exactly `total_len` bytes (including the
/// length byte); anything beyond the flags and optional PCR is stuffing.
pub fn adaptation_field(
    total_len: usize,
    discontinuity: bool,
    random_access: bool,
    es_priority: bool,
    pcr: Option<[u8; 6]>,
) -> BytesMut {
    debug_assert!(total_len >= 2 + if pcr.is_some() { 6 } else { 0 });

    let mut field = BytesMut::with_capacity(total_len);
    field.put_u8((total_len - 1) as u8);

    let mut flags = 0u8;
    if discontinuity {
        flags |= 0x80;
    }
    if random_access {
        flags |= 0x40;
    }
    if es_priority {
        flags |= 0x20;
    }
    if pcr.is_some() {
        flags |= 0x10;
    }
    field.put_u8(flags);

    if let Some(pcr) = pcr {
        field.put_slice(&pcr);
    }
    field.resize(total_len, 0xff);
    field
}

/// Encodes a 90 kHz clock value as the 6-byte PCR field: 33-bit base, six
/// reserved bits set, 9-bit extension zero.
pub fn af_pcr(pcr_90khz: u64) -> [u8; 6] {
    let base = pcr_90khz & 0x1_ffff_ffff;
    let packed = (base << 15) | (0x3f << 9);
    let bytes = packed.to_be_bytes();
    [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
}

/// Nanoseconds to the 90 kHz PES/PCR clock.
pub fn nano_90khz(nanos: u64) -> u64 {
    nanos * 9 / 100_000
}
