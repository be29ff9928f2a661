use bytes::{BufMut, BytesMut};

use super::ts::{adaptation_field, af_pcr, nano_90khz, transport_stream_packet, TsPacket};

/// Payload room in the PES lead packet once the PCR adaptation field (8
/// bytes minimum) is accounted for.
const FIRST_PACKET_PAYLOAD: usize = 176;

/// Optional PES header carrying a 33-bit PTS (no DTS).
pub fn optional_pes_header(data_alignment: bool, pts_90khz: u64) -> BytesMut {
    let mut header = BytesMut::with_capacity(8);
    // marker '10', scrambling 0, priority 0, alignment, copyright 0, original 0
    header.put_u8(0x80 | (u8::from(data_alignment) << 2));
    // PTS present, DTS absent
    header.put_u8(0x80);
    header.put_u8(5);

    let pts = pts_90khz & 0x1_ffff_ffff;
    header.put_u8(0x21 | (((pts >> 30) as u8 & 0x07) << 1));
    header.put_u8((pts >> 22) as u8);
    header.put_u8(0x01 | (((pts >> 15) as u8 & 0x7f) << 1));
    header.put_u8((pts >> 7) as u8);
    header.put_u8(0x01 | ((pts as u8 & 0x7f) << 1));
    header
}

/// Assembles a PES packet: start-code prefix, stream id, 16-bit length
/// (saturating at 0xffff), optional header, payload.
pub fn pes_packet(stream_id: u8, optional_header: &[u8], data: &[u8]) -> BytesMut {
    let mut pes = BytesMut::with_capacity(6 + optional_header.len() + data.len());
    pes.put_slice(&[0x00, 0x00, 0x01]);
    pes.put_u8(stream_id);
    pes.put_u16((optional_header.len() + data.len()).min(0xffff) as u16);
    pes.put_slice(optional_header);
    pes.put_slice(data);
    pes
}

/// Splits PES packets for one elementary stream across TS packets, keeping
/// the continuity counter across calls. The lead packet carries a PCR
/// adaptation field; the PCR and PTS both derive from the same wall-clock
/// nanosecond timestamp.
pub struct PesStream {
    pid: u16,
    stream_id: u8,
    continuity: u8,
}

impl PesStream {
    #[must_use]
    pub fn new(pid: u16, stream_id: u8) -> Self {
        Self {
            pid,
            stream_id,
            continuity: 0,
        }
    }

    pub fn write(&mut self, data: &[u8], pts_nanos: u64) -> Vec<TsPacket> {
        let pcr = nano_90khz(pts_nanos);
        let header = optional_pes_header(true, pcr);
        let pes = pes_packet(self.stream_id, &header, data);

        let mut out = Vec::with_capacity(pes.len() / 184 + 1);

        let first_len = pes.len().min(FIRST_PACKET_PAYLOAD);
        let field = adaptation_field(184 - first_len, false, true, false, Some(af_pcr(pcr)));
        out.push(transport_stream_packet(
            true,
            false,
            self.pid,
            self.continuity,
            Some(&field),
            &pes[..first_len],
        ));
        self.continuity = (self.continuity + 1) & 0x0f;

        let mut rest = &pes[first_len..];
        while rest.len() >= 184 {
            out.push(transport_stream_packet(
                false,
                false,
                self.pid,
                self.continuity,
                None,
                &rest[..184],
            ));
            self.continuity = (self.continuity + 1) & 0x0f;
            rest = &rest[184..];
        }

        if !rest.is_empty() {
            out.push(transport_stream_packet(
                false,
                false,
                self.pid,
                self.continuity,
                None,
                rest,
            ));
            self.continuity = (self.continuity + 1) & 0x0f;
        }

        out
    }
}
