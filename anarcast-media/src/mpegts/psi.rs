use bytes::{BufMut, BytesMut};

use super::crc32::gen_crc32;
use super::define::STREAM_TYPE_AAC_ADTS;
use super::ts::{transport_stream_packet, TsPacket};

/// Program-specific information for a single-program stream: the PAT and
/// PMT sections are built once, then wrapped into fresh TS packets with an
/// incrementing continuity counter on every call.
pub struct PsiTables {
    pmt_pid: u16,
    continuity: u8,
    pat_section: BytesMut,
    pmt_section: BytesMut,
}

impl PsiTables {
    /// `program_descriptors` lands in the PMT program-info loop verbatim;
    /// `es_info` contributes the metadata elementary stream: its first byte
    /// is the stream type, the remainder its descriptor loop, advertised on
    /// `esd_pid` next to the ADTS audio stream on `es_pid`.
    #[must_use]
    pub fn new(
        program_number: u16,
        pmt_pid: u16,
        es_pid: u16,
        program_descriptors: &[u8],
        es_info: &[u8],
        esd_pid: u16,
    ) -> Self {
        Self {
            pmt_pid,
            continuity: 0,
            pat_section: pat_section(program_number, pmt_pid),
            pmt_section: pmt_section(program_number, es_pid, program_descriptors, es_info, esd_pid),
        }
    }

    /// The PAT/PMT packet pair for the head of a segment.
    pub fn packets(&mut self) -> [TsPacket; 2] {
        let cc = self.continuity & 0x0f;
        self.continuity = self.continuity.wrapping_add(1);

        [
            transport_stream_packet(true, false, 0, cc, None, &with_pointer(&self.pat_section)),
            transport_stream_packet(true, false, self.pmt_pid, cc, None, &with_pointer(&self.pmt_section)),
        ]
    }
}

/// A section becomes a packet payload by prefixing the pointer field.
fn with_pointer(section: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(section.len() + 1);
    payload.push(0x00);
    payload.extend_from_slice(section);
    payload
}

fn pat_section(program_number: u16, pmt_pid: u16) -> BytesMut {
    let mut section = BytesMut::with_capacity(16);
    section.put_u8(0x00); // table_id: program association section
    section.put_u16(0xb000 | 13); // syntax + reserved + section_length
    section.put_u16(1); // transport_stream_id
    section.put_u8(0xc1); // version 0, current
    section.put_u8(0x00); // section_number
    section.put_u8(0x00); // last_section_number
    section.put_u16(program_number);
    section.put_u16(0xe000 | pmt_pid);
    let crc = gen_crc32(0xffff_ffff, &section);
    section.put_u32(crc);
    section
}

fn pmt_section(
    program_number: u16,
    es_pid: u16,
    program_descriptors: &[u8],
    es_info: &[u8],
    esd_pid: u16,
) -> BytesMut {
    let mut body = BytesMut::with_capacity(64);
    body.put_u16(program_number);
    body.put_u8(0xc1); // version 0, current
    body.put_u8(0x00); // section_number
    body.put_u8(0x00); // last_section_number
    body.put_u16(0xe000 | es_pid); // PCR PID: the audio stream carries it
    body.put_u16(0xf000 | program_descriptors.len() as u16);
    body.put_slice(program_descriptors);

    // Audio elementary stream.
    body.put_u8(STREAM_TYPE_AAC_ADTS);
    body.put_u16(0xe000 | es_pid);
    body.put_u16(0xf000);

    // Metadata elementary stream: type byte up front, descriptors after.
    body.put_u8(es_info[0]);
    body.put_u16(0xe000 | esd_pid);
    body.put_u16(0xf000 | (es_info.len() - 1) as u16);
    body.put_slice(&es_info[1..]);

    let mut section = BytesMut::with_capacity(body.len() + 7);
    section.put_u8(0x02); // table_id: program map section
    section.put_u16(0xb000 | (body.len() + 4) as u16);
    section.put_slice(&body);
    let crc = gen_crc32(0xffff_ffff, &section);
    section.put_u32(crc);
    section
}
