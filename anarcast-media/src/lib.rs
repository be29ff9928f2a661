// anarcast-media - the protocol stack for Anarcast
//
// Layout:
// - adts/   - ADTS frame synchronizer and header accessors
// - icy/    - SHOUTcast/Icecast inline-metadata demuxer
// - mpegts/ - MPEG-TS primitives (TS/PAT/PMT/PES/PCR) and the
//             ADTS-to-TS packetizer
//
// Everything here is pure byte-level work; no I/O, no async.

pub mod adts;
pub mod icy;
pub mod mpegts;

pub use adts::{AdtsSync, Frame};
pub use icy::IcyDemuxer;
pub use mpegts::errors::PacketizeError;
pub use mpegts::packetizer::{PacketOrBoundary, Packetizer};

#[cfg(test)]
mod tests {
    use super::*;

    fn adts_frame(freq_index: u8, payload_len: usize) -> Vec<u8> {
        let len = 7 + payload_len;
        let mut f = vec![0xff, 0xf1];
        f.push(0x40 | (freq_index << 2));
        f.push(0x80 | ((len >> 11) & 0x03) as u8);
        f.push(((len >> 3) & 0xff) as u8);
        f.push((((len & 0x07) << 5) as u8) | 0x1f);
        f.push(0xfc);
        f.extend((0..payload_len).map(|i| (i % 251) as u8));
        f
    }

    // Full pipeline: an ICY stream wrapping ADTS audio comes apart into the
    // original frames, which packetize into whole 188-byte TS packets.
    #[test]
    fn icy_adts_mpegts_pipeline() {
        let frames: Vec<Vec<u8>> = (0..6).map(|_| adts_frame(3, 120)).collect();
        let audio: Vec<u8> = frames.iter().flatten().copied().collect();

        // Interleave metadata every 100 audio bytes.
        let metaint = 100;
        let title = b"StreamTitle='test';";
        let blocks = (title.len() + 15) / 16;
        let mut wire = Vec::new();
        for run in audio.chunks(metaint) {
            wire.extend_from_slice(run);
            if run.len() == metaint {
                wire.push(blocks as u8);
                wire.extend_from_slice(title);
                wire.extend(std::iter::repeat(0u8).take(blocks * 16 - title.len()));
            }
        }

        let mut demux = IcyDemuxer::new(metaint);
        let mut sync = AdtsSync::new();
        let mut recovered: Vec<Vec<u8>> = Vec::new();
        let mut meta_blocks = 0;

        for piece in wire.chunks(17) {
            demux.feed(piece, &mut |bytes, is_meta| {
                if is_meta {
                    meta_blocks += 1;
                } else {
                    sync.feed(bytes, &mut |frame, in_sync| {
                        assert!(in_sync);
                        recovered.push(frame.to_vec());
                        true
                    });
                }
            });
        }

        assert_eq!(recovered, frames);
        assert!(meta_blocks > 0);

        let mut packetizer = Packetizer::new(1_000_000_000, 10, true);
        for frame in &recovered {
            for item in packetizer.packetize(Frame::new(frame)).unwrap() {
                match item {
                    PacketOrBoundary::Packet(p) => {
                        assert_eq!(p.as_bytes().len(), 188);
                        assert_eq!(p.as_bytes()[0], 0x47);
                    }
                    PacketOrBoundary::Boundary { .. } => panic!("boundary before interval"),
                }
            }
        }
    }
}
