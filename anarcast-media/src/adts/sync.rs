/// Bytes tolerated before a frame completes; beyond this the buffer is
/// flushed as out-of-sync. Also bounds the accepted frame length.
const RESYNC_LIMIT: usize = 2000;

/// Recovers ADTS frame boundaries from an arbitrary byte stream.
///
/// Feed byte runs of any size; the callback receives `(bytes, true)` for
/// each complete frame and `(bytes, false)` for runs that never resolved
/// into a frame (leading garbage, resync gaps). Returning `false` from the
/// callback stops the scan.
pub struct AdtsSync {
    raw: Vec<u8>,
    pos: usize,
    frame_length: usize,
}

impl AdtsSync {
    #[must_use]
    pub fn new() -> Self {
        Self {
            raw: Vec::with_capacity(RESYNC_LIMIT + 1),
            pos: 0,
            frame_length: 0,
        }
    }

    /// Scans `buf`, invoking `cb` for every frame and resync gap found.
    /// Returns `false` if the callback asked to stop.
    pub fn feed(&mut self, buf: &[u8], cb: &mut impl FnMut(&[u8], bool) -> bool) -> bool {
        for &b in buf {
            self.raw.push(b);

            if self.raw.len() > RESYNC_LIMIT {
                let flushed = std::mem::take(&mut self.raw);
                self.pos = 0;
                if !cb(&flushed, false) {
                    return false;
                }
                continue;
            }

            match self.pos {
                // AAAAAAAA
                0 => {
                    if b != 0xff {
                        self.pos = 0;
                        continue;
                    }
                }
                // AAAABCCD - upper nibble of syncword, layer must be 0
                1 => {
                    if b & 0xf0 != 0xf0 || b & 0x06 != 0 {
                        self.pos = 0;
                        continue;
                    }
                }
                // HHIJKLMM .. MMMOOOOO - accumulate the 13-bit frame length
                3 => self.frame_length = usize::from(b & 0x03) << 11,
                4 => self.frame_length += usize::from(b) << 3,
                5 => {
                    self.frame_length += usize::from(b & 0xe0) >> 5;
                    if self.frame_length > RESYNC_LIMIT {
                        self.pos = 0;
                        continue;
                    }
                }
                _ => {}
            }

            self.pos += 1;

            if self.pos > 8 && self.pos == self.frame_length {
                let pre = self.raw.len() - self.frame_length;
                if pre > 0 && !cb(&self.raw[..pre], false) {
                    self.raw.clear();
                    self.pos = 0;
                    return false;
                }
                let keep_going = cb(&self.raw[pre..], true);
                self.raw.clear();
                self.pos = 0;
                if !keep_going {
                    return false;
                }
            }
        }

        true
    }
}

impl Default for AdtsSync {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adts_frame(payload_len: usize) -> Vec<u8> {
        let len = 7 + payload_len;
        let mut f = vec![0xff, 0xf1, 0x50];
        f.push(0x80 | ((len >> 11) & 0x03) as u8);
        f.push(((len >> 3) & 0xff) as u8);
        f.push((((len & 0x07) << 5) as u8) | 0x1f);
        f.push(0xfc);
        f.extend((0..payload_len).map(|i| (i % 200) as u8));
        f
    }

    fn collect(sync: &mut AdtsSync, input: &[u8]) -> Vec<(Vec<u8>, bool)> {
        let mut out = Vec::new();
        sync.feed(input, &mut |bytes, in_sync| {
            out.push((bytes.to_vec(), in_sync));
            true
        });
        out
    }

    #[test]
    fn clean_stream_yields_every_frame() {
        let frames = [adts_frame(10), adts_frame(57), adts_frame(200)];
        let stream: Vec<u8> = frames.iter().flatten().copied().collect();

        let mut sync = AdtsSync::new();
        let out = collect(&mut sync, &stream);

        assert_eq!(out.len(), 3);
        for (emitted, original) in out.iter().zip(frames.iter()) {
            assert_eq!(&emitted.0, original);
            assert!(emitted.1);
        }
    }

    #[test]
    fn byte_at_a_time_feed() {
        let frames = [adts_frame(30), adts_frame(31)];
        let stream: Vec<u8> = frames.iter().flatten().copied().collect();

        let mut sync = AdtsSync::new();
        let mut out = Vec::new();
        for b in stream {
            sync.feed(&[b], &mut |bytes, in_sync| {
                out.push((bytes.to_vec(), in_sync));
                true
            });
        }

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, frames[0]);
        assert_eq!(out[1].0, frames[1]);
    }

    #[test]
    fn leading_garbage_reported_out_of_sync() {
        let prefix: Vec<u8> = (0..37).map(|i| (i % 0x70) as u8).collect();
        let frame = adts_frame(64);
        let mut stream = prefix.clone();
        stream.extend_from_slice(&frame);

        let mut sync = AdtsSync::new();
        let out = collect(&mut sync, &stream);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0], (prefix, false));
        assert_eq!(out[1], (frame, true));
    }

    #[test]
    fn resync_overflow_flushes_buffer() {
        let junk = vec![0u8; RESYNC_LIMIT + 500];

        let mut sync = AdtsSync::new();
        let out = collect(&mut sync, &junk);

        // One flush once the buffer exceeds the bound; the remainder stays
        // buffered awaiting more input.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0.len(), RESYNC_LIMIT + 1);
        assert!(!out[0].1);
    }

    #[test]
    fn oversized_frame_length_resets_header_scan() {
        // A header claiming a frame longer than the safety bound must not
        // lock the scanner; the following real frame still comes out.
        let mut bogus = vec![0xff, 0xf1, 0x50, 0x83, 0xff, 0xff, 0xfc];
        let frame = adts_frame(40);
        bogus.extend_from_slice(&frame);

        let mut sync = AdtsSync::new();
        let out = collect(&mut sync, &bogus);

        let synced: Vec<_> = out.iter().filter(|(_, s)| *s).collect();
        assert_eq!(synced.len(), 1);
        assert_eq!(synced[0].0, frame);
    }

    #[test]
    fn callback_false_stops_scan() {
        let frames = [adts_frame(10), adts_frame(10)];
        let stream: Vec<u8> = frames.iter().flatten().copied().collect();

        let mut sync = AdtsSync::new();
        let mut seen = 0;
        let more = sync.feed(&stream, &mut |_, _| {
            seen += 1;
            false
        });

        assert!(!more);
        assert_eq!(seen, 1);
    }
}
