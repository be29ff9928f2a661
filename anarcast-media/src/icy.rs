//! SHOUTcast/Icecast inline-metadata demuxer.
//!
//! An ICY stream interleaves a metadata block into the audio every
//! `metaint` bytes: one length byte `L`, then exactly `L * 16` bytes of
//! metadata (`L` may be 0). The demuxer splits the combined stream back
//! into audio runs and whole metadata blocks.

enum State {
    /// Consuming audio, up to `metaint` bytes since the last block.
    Data,
    /// The single metadata length byte.
    Len,
    /// Accumulating a metadata block of a known size.
    Meta,
}

pub struct IcyDemuxer {
    metaint: usize,
    state: State,
    /// Bytes remaining in the current state.
    todo: usize,
    meta: Vec<u8>,
}

impl IcyDemuxer {
    /// `metaint` of 0 disables metadata entirely: input passes through as
    /// pure audio.
    #[must_use]
    pub fn new(metaint: usize) -> Self {
        Self {
            metaint,
            state: State::Data,
            todo: metaint,
            meta: Vec::new(),
        }
    }

    /// Splits `buf` into callbacks `cb(bytes, is_metadata)`. Audio runs are
    /// passed through as they arrive; a metadata block is buffered until
    /// complete and then emitted in one piece, even when it spans input
    /// buffers.
    pub fn feed(&mut self, mut buf: &[u8], cb: &mut impl FnMut(&[u8], bool)) {
        if self.metaint == 0 {
            cb(buf, false);
            return;
        }

        while !buf.is_empty() {
            match self.state {
                State::Data => {
                    if buf.len() < self.todo {
                        cb(buf, false);
                        self.todo -= buf.len();
                        return;
                    }
                    cb(&buf[..self.todo], false);
                    buf = &buf[self.todo..];
                    self.todo = 0;
                    self.state = State::Len;
                }
                State::Len => {
                    let len = usize::from(buf[0]) * 16;
                    buf = &buf[1..];
                    if len == 0 {
                        cb(&[], true);
                        self.todo = self.metaint;
                        self.state = State::Data;
                    } else {
                        self.meta.clear();
                        self.todo = len;
                        self.state = State::Meta;
                    }
                }
                State::Meta => {
                    if buf.len() < self.todo {
                        self.meta.extend_from_slice(buf);
                        self.todo -= buf.len();
                        return;
                    }
                    self.meta.extend_from_slice(&buf[..self.todo]);
                    cb(&self.meta, true);
                    buf = &buf[self.todo..];
                    self.todo = self.metaint;
                    self.state = State::Data;
                }
            }
        }
    }
}
