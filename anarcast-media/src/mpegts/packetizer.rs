use crate::adts::Frame;

use super::define::{
    AUDIO_PID, AUDIO_STREAM_ID, ESD_PID, ES_INFO, PROGRAM_DESCRIPTORS, PROGRAM_MAP_PID,
    PROGRAM_NUMBER,
};
use super::errors::PacketizeError;
use super::pes::PesStream;
use super::psi::PsiTables;
use super::ts::TsPacket;

/// Packetizer output: wire packets interleaved with in-band segment
/// boundaries. A boundary carries the finished segment's starting
/// timestamp and duration (both nanoseconds) and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketOrBoundary {
    Packet(TsPacket),
    Boundary {
        timestamp_nanos: u64,
        duration_nanos: u64,
    },
}

/// Turns a stream of ADTS frames into transport-stream packets: PAT/PMT at
/// the head of every segment, one frame per PES packet, PTS running from
/// `start_nanos` at the source's frame rate. After roughly
/// `interval_secs` of audio a segment boundary is produced ahead of the
/// next PAT/PMT so a splitter can close the previous segment first.
pub struct Packetizer {
    start_nanos: u64,
    interval_secs: u64,
    emit_boundary: bool,
    psi: PsiTables,
    pes: PesStream,
    total_frames: u64,
    frames_since_pat: u64,
    fps: f64,
    frame_nanos: u64,
    sampling_frequency: u32,
}

impl Packetizer {
    #[must_use]
    pub fn new(start_nanos: u64, interval_secs: u64, emit_boundary: bool) -> Self {
        Self {
            start_nanos,
            interval_secs,
            emit_boundary,
            psi: PsiTables::new(
                PROGRAM_NUMBER,
                PROGRAM_MAP_PID,
                AUDIO_PID,
                &PROGRAM_DESCRIPTORS,
                &ES_INFO,
                ESD_PID,
            ),
            pes: PesStream::new(AUDIO_PID, AUDIO_STREAM_ID),
            total_frames: 0,
            frames_since_pat: 0,
            fps: 0.0,
            frame_nanos: 0,
            sampling_frequency: 0,
        }
    }

    pub fn packetize(&mut self, frame: Frame<'_>) -> Result<Vec<PacketOrBoundary>, PacketizeError> {
        if self.sampling_frequency == 0 {
            let freq = frame.sampling_frequency();
            if freq == 0 {
                return Err(PacketizeError::InvalidSamplingFrequency);
            }
            self.sampling_frequency = freq;
            self.fps = frame.frames_per_second();
            self.frame_nanos = frame.frame_duration_nanos();
        }

        if frame.sampling_frequency() != self.sampling_frequency {
            return Err(PacketizeError::SamplingFrequencyChanged);
        }
        if frame.number_aac_frames_minus_one() != 0 {
            return Err(PacketizeError::MultipleAacFrames);
        }

        let mut out = Vec::new();

        // Past the segment interval: close the running segment before the
        // refresh tables of the next one.
        if self.frames_since_pat > (self.fps as u64) * self.interval_secs {
            if self.emit_boundary {
                out.push(PacketOrBoundary::Boundary {
                    timestamp_nanos: self.start_nanos + self.frame_nanos * self.total_frames,
                    duration_nanos: self.frames_since_pat * self.frame_nanos,
                });
            }
            self.frames_since_pat = 0;
        }

        if self.frames_since_pat == 0 {
            out.extend(self.psi.packets().map(PacketOrBoundary::Packet));
        }

        let pts_nanos = self.start_nanos + self.frame_nanos * self.total_frames;
        out.extend(
            self.pes
                .write(frame.as_bytes(), pts_nanos)
                .into_iter()
                .map(PacketOrBoundary::Packet),
        );

        self.total_frames += 1;
        self.frames_since_pat += 1;

        Ok(out)
    }
}
