#[derive(Debug, thiserror::Error)]
pub enum PacketizeError {
    #[error("sampling frequency is zero (forbidden frequency index)")]
    InvalidSamplingFrequency,

    #[error("sampling frequency changed mid-stream")]
    SamplingFrequencyChanged,

    #[error("more than one AAC frame per ADTS frame")]
    MultipleAacFrames,
}
