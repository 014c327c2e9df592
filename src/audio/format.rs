//! # Audio Format Conversion
//!
//! Lossless conversion between the portable [`AudioFormat`] descriptor
//! and the platform-native packed-PCM [`StreamDescription`].
//!
//! ## Plain English
//!
//! Application code thinks in "44100 Hz, stereo, 16-bit signed,
//! little-endian". The platform audio layer thinks in a packed struct
//! with a flags bitmask and byte counts per frame and packet. These
//! two functions translate between the vocabularies, and the round
//! trip must not lose a single property, because a mismatch of even
//! the byte order turns audio into noise.

// ============================================
// PORTABLE FORMAT
// ============================================

/// How one sample value is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleType {
    /// Encoding not known. Converted as unsigned.
    Unknown,
    /// Two's-complement signed integer.
    SignedInt,
    /// Unsigned integer.
    UnsignedInt,
    /// IEEE float.
    Float,
}

/// Byte order of multi-byte samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleByteOrder {
    LittleEndian,
    BigEndian,
}

/// The portable sample-format descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioFormat {
    /// Sample frames per second.
    pub sample_rate: u32,
    /// Interleaved channels per frame.
    pub channels: u32,
    /// Bits in one sample of one channel.
    pub bits_per_sample: u32,
    /// Byte order of each sample.
    pub byte_order: SampleByteOrder,
    /// Sample encoding.
    pub sample_type: SampleType,
}

impl AudioFormat {
    /// CD-quality stereo: 44100 Hz, 2 channels, 16-bit little-endian
    /// signed integers.
    pub fn cd_quality() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bits_per_sample: 16,
            byte_order: SampleByteOrder::LittleEndian,
            sample_type: SampleType::SignedInt,
        }
    }

    /// Bytes in one sample frame (all channels).
    pub fn bytes_per_frame(&self) -> u32 {
        self.channels * (self.bits_per_sample / 8)
    }

    /// Bytes streamed per second.
    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate * self.bytes_per_frame()
    }
}

// ============================================
// NATIVE STREAM DESCRIPTION
// ============================================

/// Sample values are IEEE floats.
pub const FLAG_FLOAT: u32 = 1 << 0;
/// Multi-byte samples are big-endian.
pub const FLAG_BIG_ENDIAN: u32 = 1 << 1;
/// Integer samples are two's-complement signed.
pub const FLAG_SIGNED_INTEGER: u32 = 1 << 2;
/// Samples are packed with no padding bits.
pub const FLAG_PACKED: u32 = 1 << 3;

/// Format identifier for linear PCM (fourcc `lpcm`).
pub const FORMAT_LINEAR_PCM: u32 = u32::from_be_bytes(*b"lpcm");

/// The platform-native stream descriptor for packed linear PCM.
///
/// Field-for-field this mirrors what the platform audio layer
/// consumes; the derived byte counts follow from the other fields and
/// are filled in by [`from_format`](StreamDescription::from_format).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamDescription {
    /// Sample frames per second.
    pub sample_rate: f64,
    /// Container format identifier.
    pub format_id: u32,
    /// Bitwise OR of the `FLAG_*` constants.
    pub format_flags: u32,
    /// `frames_per_packet * bytes_per_frame`.
    pub bytes_per_packet: u32,
    /// Always 1 for linear PCM.
    pub frames_per_packet: u32,
    /// `channels_per_frame * bits_per_channel / 8`.
    pub bytes_per_frame: u32,
    /// Interleaved channels per frame.
    pub channels_per_frame: u32,
    /// Bits in one sample of one channel.
    pub bits_per_channel: u32,
}

impl StreamDescription {
    /// Builds the native descriptor for a portable format.
    ///
    /// Unsigned integer encoding is the flag-absent default; signed
    /// and float each contribute their flag on top of `FLAG_PACKED`.
    pub fn from_format(format: &AudioFormat) -> Self {
        let mut flags = FLAG_PACKED;
        match format.sample_type {
            SampleType::SignedInt => flags |= FLAG_SIGNED_INTEGER,
            SampleType::Float => flags |= FLAG_FLOAT,
            SampleType::UnsignedInt | SampleType::Unknown => {}
        }
        if format.byte_order == SampleByteOrder::BigEndian {
            flags |= FLAG_BIG_ENDIAN;
        }

        let bytes_per_frame = format.channels * (format.bits_per_sample / 8);
        let frames_per_packet = 1;

        Self {
            sample_rate: format.sample_rate as f64,
            format_id: FORMAT_LINEAR_PCM,
            format_flags: flags,
            bytes_per_packet: frames_per_packet * bytes_per_frame,
            frames_per_packet,
            bytes_per_frame,
            channels_per_frame: format.channels,
            bits_per_channel: format.bits_per_sample,
        }
    }

    /// Recovers the portable format from a native descriptor.
    pub fn to_format(&self) -> AudioFormat {
        let byte_order = if self.format_flags & FLAG_BIG_ENDIAN != 0 {
            SampleByteOrder::BigEndian
        } else {
            SampleByteOrder::LittleEndian
        };

        let sample_type = if self.format_flags & FLAG_SIGNED_INTEGER != 0 {
            SampleType::SignedInt
        } else if self.format_flags & FLAG_FLOAT != 0 {
            SampleType::Float
        } else {
            SampleType::UnsignedInt
        };

        AudioFormat {
            sample_rate: self.sample_rate as u32,
            channels: self.channels_per_frame,
            bits_per_sample: self.bits_per_channel,
            byte_order,
            sample_type,
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_cd_quality() {
        let format = AudioFormat::cd_quality();
        let native = StreamDescription::from_format(&format);
        assert_eq!(native.to_format(), format);
    }

    #[test]
    fn test_round_trip_representative_formats() {
        let formats = [
            AudioFormat {
                sample_rate: 48_000,
                channels: 2,
                bits_per_sample: 32,
                byte_order: SampleByteOrder::LittleEndian,
                sample_type: SampleType::Float,
            },
            AudioFormat {
                sample_rate: 8_000,
                channels: 1,
                bits_per_sample: 8,
                byte_order: SampleByteOrder::LittleEndian,
                sample_type: SampleType::UnsignedInt,
            },
            AudioFormat {
                sample_rate: 96_000,
                channels: 6,
                bits_per_sample: 24,
                byte_order: SampleByteOrder::BigEndian,
                sample_type: SampleType::SignedInt,
            },
        ];

        for format in formats {
            let native = StreamDescription::from_format(&format);
            assert_eq!(native.to_format(), format, "round trip lost a property");
        }
    }

    #[test]
    fn test_native_descriptor_fields() {
        let native = StreamDescription::from_format(&AudioFormat::cd_quality());

        assert_eq!(native.format_id, FORMAT_LINEAR_PCM);
        assert_eq!(native.frames_per_packet, 1);
        // 2 channels x 2 bytes.
        assert_eq!(native.bytes_per_frame, 4);
        assert_eq!(native.bytes_per_packet, 4);
        assert_eq!(native.sample_rate, 44_100.0);
        assert_eq!(native.format_flags, FLAG_PACKED | FLAG_SIGNED_INTEGER);
    }

    #[test]
    fn test_unsigned_is_the_flag_absent_default() {
        let format = AudioFormat {
            sample_type: SampleType::UnsignedInt,
            ..AudioFormat::cd_quality()
        };
        let native = StreamDescription::from_format(&format);
        assert_eq!(native.format_flags, FLAG_PACKED);

        // Unknown also converts as unsigned, so it round-trips to
        // UnsignedInt rather than back to Unknown.
        let unknown = AudioFormat {
            sample_type: SampleType::Unknown,
            ..format
        };
        let recovered = StreamDescription::from_format(&unknown).to_format();
        assert_eq!(recovered.sample_type, SampleType::UnsignedInt);
    }

    #[test]
    fn test_byte_accounting() {
        let format = AudioFormat {
            sample_rate: 48_000,
            channels: 2,
            bits_per_sample: 16,
            byte_order: SampleByteOrder::LittleEndian,
            sample_type: SampleType::SignedInt,
        };
        assert_eq!(format.bytes_per_frame(), 4);
        assert_eq!(format.bytes_per_second(), 192_000);
    }
}
