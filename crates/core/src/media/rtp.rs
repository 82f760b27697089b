use crate::error::{CodecError, Result};

/// Size of the RTP fixed header (RFC 3550 §5.1).
pub const RTP_HEADER_SIZE: usize = 12;

/// Size of the media payload header that follows the RTP header.
pub const PAYLOAD_HEADER_SIZE: usize = 1;

/// Bytes written by [`start_packet`] before the first encoded frame.
pub const PREAMBLE_SIZE: usize = RTP_HEADER_SIZE + PAYLOAD_HEADER_SIZE;

/// Largest frame count the 4-bit payload header field can carry.
pub const MAX_FRAME_COUNT: u8 = 0x0F;

/// Payload type written into A2DP media packets.
pub const A2DP_PAYLOAD_TYPE: u8 = 1;

/// Synchronization source written into A2DP media packets.
pub const A2DP_SSRC: u32 = 1;

/// RTP fixed header (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Sequence number and timestamp are owned by the transport manager and
/// passed in per packet. Version is always 2; padding, extension, CSRC
/// count and marker are always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    /// RTP payload type (7-bit). Always 1 for A2DP media.
    pub pt: u8,
    /// Sequence number, incremented by the caller per packet.
    pub sequence: u16,
    /// Media timestamp in sample-rate units.
    pub timestamp: u32,
    /// Synchronization source identifier.
    pub ssrc: u32,
}

impl RtpHeader {
    /// A2DP media header with the fixed payload type and SSRC.
    pub fn a2dp(sequence: u16, timestamp: u32) -> Self {
        Self {
            pt: A2DP_PAYLOAD_TYPE,
            sequence,
            timestamp,
            ssrc: A2DP_SSRC,
        }
    }

    /// Serialize the 12-byte header.
    pub fn to_bytes(&self) -> [u8; RTP_HEADER_SIZE] {
        let mut header = [0u8; RTP_HEADER_SIZE];
        header[0] = 2 << 6;
        header[1] = self.pt & 0x7f;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        header
    }

    /// Parse a header from the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < RTP_HEADER_SIZE {
            return Err(CodecError::MalformedInput {
                expected: RTP_HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[0] >> 6 != 2 {
            return Err(CodecError::Unsupported("RTP version is not 2"));
        }
        Ok(Self {
            pt: data[1] & 0x7f,
            sequence: u16::from_be_bytes([data[2], data[3]]),
            timestamp: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            ssrc: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        })
    }
}

/// Media payload header carried right after the RTP header.
///
/// ```text
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// |F|S|L|R| Count |
/// +-+-+-+-+-+-+-+-+
/// ```
///
/// Only unfragmented packets are produced, so F/S/L are always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaPayloadHeader {
    pub frame_count: u8,
}

impl MediaPayloadHeader {
    pub fn to_byte(self) -> u8 {
        self.frame_count & MAX_FRAME_COUNT
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            frame_count: byte & MAX_FRAME_COUNT,
        }
    }
}

/// Write the packet preamble at the start of `dest`.
///
/// Zero-fills [`PREAMBLE_SIZE`] bytes, writes the A2DP RTP header and a
/// payload header with a frame count of zero, and returns the offset at
/// which encoded frames start. Bytes past the preamble are not touched.
pub fn start_packet(dest: &mut [u8], sequence: u16, timestamp: u32) -> Result<usize> {
    write_preamble(dest, &RtpHeader::a2dp(sequence, timestamp))
}

/// Like [`start_packet`] with an explicit header.
pub fn write_preamble(dest: &mut [u8], header: &RtpHeader) -> Result<usize> {
    if dest.len() < PREAMBLE_SIZE {
        return Err(CodecError::BufferTooSmall {
            needed: PREAMBLE_SIZE,
            available: dest.len(),
        });
    }
    let preamble = &mut dest[..PREAMBLE_SIZE];
    preamble.fill(0);
    preamble[..RTP_HEADER_SIZE].copy_from_slice(&header.to_bytes());
    preamble[RTP_HEADER_SIZE] = MediaPayloadHeader::default().to_byte();

    tracing::trace!(
        seq = header.sequence,
        ts = header.timestamp,
        "media packet started"
    );
    Ok(PREAMBLE_SIZE)
}

/// Frame count stored in a packet started with [`start_packet`].
pub fn frame_count(packet: &[u8]) -> Option<u8> {
    packet
        .get(RTP_HEADER_SIZE)
        .map(|byte| MediaPayloadHeader::from_byte(*byte).frame_count)
}

/// Overwrite the frame count of a packet started with [`start_packet`].
pub(crate) fn set_frame_count(packet: &mut [u8], count: u8) {
    if let Some(byte) = packet.get_mut(RTP_HEADER_SIZE) {
        *byte = (*byte & !MAX_FRAME_COUNT) | (count & MAX_FRAME_COUNT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(sequence: u16, timestamp: u32) -> [u8; 32] {
        let mut buf = [0xAAu8; 32];
        let n = start_packet(&mut buf, sequence, timestamp).unwrap();
        assert_eq!(n, PREAMBLE_SIZE);
        buf
    }

    #[test]
    fn version_is_2() {
        let buf = started(0, 0);
        assert_eq!(buf[0] >> 6, 2);
        assert_eq!(buf[0] & 0x3f, 0);
    }

    #[test]
    fn payload_type_and_marker() {
        let buf = started(0, 0);
        assert_eq!(buf[1] & 0x7f, 1);
        assert_eq!(buf[1] & 0x80, 0);
    }

    #[test]
    fn sequence_and_timestamp_big_endian() {
        let buf = started(0x1234, 0xAABB_CCDD);
        assert_eq!(&buf[2..4], &[0x12, 0x34]);
        assert_eq!(&buf[4..8], &[0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn ssrc_written() {
        let buf = started(7, 9);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        assert_eq!(ssrc, 1);
    }

    #[test]
    fn frame_count_starts_at_zero() {
        let buf = started(7, 9);
        assert_eq!(buf[12], 0);
        assert_eq!(frame_count(&buf), Some(0));
    }

    #[test]
    fn bytes_after_preamble_untouched() {
        let buf = started(7, 9);
        assert!(buf[PREAMBLE_SIZE..].iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn short_buffer_rejected() {
        let mut buf = [0u8; 12];
        assert!(matches!(
            start_packet(&mut buf, 0, 0),
            Err(CodecError::BufferTooSmall {
                needed: 13,
                available: 12
            })
        ));
    }

    #[test]
    fn header_parse() {
        let buf = started(513, 48_000);
        let header = RtpHeader::parse(&buf).unwrap();
        assert_eq!(header, RtpHeader::a2dp(513, 48_000));
        assert!(RtpHeader::parse(&buf[..11]).is_err());
        assert!(RtpHeader::parse(&[0u8; 12]).is_err());
    }

    #[test]
    fn frame_count_masked_to_four_bits() {
        let mut buf = started(0, 0);
        set_frame_count(&mut buf, 15);
        assert_eq!(frame_count(&buf), Some(15));
        set_frame_count(&mut buf, 0x13);
        assert_eq!(frame_count(&buf), Some(3));
        assert_eq!(MediaPayloadHeader::from_byte(0xF7).frame_count, 7);
    }
}
