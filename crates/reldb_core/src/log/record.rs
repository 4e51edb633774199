//! Record log entry framing.

use crate::error::{CoreError, CoreResult};
use crate::record::RecordId;
use crate::types::SequenceNumber;
use crate::wal::compute_crc32;

/// Flags for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogRecordFlags(u8);

impl LogRecordFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Entry is a tombstone (record deleted).
    pub const TOMBSTONE: Self = Self(0x01);

    /// Creates flags from a raw byte.
    #[must_use]
    pub const fn from_byte(b: u8) -> Self {
        Self(b)
    }

    /// Returns the raw byte value.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self.0
    }

    /// Checks if the tombstone flag is set.
    #[must_use]
    pub const fn is_tombstone(self) -> bool {
        self.0 & 0x01 != 0
    }
}

/// A framed entry in the record log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Record identifier.
    pub record_id: RecordId,
    /// Entry flags.
    pub flags: LogRecordFlags,
    /// Record payload (CBOR bytes, empty for a tombstone).
    pub payload: Vec<u8>,
    /// Sequence number when this entry was committed.
    pub sequence: SequenceNumber,
}

impl LogRecord {
    /// Header size: record_len (4) + record_id (16) + flags (1) + sequence (8) = 29.
    pub(crate) const HEADER_SIZE: usize = 29;
    /// Trailing CRC size.
    pub(crate) const CRC_SIZE: usize = 4;

    /// Creates a put entry.
    #[must_use]
    pub fn put(record_id: RecordId, payload: Vec<u8>, sequence: SequenceNumber) -> Self {
        Self {
            record_id,
            flags: LogRecordFlags::NONE,
            payload,
            sequence,
        }
    }

    /// Creates a tombstone entry.
    #[must_use]
    pub fn tombstone(record_id: RecordId, sequence: SequenceNumber) -> Self {
        Self {
            record_id,
            flags: LogRecordFlags::TOMBSTONE,
            payload: Vec::new(),
            sequence,
        }
    }

    /// Returns whether this entry is a tombstone.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.flags.is_tombstone()
    }

    /// Encodes the entry to its framed byte form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let record_len = Self::HEADER_SIZE + self.payload.len() + Self::CRC_SIZE;
        let mut buf = Vec::with_capacity(record_len);

        buf.extend_from_slice(&(record_len as u32).to_le_bytes());
        buf.extend_from_slice(self.record_id.as_bytes());
        buf.push(self.flags.as_byte());
        buf.extend_from_slice(&self.sequence.as_u64().to_le_bytes());
        buf.extend_from_slice(&self.payload);

        let crc = compute_crc32(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        buf
    }

    /// Decodes an entry from its framed byte form.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        if data.len() < Self::HEADER_SIZE + Self::CRC_SIZE {
            return Err(CoreError::log_corruption("entry too short"));
        }

        let record_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if data.len() < record_len || record_len < Self::HEADER_SIZE + Self::CRC_SIZE {
            return Err(CoreError::log_corruption("incomplete entry"));
        }

        let stored_crc = u32::from_le_bytes([
            data[record_len - 4],
            data[record_len - 3],
            data[record_len - 2],
            data[record_len - 1],
        ]);
        let computed_crc = compute_crc32(&data[..record_len - 4]);
        if stored_crc != computed_crc {
            return Err(CoreError::ChecksumMismatch {
                expected: stored_crc,
                actual: computed_crc,
            });
        }

        let record_id = RecordId::from_slice(&data[4..20])
            .ok_or_else(|| CoreError::log_corruption("invalid record id"))?;
        let flags = LogRecordFlags::from_byte(data[20]);
        let sequence = SequenceNumber::new(u64::from_le_bytes([
            data[21], data[22], data[23], data[24], data[25], data[26], data[27], data[28],
        ]));

        let payload_len = record_len - Self::HEADER_SIZE - Self::CRC_SIZE;
        let payload = data[Self::HEADER_SIZE..Self::HEADER_SIZE + payload_len].to_vec();

        Ok(Self {
            record_id,
            flags,
            payload,
            sequence,
        })
    }

    /// Returns the encoded size of this entry.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len() + Self::CRC_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        assert!(!LogRecordFlags::NONE.is_tombstone());
        assert!(LogRecordFlags::TOMBSTONE.is_tombstone());
    }

    #[test]
    fn put_roundtrip() {
        let record = LogRecord::put(
            RecordId::from_bytes([3; 16]),
            vec![0xCA, 0xFE, 0xBA, 0xBE],
            SequenceNumber::new(42),
        );

        let encoded = record.encode();
        assert_eq!(encoded.len(), record.encoded_size());
        assert_eq!(LogRecord::decode(&encoded).unwrap(), record);
    }

    #[test]
    fn tombstone_roundtrip() {
        let record = LogRecord::tombstone(RecordId::from_bytes([0xFF; 16]), SequenceNumber::new(7));
        assert!(record.is_tombstone());

        let decoded = LogRecord::decode(&record.encode()).unwrap();
        assert!(decoded.is_tombstone());
        assert_eq!(decoded, record);
    }

    #[test]
    fn detect_corruption() {
        let record = LogRecord::put(
            RecordId::from_bytes([1; 16]),
            vec![1, 2, 3],
            SequenceNumber::new(1),
        );

        let mut encoded = record.encode();
        encoded[10] ^= 0xFF;

        assert!(matches!(
            LogRecord::decode(&encoded),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn short_data_is_corruption() {
        assert!(matches!(
            LogRecord::decode(&[0u8; 8]),
            Err(CoreError::LogCorruption { .. })
        ));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn roundtrip_arbitrary_payload(
                id_bytes in prop::array::uniform16(any::<u8>()),
                payload in prop::collection::vec(any::<u8>(), 0..512),
                seq in any::<u64>(),
            ) {
                let record = LogRecord::put(
                    RecordId::from_bytes(id_bytes),
                    payload,
                    SequenceNumber::new(seq),
                );
                let decoded = LogRecord::decode(&record.encode()).unwrap();
                prop_assert_eq!(decoded, record);
            }
        }
    }
}
