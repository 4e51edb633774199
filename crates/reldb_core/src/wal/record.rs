//! WAL record types and serialization.

use crate::error::{CoreError, CoreResult};
use crate::record::RecordId;
use crate::types::{SequenceNumber, TransactionId};

/// Magic bytes identifying a WAL record.
pub const WAL_MAGIC: [u8; 4] = *b"RWAL";

/// Current WAL format version.
pub const WAL_VERSION: u16 = 1;

/// Type of WAL record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WalRecordType {
    /// Begin a new transaction.
    Begin = 1,
    /// Put (insert or update) a record.
    Put = 2,
    /// Delete a record.
    Delete = 3,
    /// Commit a transaction.
    Commit = 4,
    /// Checkpoint marker.
    Checkpoint = 5,
}

impl WalRecordType {
    /// Converts a byte to a record type.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Begin),
            2 => Some(Self::Put),
            3 => Some(Self::Delete),
            4 => Some(Self::Commit),
            5 => Some(Self::Checkpoint),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A WAL record representing a store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// Begin a new transaction.
    Begin {
        /// Transaction ID.
        txid: TransactionId,
    },

    /// Put (insert or update) a record.
    Put {
        /// Transaction ID.
        txid: TransactionId,
        /// Record identifier.
        record_id: RecordId,
        /// New record payload (CBOR bytes).
        payload: Vec<u8>,
    },

    /// Delete a record.
    Delete {
        /// Transaction ID.
        txid: TransactionId,
        /// Record identifier.
        record_id: RecordId,
    },

    /// Commit a transaction.
    Commit {
        /// Transaction ID.
        txid: TransactionId,
        /// Sequence number assigned to this commit.
        sequence: SequenceNumber,
    },

    /// Checkpoint marker for WAL truncation.
    Checkpoint {
        /// Sequence number at checkpoint.
        sequence: SequenceNumber,
    },
}

impl WalRecord {
    /// Maximum size for a record payload in the WAL.
    ///
    /// The envelope carries a 4-byte length field, so larger payloads
    /// cannot be framed.
    pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> WalRecordType {
        match self {
            Self::Begin { .. } => WalRecordType::Begin,
            Self::Put { .. } => WalRecordType::Put,
            Self::Delete { .. } => WalRecordType::Delete,
            Self::Commit { .. } => WalRecordType::Commit,
            Self::Checkpoint { .. } => WalRecordType::Checkpoint,
        }
    }

    /// Returns the transaction ID if this record is associated with one.
    #[must_use]
    pub fn txid(&self) -> Option<TransactionId> {
        match self {
            Self::Begin { txid }
            | Self::Put { txid, .. }
            | Self::Delete { txid, .. }
            | Self::Commit { txid, .. } => Some(*txid),
            Self::Checkpoint { .. } => None,
        }
    }

    /// Serializes the record payload (without envelope).
    ///
    /// # Errors
    ///
    /// Returns an error if a `Put` payload exceeds [`Self::MAX_PAYLOAD_SIZE`].
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();

        match self {
            Self::Begin { txid } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
            }

            Self::Put {
                txid,
                record_id,
                payload,
            } => {
                if payload.len() > Self::MAX_PAYLOAD_SIZE {
                    return Err(CoreError::invalid_operation(format!(
                        "record payload too large: {} bytes exceeds maximum of {} bytes",
                        payload.len(),
                        Self::MAX_PAYLOAD_SIZE
                    )));
                }

                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                buf.extend_from_slice(record_id.as_bytes());
                let len = payload.len() as u32;
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(payload);
            }

            Self::Delete { txid, record_id } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                buf.extend_from_slice(record_id.as_bytes());
            }

            Self::Commit { txid, sequence } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
            }

            Self::Checkpoint { sequence } => {
                buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
            }
        }

        Ok(buf)
    }

    /// Deserializes a record from its type and payload.
    pub fn decode_payload(record_type: WalRecordType, payload: &[u8]) -> CoreResult<Self> {
        let mut cursor = 0;

        let read_u64 = |cursor: &mut usize| -> CoreResult<u64> {
            if *cursor + 8 > payload.len() {
                return Err(CoreError::wal_corruption("unexpected end of payload"));
            }
            let bytes: [u8; 8] = payload[*cursor..*cursor + 8]
                .try_into()
                .map_err(|_| CoreError::wal_corruption("invalid u64"))?;
            *cursor += 8;
            Ok(u64::from_le_bytes(bytes))
        };

        let read_record_id = |cursor: &mut usize| -> CoreResult<RecordId> {
            if *cursor + 16 > payload.len() {
                return Err(CoreError::wal_corruption("unexpected end of payload"));
            }
            let id = RecordId::from_slice(&payload[*cursor..*cursor + 16])
                .ok_or_else(|| CoreError::wal_corruption("invalid record id"))?;
            *cursor += 16;
            Ok(id)
        };

        let check_consumed = |cursor: usize, what: &str| -> CoreResult<()> {
            if cursor != payload.len() {
                return Err(CoreError::wal_corruption(format!(
                    "trailing bytes in {what} record: expected {cursor} bytes, got {}",
                    payload.len()
                )));
            }
            Ok(())
        };

        match record_type {
            WalRecordType::Begin => {
                let txid = TransactionId::new(read_u64(&mut cursor)?);
                check_consumed(cursor, "Begin")?;
                Ok(Self::Begin { txid })
            }

            WalRecordType::Put => {
                let txid = TransactionId::new(read_u64(&mut cursor)?);
                let record_id = read_record_id(&mut cursor)?;
                let len = {
                    if cursor + 4 > payload.len() {
                        return Err(CoreError::wal_corruption("unexpected end of payload"));
                    }
                    let bytes: [u8; 4] = payload[cursor..cursor + 4]
                        .try_into()
                        .map_err(|_| CoreError::wal_corruption("invalid u32"))?;
                    cursor += 4;
                    u32::from_le_bytes(bytes) as usize
                };
                if cursor + len > payload.len() {
                    return Err(CoreError::wal_corruption("unexpected end of put payload"));
                }
                let bytes = payload[cursor..cursor + len].to_vec();
                cursor += len;
                check_consumed(cursor, "Put")?;
                Ok(Self::Put {
                    txid,
                    record_id,
                    payload: bytes,
                })
            }

            WalRecordType::Delete => {
                let txid = TransactionId::new(read_u64(&mut cursor)?);
                let record_id = read_record_id(&mut cursor)?;
                check_consumed(cursor, "Delete")?;
                Ok(Self::Delete { txid, record_id })
            }

            WalRecordType::Commit => {
                let txid = TransactionId::new(read_u64(&mut cursor)?);
                let sequence = SequenceNumber::new(read_u64(&mut cursor)?);
                check_consumed(cursor, "Commit")?;
                Ok(Self::Commit { txid, sequence })
            }

            WalRecordType::Checkpoint => {
                let sequence = SequenceNumber::new(read_u64(&mut cursor)?);
                check_consumed(cursor, "Checkpoint")?;
                Ok(Self::Checkpoint { sequence })
            }
        }
    }
}

/// Computes a CRC32 checksum (IEEE polynomial).
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
