//! Index file encoding.
//!
//! Each relation persists to its own file so a store with several
//! relations can load them independently. The format is:
//!
//! ```text
//! magic "RIDX" (4)
//! version (1)
//! sequence (8)          committed sequence the snapshot reflects
//! name_len (2) + name
//! key_count (8)
//! keys: key_len (2) + key + id_count (4) + ids (16 each, in order)
//! crc32 (4)             over everything before it
//! ```
//!
//! A file that fails any check (magic, version, CRC, framing, stale
//! sequence) is discarded and the index rebuilt from the record log;
//! decode errors here never fail a store open.

use crate::error::{CoreError, CoreResult};
use crate::record::RecordId;
use crate::types::SequenceNumber;
use crate::wal::compute_crc32;
use std::collections::HashMap;

/// Magic bytes for index files.
const INDEX_MAGIC: [u8; 4] = *b"RIDX";

/// Current index file format version.
const INDEX_VERSION: u8 = 1;

/// A decoded index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    /// Relation name the file belongs to.
    pub name: String,
    /// Committed sequence the snapshot reflects.
    pub sequence: SequenceNumber,
    /// Key buckets, each holding ordered member ids.
    pub buckets: HashMap<String, Vec<RecordId>>,
}

/// Encodes a relation's index snapshot to bytes.
pub fn encode_index_file(
    name: &str,
    sequence: SequenceNumber,
    buckets: &HashMap<String, Vec<RecordId>>,
) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::new();

    buf.extend_from_slice(&INDEX_MAGIC);
    buf.push(INDEX_VERSION);
    buf.extend_from_slice(&sequence.as_u64().to_le_bytes());

    let name_bytes = name.as_bytes();
    let name_len = u16::try_from(name_bytes.len())
        .map_err(|_| CoreError::invalid_format("relation name too long"))?;
    buf.extend_from_slice(&name_len.to_le_bytes());
    buf.extend_from_slice(name_bytes);

    buf.extend_from_slice(&(buckets.len() as u64).to_le_bytes());

    // Sort keys so the encoding is deterministic.
    let mut keys: Vec<&String> = buckets.keys().collect();
    keys.sort();

    for key in keys {
        let ids = &buckets[key];
        let key_bytes = key.as_bytes();
        let key_len = u16::try_from(key_bytes.len())
            .map_err(|_| CoreError::invalid_format("relation key too long"))?;
        buf.extend_from_slice(&key_len.to_le_bytes());
        buf.extend_from_slice(key_bytes);
        buf.extend_from_slice(&(ids.len() as u32).to_le_bytes());
        for id in ids {
            buf.extend_from_slice(id.as_bytes());
        }
    }

    let crc = compute_crc32(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());

    Ok(buf)
}

/// Decodes an index file.
///
/// # Errors
///
/// Returns [`CoreError::InvalidFormat`] or [`CoreError::ChecksumMismatch`]
/// for any malformed input. Callers treat every error as "rebuild".
pub fn decode_index_file(data: &[u8]) -> CoreResult<IndexFile> {
    // magic + version + sequence + name_len + key_count + crc
    if data.len() < 4 + 1 + 8 + 2 + 8 + 4 {
        return Err(CoreError::invalid_format("index file too small"));
    }

    let crc_start = data.len() - 4;
    let stored_crc = u32::from_le_bytes([
        data[crc_start],
        data[crc_start + 1],
        data[crc_start + 2],
        data[crc_start + 3],
    ]);
    let computed_crc = compute_crc32(&data[..crc_start]);
    if stored_crc != computed_crc {
        return Err(CoreError::ChecksumMismatch {
            expected: stored_crc,
            actual: computed_crc,
        });
    }

    let data = &data[..crc_start];
    let mut pos = 0;

    if data[0..4] != INDEX_MAGIC {
        return Err(CoreError::invalid_format("invalid index file magic"));
    }
    pos += 4;

    let version = data[pos];
    pos += 1;
    if version != INDEX_VERSION {
        return Err(CoreError::invalid_format(format!(
            "unsupported index version: {version}"
        )));
    }

    let take = |pos: &mut usize, n: usize| -> CoreResult<&[u8]> {
        if data.len() < *pos + n {
            return Err(CoreError::invalid_format("truncated index file"));
        }
        let slice = &data[*pos..*pos + n];
        *pos += n;
        Ok(slice)
    };

    let sequence_bytes: [u8; 8] = take(&mut pos, 8)?
        .try_into()
        .map_err(|_| CoreError::invalid_format("invalid sequence"))?;
    let sequence = SequenceNumber::new(u64::from_le_bytes(sequence_bytes));

    let name_len_bytes: [u8; 2] = take(&mut pos, 2)?
        .try_into()
        .map_err(|_| CoreError::invalid_format("invalid name length"))?;
    let name_len = u16::from_le_bytes(name_len_bytes) as usize;
    let name = String::from_utf8(take(&mut pos, name_len)?.to_vec())
        .map_err(|_| CoreError::invalid_format("invalid UTF-8 in relation name"))?;

    let key_count_bytes: [u8; 8] = take(&mut pos, 8)?
        .try_into()
        .map_err(|_| CoreError::invalid_format("invalid key count"))?;
    let key_count = u64::from_le_bytes(key_count_bytes);

    let mut buckets = HashMap::new();
    for _ in 0..key_count {
        let key_len_bytes: [u8; 2] = take(&mut pos, 2)?
            .try_into()
            .map_err(|_| CoreError::invalid_format("invalid key length"))?;
        let key_len = u16::from_le_bytes(key_len_bytes) as usize;
        let key = String::from_utf8(take(&mut pos, key_len)?.to_vec())
            .map_err(|_| CoreError::invalid_format("invalid UTF-8 in relation key"))?;

        let id_count_bytes: [u8; 4] = take(&mut pos, 4)?
            .try_into()
            .map_err(|_| CoreError::invalid_format("invalid id count"))?;
        let id_count = u32::from_le_bytes(id_count_bytes) as usize;

        let mut ids = Vec::with_capacity(id_count);
        for _ in 0..id_count {
            let id = RecordId::from_slice(take(&mut pos, 16)?)
                .ok_or_else(|| CoreError::invalid_format("invalid record id"))?;
            ids.push(id);
        }

        buckets.insert(key, ids);
    }

    if pos != data.len() {
        return Err(CoreError::invalid_format("trailing bytes in index file"));
    }

    Ok(IndexFile {
        name,
        sequence,
        buckets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buckets() -> HashMap<String, Vec<RecordId>> {
        let mut buckets = HashMap::new();
        buckets.insert(
            "u1".to_string(),
            vec![RecordId::from_bytes([1; 16]), RecordId::from_bytes([2; 16])],
        );
        buckets.insert("u2".to_string(), vec![RecordId::from_bytes([3; 16])]);
        buckets
    }

    #[test]
    fn roundtrip() {
        let buckets = sample_buckets();
        let bytes = encode_index_file("users", SequenceNumber::new(42), &buckets).unwrap();
        let decoded = decode_index_file(&bytes).unwrap();

        assert_eq!(decoded.name, "users");
        assert_eq!(decoded.sequence, SequenceNumber::new(42));
        assert_eq!(decoded.buckets, buckets);
    }

    #[test]
    fn preserves_id_order() {
        let buckets = sample_buckets();
        let bytes = encode_index_file("users", SequenceNumber::new(1), &buckets).unwrap();
        let decoded = decode_index_file(&bytes).unwrap();

        assert_eq!(
            decoded.buckets["u1"],
            vec![RecordId::from_bytes([1; 16]), RecordId::from_bytes([2; 16])]
        );
    }

    #[test]
    fn empty_roundtrip() {
        let buckets = HashMap::new();
        let bytes = encode_index_file("tags", SequenceNumber::new(0), &buckets).unwrap();
        let decoded = decode_index_file(&bytes).unwrap();
        assert!(decoded.buckets.is_empty());
    }

    #[test]
    fn corrupt_byte_fails_crc() {
        let bytes = encode_index_file("users", SequenceNumber::new(1), &sample_buckets()).unwrap();
        let mut corrupted = bytes.clone();
        corrupted[10] ^= 0xFF;

        assert!(matches!(
            decode_index_file(&corrupted),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = encode_index_file("users", SequenceNumber::new(1), &HashMap::new()).unwrap();
        bytes[0] = 0;
        // Fix the CRC so the magic check is what fails.
        let crc_start = bytes.len() - 4;
        let crc = compute_crc32(&bytes[..crc_start]);
        bytes[crc_start..].copy_from_slice(&crc.to_le_bytes());

        assert!(matches!(
            decode_index_file(&bytes),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn truncated_rejected() {
        let bytes = encode_index_file("users", SequenceNumber::new(1), &sample_buckets()).unwrap();
        assert!(decode_index_file(&bytes[..10]).is_err());
    }
}
