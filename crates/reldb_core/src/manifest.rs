//! Store manifest.

use crate::error::{CoreError, CoreResult};
use crate::types::SequenceNumber;

/// Magic bytes for the manifest file.
pub const MANIFEST_MAGIC: [u8; 4] = *b"RMFN";

/// Current manifest encoding version.
pub const MANIFEST_VERSION: u16 = 1;

/// Store metadata persisted in the MANIFEST file.
///
/// Records the format version, the registered relation names and the
/// last checkpoint sequence. Relation names are fixed once the store is
/// created; reopening with a different set is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Format version (major, minor).
    pub format_version: (u16, u16),
    /// Registered relation names, sorted.
    pub relations: Vec<String>,
    /// Last checkpoint sequence number.
    pub last_checkpoint: Option<SequenceNumber>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new((1, 0), Vec::new())
    }
}

impl Manifest {
    /// Creates a manifest for a new store.
    #[must_use]
    pub fn new(format_version: (u16, u16), mut relations: Vec<String>) -> Self {
        relations.sort();
        relations.dedup();
        Self {
            format_version,
            relations,
            last_checkpoint: None,
        }
    }

    /// Encodes the manifest to bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&MANIFEST_MAGIC);
        buf.extend_from_slice(&MANIFEST_VERSION.to_le_bytes());
        buf.extend_from_slice(&self.format_version.0.to_le_bytes());
        buf.extend_from_slice(&self.format_version.1.to_le_bytes());

        let count = u32::try_from(self.relations.len()).unwrap_or(u32::MAX);
        buf.extend_from_slice(&count.to_le_bytes());

        for name in &self.relations {
            let name_bytes = name.as_bytes();
            let name_len = u16::try_from(name_bytes.len()).unwrap_or(u16::MAX);
            buf.extend_from_slice(&name_len.to_le_bytes());
            buf.extend_from_slice(name_bytes);
        }

        if let Some(seq) = self.last_checkpoint {
            buf.push(1);
            buf.extend_from_slice(&seq.as_u64().to_le_bytes());
        } else {
            buf.push(0);
        }

        buf
    }

    /// Decodes a manifest from bytes.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        let mut cursor = 0;

        if data.len() < 4 || data[0..4] != MANIFEST_MAGIC {
            return Err(CoreError::invalid_format("invalid manifest magic"));
        }
        cursor += 4;

        let take = |cursor: &mut usize, n: usize| -> CoreResult<&[u8]> {
            if data.len() < *cursor + n {
                return Err(CoreError::invalid_format("manifest too short"));
            }
            let slice = &data[*cursor..*cursor + n];
            *cursor += n;
            Ok(slice)
        };

        let version_bytes = take(&mut cursor, 2)?;
        let version = u16::from_le_bytes([version_bytes[0], version_bytes[1]]);
        if version > MANIFEST_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported manifest version: {version}"
            )));
        }

        let major_bytes = take(&mut cursor, 2)?;
        let format_major = u16::from_le_bytes([major_bytes[0], major_bytes[1]]);
        let minor_bytes = take(&mut cursor, 2)?;
        let format_minor = u16::from_le_bytes([minor_bytes[0], minor_bytes[1]]);

        let count_bytes = take(&mut cursor, 4)?;
        let relation_count = u32::from_le_bytes([
            count_bytes[0],
            count_bytes[1],
            count_bytes[2],
            count_bytes[3],
        ]) as usize;

        let mut relations = Vec::with_capacity(relation_count);
        for _ in 0..relation_count {
            let len_bytes = take(&mut cursor, 2)?;
            let name_len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
            let name = String::from_utf8(take(&mut cursor, name_len)?.to_vec())
                .map_err(|_| CoreError::invalid_format("invalid UTF-8 in relation name"))?;
            relations.push(name);
        }

        let flag = take(&mut cursor, 1)?[0];
        let last_checkpoint = if flag != 0 {
            let seq_bytes: [u8; 8] = take(&mut cursor, 8)?
                .try_into()
                .map_err(|_| CoreError::invalid_format("invalid checkpoint sequence"))?;
            Some(SequenceNumber::new(u64::from_le_bytes(seq_bytes)))
        } else {
            None
        };

        Ok(Self {
            format_version: (format_major, format_minor),
            relations,
            last_checkpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut manifest = Manifest::new((1, 0), vec!["users".into(), "tags".into()]);
        manifest.last_checkpoint = Some(SequenceNumber::new(99));

        let decoded = Manifest::decode(&manifest.encode()).unwrap();
        assert_eq!(decoded, manifest);
    }

    #[test]
    fn relations_sorted_and_deduped() {
        let manifest = Manifest::new((1, 0), vec!["b".into(), "a".into(), "b".into()]);
        assert_eq!(manifest.relations, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_roundtrip() {
        let manifest = Manifest::default();
        let decoded = Manifest::decode(&manifest.encode()).unwrap();
        assert_eq!(decoded, manifest);
        assert!(decoded.last_checkpoint.is_none());
    }

    #[test]
    fn bad_magic_rejected() {
        let mut data = Manifest::default().encode();
        data[0] = 0;
        assert!(Manifest::decode(&data).is_err());
    }

    #[test]
    fn truncated_rejected() {
        let data = Manifest::default().encode();
        assert!(Manifest::decode(&data[..6]).is_err());
    }
}
