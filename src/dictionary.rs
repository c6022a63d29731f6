// Dictionary and bloom-filter loading
// On-disk term sets and the VBLM bloom-filter file format; loaded once at
// startup and immutable afterwards

use crate::errors::DictionaryError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

/// File magic for bloom-filter files
pub const BLOOM_MAGIC: &[u8; 4] = b"VBLM";
pub const BLOOM_VERSION: u8 = 0x01;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloomMetadata {
    pub version: u32,
    /// Filter width in bits
    pub size: u64,
    pub nb_hashes: u32,
    pub item_count: u64,
    pub fp_rate: f64,
    pub created_at: String,
}

/// Bit-array payload as stored in the file
#[derive(Serialize, Deserialize)]
struct BloomPayload {
    bits: String,
}

/// Immutable membership filter backing the dictionary detectors
#[derive(Debug)]
pub struct BloomFilter {
    pub metadata: BloomMetadata,
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Empty filter for building; production filters come from `load`
    pub fn with_capacity(size_bits: u64, nb_hashes: u32) -> Self {
        BloomFilter {
            bits: vec![0u8; (size_bits as usize).div_ceil(8)],
            metadata: BloomMetadata {
                version: 1,
                size: size_bits,
                nb_hashes,
                item_count: 0,
                fp_rate: 0.01,
                created_at: String::new(),
            },
        }
    }

    /// Parse the VBLM container: magic, version byte, metadata JSON, payload
    /// JSON, each JSON block prefixed by a little-endian u32 length.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, DictionaryError> {
        let mut cursor = 0usize;

        let magic = take(raw, &mut cursor, 4)?;
        if magic != BLOOM_MAGIC {
            return Err(DictionaryError::InvalidBloomFilter(
                "bad magic, expected VBLM".to_string(),
            ));
        }
        let version = take(raw, &mut cursor, 1)?[0];
        if version != BLOOM_VERSION {
            return Err(DictionaryError::InvalidBloomFilter(format!(
                "unsupported version {:#04x}",
                version
            )));
        }

        let meta_len = read_u32_le(raw, &mut cursor)? as usize;
        let meta_raw = take(raw, &mut cursor, meta_len)?;
        let metadata: BloomMetadata = serde_json::from_slice(meta_raw)?;

        let payload_len = read_u32_le(raw, &mut cursor)? as usize;
        let payload_raw = take(raw, &mut cursor, payload_len)?;
        let payload: BloomPayload = serde_json::from_slice(payload_raw)?;
        let bits = STANDARD.decode(payload.bits.as_bytes()).map_err(|e| {
            DictionaryError::InvalidBloomFilter(format!("payload decode: {}", e))
        })?;

        if (bits.len() as u64) * 8 < metadata.size {
            return Err(DictionaryError::InvalidBloomFilter(
                "payload shorter than declared size".to_string(),
            ));
        }

        Ok(BloomFilter { metadata, bits })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let raw = std::fs::read(path)?;
        Self::from_bytes(&raw)
    }

    /// Serialize to the VBLM container format
    pub fn to_bytes(&self) -> Vec<u8> {
        let meta = serde_json::to_vec(&self.metadata).expect("metadata serializes");
        let payload = serde_json::to_vec(&BloomPayload {
            bits: STANDARD.encode(&self.bits),
        })
        .expect("payload serializes");

        let mut out = Vec::with_capacity(9 + meta.len() + 4 + payload.len());
        out.extend_from_slice(BLOOM_MAGIC);
        out.push(BLOOM_VERSION);
        out.extend_from_slice(&(meta.len() as u32).to_le_bytes());
        out.extend_from_slice(&meta);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    pub fn insert(&mut self, term: &str) {
        for position in self.bit_positions(term) {
            self.bits[(position / 8) as usize] |= 1 << (position % 8);
        }
        self.metadata.item_count += 1;
    }

    pub fn contains(&self, term: &str) -> bool {
        self.bit_positions(term)
            .iter()
            .all(|position| self.bits[(*position / 8) as usize] & (1 << (position % 8)) != 0)
    }

    /// Double hashing over a single SHA-256 digest of the lowercased term
    fn bit_positions(&self, term: &str) -> Vec<u64> {
        let digest = Sha256::digest(term.to_lowercase().as_bytes());
        let h1 = u64::from_le_bytes(digest[0..8].try_into().expect("digest is 32 bytes"));
        let h2 = u64::from_le_bytes(digest[8..16].try_into().expect("digest is 32 bytes"));
        (0..self.metadata.nb_hashes as u64)
            .map(|i| h1.wrapping_add(i.wrapping_mul(h2)) % self.metadata.size)
            .collect()
    }
}

fn take<'a>(raw: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], DictionaryError> {
    let end = cursor.checked_add(len).ok_or_else(truncated)?;
    if end > raw.len() {
        return Err(truncated());
    }
    let slice = &raw[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn read_u32_le(raw: &[u8], cursor: &mut usize) -> Result<u32, DictionaryError> {
    let bytes = take(raw, cursor, 4)?;
    Ok(u32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
}

fn truncated() -> DictionaryError {
    DictionaryError::InvalidBloomFilter("truncated file".to_string())
}

/// Load a newline-delimited term set: one lowercased term per line, blank
/// lines and `#` comments skipped.
pub fn load_term_set(path: impl AsRef<Path>) -> Result<HashSet<String>, DictionaryError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_lowercase())
        .collect())
}
