use std::collections::BTreeSet;
use std::path::Path;

use memlog_core::{MemlogError, Seq};

use crate::types::IndexRow;

/// The derived retrieval index, backed by sled. Named trees:
///
///   rows     — seq (8-byte BE) → bincode(IndexRow)
///   postings — token utf8 bytes → bincode(BTreeSet<Seq>)
///   meta     — utf8 key → raw bytes (last rebuilt seq, rebuild timestamp)
pub struct IndexDb {
    _db: sled::Db,
    rows: sled::Tree,
    postings: sled::Tree,
    meta: sled::Tree,
}

fn seq_key(seq: Seq) -> [u8; 8] {
    seq.to_be_bytes()
}

impl IndexDb {
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, MemlogError> {
        let path = data_dir.as_ref().join("memory.db");
        let db = sled::open(path).map_err(|e| MemlogError::Storage(e.to_string()))?;
        let rows = db
            .open_tree("rows")
            .map_err(|e| MemlogError::Storage(e.to_string()))?;
        let postings = db
            .open_tree("postings")
            .map_err(|e| MemlogError::Storage(e.to_string()))?;
        let meta = db
            .open_tree("meta")
            .map_err(|e| MemlogError::Storage(e.to_string()))?;
        Ok(Self { _db: db, rows, postings, meta })
    }

    /// Drop every row and posting, leaving an empty index. Used by
    /// `rebuild` to guarantee bit-for-bit idempotence (P4): a fresh
    /// rebuild can never inherit a stale token from a previous run.
    pub fn clear(&self) -> Result<(), MemlogError> {
        self.rows.clear().map_err(|e| MemlogError::Storage(e.to_string()))?;
        self.postings.clear().map_err(|e| MemlogError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn put_row(&self, row: &IndexRow) -> Result<(), MemlogError> {
        let bytes = bincode::serialize(row).map_err(|e| MemlogError::Serialization(e.to_string()))?;
        self.rows
            .insert(seq_key(row.seq), bytes)
            .map_err(|e| MemlogError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get_row(&self, seq: Seq) -> Result<Option<IndexRow>, MemlogError> {
        match self.rows.get(seq_key(seq)).map_err(|e| MemlogError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(|e| MemlogError::Serialization(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    pub fn delete_row(&self, seq: Seq) -> Result<(), MemlogError> {
        self.rows
            .remove(seq_key(seq))
            .map_err(|e| MemlogError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn all_rows(&self) -> Result<Vec<IndexRow>, MemlogError> {
        let mut out = Vec::new();
        for item in self.rows.iter() {
            let (_, bytes) = item.map_err(|e| MemlogError::Storage(e.to_string()))?;
            out.push(bincode::deserialize(&bytes).map_err(|e| MemlogError::Serialization(e.to_string()))?);
        }
        out.sort_by_key(|r: &IndexRow| r.seq);
        Ok(out)
    }

    pub fn row_count(&self) -> u64 {
        self.rows.len() as u64
    }

    /// Merge `seq` into the posting list for `token`.
    pub fn add_posting(&self, token: &str, seq: Seq) -> Result<(), MemlogError> {
        let mut set = self.get_posting(token)?;
        set.insert(seq);
        let bytes = bincode::serialize(&set).map_err(|e| MemlogError::Serialization(e.to_string()))?;
        self.postings
            .insert(token.as_bytes(), bytes)
            .map_err(|e| MemlogError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get_posting(&self, token: &str) -> Result<BTreeSet<Seq>, MemlogError> {
        match self
            .postings
            .get(token.as_bytes())
            .map_err(|e| MemlogError::Storage(e.to_string()))?
        {
            Some(bytes) => {
                bincode::deserialize(&bytes).map_err(|e| MemlogError::Serialization(e.to_string()))
            }
            None => Ok(BTreeSet::new()),
        }
    }

    pub fn set_meta(&self, key: &str, value: &[u8]) -> Result<(), MemlogError> {
        self.meta
            .insert(key.as_bytes(), value)
            .map_err(|e| MemlogError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, MemlogError> {
        self.meta
            .get(key.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(|e| MemlogError::Storage(e.to_string()))
    }

    pub fn flush(&self) -> Result<(), MemlogError> {
        self._db.flush().map_err(|e| MemlogError::Storage(e.to_string()))?;
        Ok(())
    }
}
