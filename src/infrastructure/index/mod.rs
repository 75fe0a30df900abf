//! Flat inner-product vector index with a binary on-disk checkpoint
//!
//! Vectors are L2-normalized when they enter the index, so the inner
//! product scores returned by `search` are cosine similarities in
//! `[-1, 1]`. The metric is part of the checkpoint format: a version
//! bump is required to ever change it, which keeps a stored similarity
//! threshold meaningful across reloads.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::domain::embedding::{inner_product, l2_normalize};
use crate::domain::{CacheError, EntryId};

const MAGIC: &[u8; 4] = b"SSCI";
const FORMAT_VERSION: u16 = 1;

/// Exact nearest-neighbor index over `(id, vector)` rows.
///
/// Rows are append-only during a session; `retain_ids` exists solely
/// for the startup reconcile pass that prunes vectors a crash left
/// without a mapping entry.
#[derive(Debug)]
pub struct FlatVectorIndex {
    dimension: usize,
    ids: Vec<EntryId>,
    vectors: Vec<Vec<f32>>,
}

impl FlatVectorIndex {
    /// Create an empty index with a fixed dimensionality.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[EntryId] {
        &self.ids
    }

    /// Append a vector under `id`, normalizing it on the way in.
    pub fn add(&mut self, id: EntryId, mut vector: Vec<f32>) -> Result<(), CacheError> {
        if vector.len() != self.dimension {
            return Err(CacheError::dimension_mismatch(self.dimension, vector.len()));
        }

        l2_normalize(&mut vector);
        self.ids.push(id);
        self.vectors.push(vector);

        Ok(())
    }

    /// Up to `k` nearest rows by similarity, best first.
    ///
    /// An empty index yields an empty result. Score ties resolve to the
    /// lower id so results are deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(EntryId, f32)>, CacheError> {
        if query.len() != self.dimension {
            return Err(CacheError::dimension_mismatch(self.dimension, query.len()));
        }

        let mut normalized = query.to_vec();
        l2_normalize(&mut normalized);

        let mut scored: Vec<(EntryId, f32)> = self
            .ids
            .iter()
            .zip(self.vectors.iter())
            .map(|(id, vector)| (*id, inner_product(&normalized, vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Drop every row whose id is not in `keep`. Returns the number of
    /// pruned rows.
    pub fn retain_ids(&mut self, keep: &HashSet<EntryId>) -> usize {
        let before = self.ids.len();

        let mut kept_ids = Vec::with_capacity(before);
        let mut kept_vectors = Vec::with_capacity(before);
        for (id, vector) in self.ids.drain(..).zip(self.vectors.drain(..)) {
            if keep.contains(&id) {
                kept_ids.push(id);
                kept_vectors.push(vector);
            }
        }

        self.ids = kept_ids;
        self.vectors = kept_vectors;

        before - self.ids.len()
    }

    /// Write a checkpoint of the full index to `path`.
    ///
    /// The file is written to a sibling temp path, fsynced, then
    /// renamed over the target, so a crash never leaves a truncated
    /// checkpoint under the final name.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let tmp_path = temp_sibling(path);

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);

            writer.write_all(MAGIC)?;
            writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
            writer.write_all(&(self.dimension as u32).to_le_bytes())?;
            writer.write_all(&(self.ids.len() as u64).to_le_bytes())?;

            for (id, vector) in self.ids.iter().zip(self.vectors.iter()) {
                writer.write_all(&id.to_le_bytes())?;
                for value in vector {
                    writer.write_all(&value.to_le_bytes())?;
                }
            }

            writer.flush()?;
            writer.into_inner().map_err(|e| CacheError::io(e.to_string()))?.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Restore an index from a checkpoint written by `save`.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(truncated)?;
        if &magic != MAGIC {
            return Err(CacheError::corrupt("index checkpoint: bad magic"));
        }

        let mut version = [0u8; 2];
        reader.read_exact(&mut version).map_err(truncated)?;
        let version = u16::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(CacheError::corrupt(format!(
                "index checkpoint: unsupported format version {}",
                version
            )));
        }

        let mut dimension = [0u8; 4];
        reader.read_exact(&mut dimension).map_err(truncated)?;
        let dimension = u32::from_le_bytes(dimension) as usize;
        if dimension == 0 {
            return Err(CacheError::corrupt("index checkpoint: zero dimension"));
        }

        let mut count = [0u8; 8];
        reader.read_exact(&mut count).map_err(truncated)?;
        let count = u64::from_le_bytes(count) as usize;

        let mut ids = Vec::with_capacity(count);
        let mut vectors = Vec::with_capacity(count);
        for _ in 0..count {
            let mut id = [0u8; 8];
            reader.read_exact(&mut id).map_err(truncated)?;
            ids.push(u64::from_le_bytes(id));

            let mut vector = Vec::with_capacity(dimension);
            let mut value = [0u8; 4];
            for _ in 0..dimension {
                reader.read_exact(&mut value).map_err(truncated)?;
                vector.push(f32::from_le_bytes(value));
            }
            vectors.push(vector);
        }

        let mut trailing = [0u8; 1];
        if reader.read(&mut trailing)? != 0 {
            return Err(CacheError::corrupt("index checkpoint: trailing bytes"));
        }

        Ok(Self {
            dimension,
            ids,
            vectors,
        })
    }
}

fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn truncated(err: std::io::Error) -> CacheError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        CacheError::corrupt("index checkpoint: truncated file")
    } else {
        CacheError::from(err)
    }
}
