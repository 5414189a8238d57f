//! Merging freshly fetched transactions into the persisted set.

use crate::model::SwapTx;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::{fs, io};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),
}

/// The persisted transaction cache for one swap service.
///
/// Fields other than `txs` belong to the fetcher and are carried through
/// untouched. After [`merge`](Self::merge), `txs` is sorted descending by
/// timestamp and holds no two entries sharing `(inputTXID, status)`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DiskCache {
    #[serde(flatten)]
    pub meta: Map<String, Value>,

    #[serde(default)]
    pub txs: Vec<SwapTx>,
}

impl DiskCache {
    /// Read a cache file. A missing file is an empty cache; a corrupt one is
    /// an error, since overwriting it would lose history.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReconcileError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No disk cache at {path:?}, starting empty");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Merge a freshly fetched batch, suppressing records that duplicate an
    /// already-present `(inputTXID, status)` pair. Returns the number of
    /// transactions accepted.
    pub fn merge(&mut self, new_txs: Vec<SwapTx>) -> usize {
        let mut accepted = 0;
        for new_tx in new_txs {
            if self.txs.iter().any(|old_tx| old_tx.same_event(&new_tx)) {
                continue;
            }
            self.txs.push(new_tx);
            accepted += 1;
        }

        // Stable sort, newest first.
        self.txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        accepted
    }

    /// Rewrite the whole cache object, pretty-printed with 2-space indent.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), ReconcileError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        fs::write(path, out)?;

        Ok(())
    }
}
