//! Per-pair stick persistence.
//!
//! One record per pair, keyed by the symbol with its separator removed
//! (`ETH/USDT` -> `ETHUSDT`). A missing record reads as the empty stick.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use pairbalance::{PairSymbol, StickState};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// Durable storage of one [`StickState`] per pair.
pub trait StickStore {
    /// The stored stick, or the empty stick if none was ever written.
    fn read(&self, symbol: &PairSymbol) -> Result<StickState>;

    /// Persist `stick`. Returns only once the write is durable.
    fn write(&mut self, symbol: &PairSymbol, stick: &StickState) -> Result<()>;
}

/// JSON files under a directory: `<dir>/<BASEQUOTE>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open the store, creating `dir` if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| Error::StoreWrite {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, symbol: &PairSymbol) -> PathBuf {
        self.dir.join(format!("{}.json", symbol.joined()))
    }
}

impl StickStore for JsonFileStore {
    fn read(&self, symbol: &PairSymbol) -> Result<StickState> {
        let path = self.path_for(symbol);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StickState::empty()),
            Err(e) => return Err(Error::StoreRead { path, source: e }),
        };
        serde_json::from_str(&contents).map_err(|e| Error::StoreParse { path, source: e })
    }

    fn write(&mut self, symbol: &PairSymbol, stick: &StickState) -> Result<()> {
        let path = self.path_for(symbol);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(stick).map_err(|e| Error::StoreParse {
            path: path.clone(),
            source: e,
        })?;

        let write_err = |source| Error::StoreWrite {
            path: path.clone(),
            source,
        };
        let mut file = File::create(&tmp).map_err(write_err)?;
        file.write_all(&json).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&tmp, &path).map_err(write_err)?;
        Ok(())
    }
}

/// In-memory store for tests. Counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sticks: FxHashMap<String, StickState>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stick without counting it as a write.
    pub fn with_stick(mut self, symbol: &PairSymbol, stick: StickState) -> Self {
        self.sticks.insert(symbol.joined(), stick);
        self
    }

    /// Number of `write` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn get(&self, symbol: &PairSymbol) -> StickState {
        self.sticks.get(&symbol.joined()).cloned().unwrap_or_default()
    }
}

impl StickStore for MemoryStore {
    fn read(&self, symbol: &PairSymbol) -> Result<StickState> {
        Ok(self.get(symbol))
    }

    fn write(&mut self, symbol: &PairSymbol, stick: &StickState) -> Result<()> {
        self.writes += 1;
        self.sticks.insert(symbol.joined(), stick.clone());
        Ok(())
    }
}
