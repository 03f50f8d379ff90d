use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;

use crate::config::BIN_COUNT;
use crate::types::Bins;

const FLOOR_KEY: &str = "ambient_noise_floor";
const FLOOR_LEN_KEY: &str = "ambient_noise_floor_length";

/// Flat string key/value storage for the calibration result.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One file per key under the per-user data directory.
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn open() -> Result<FsStore> {
        let dirs = ProjectDirs::from("com", "polara", "polara")
            .context("could not determine data directory")?;
        let dir = dirs.data_dir().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(FsStore { dir })
    }
}

impl KvStore for FsStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.dir.join(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.dir.join(key);
        fs::write(&path, value).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Populate `floor` from storage. An absent, unparsable, or short entry leaves
/// the floor at its current (all-zero) default; this never fails the caller.
pub fn load_noise_floor(store: &impl KvStore, floor: &mut Bins) {
    let Some(raw) = store.get(FLOOR_KEY) else { return };
    let Some(raw_len) = store.get(FLOOR_LEN_KEY) else { return };

    let Ok(values) = serde_json::from_str::<Vec<f32>>(&raw) else { return };
    let Ok(len) = serde_json::from_str::<usize>(&raw_len) else { return };

    if len < BIN_COUNT || values.len() < BIN_COUNT {
        return;
    }
    floor.copy_from_slice(&values[..BIN_COUNT]);
}

/// Persist the floor and its length, overwriting any prior entry.
pub fn save_noise_floor(store: &mut impl KvStore, floor: &Bins) -> Result<()> {
    let values = serde_json::to_string(&floor[..])?;
    store.set(FLOOR_KEY, &values)?;
    store.set(FLOOR_LEN_KEY, &serde_json::to_string(&BIN_COUNT)?)?;
    Ok(())
}
