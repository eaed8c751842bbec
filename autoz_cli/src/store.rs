//! File-backed `OffsetStore` over the persisted TOML state.

use std::fs;
use std::path::{Path, PathBuf};

use autoz_config::PersistedState;
use autoz_traits::{BoxError, OffsetStore};
use eyre::WrapErr;
use tracing::info;

pub struct FileOffsetStore {
    path: PathBuf,
    min_mm: f32,
    max_mm: f32,
}

impl FileOffsetStore {
    pub fn new(path: impl Into<PathBuf>, min_mm: f32, max_mm: f32) -> Self {
        Self {
            path: path.into(),
            min_mm,
            max_mm,
        }
    }

    fn write_offset(&self, z_offset_mm: f32) -> eyre::Result<()> {
        let mut state = PersistedState::load(&self.path)?;
        state.z_offset_mm = z_offset_mm;
        state.check_range(self.min_mm, self.max_mm)?;
        write_state(&self.path, &state)
    }
}

impl OffsetStore for FileOffsetStore {
    fn apply(&mut self, z_offset_mm: f32) {
        // the simulated printer has no babystep; the value only lives in the log
        info!(z_offset_mm, "z-offset applied");
    }

    fn persist(&mut self, z_offset_mm: f32) -> Result<(), BoxError> {
        self.write_offset(z_offset_mm).map_err(BoxError::from)?;
        info!(z_offset_mm, path = %self.path.display(), "z-offset persisted");
        Ok(())
    }
}

/// Write through a sibling temp file and rename over the target.
pub fn write_state(path: &Path, state: &PersistedState) -> eyre::Result<()> {
    let body = state.to_toml()?;
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, body).wrap_err_with(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).wrap_err_with(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_keeps_wizard_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        let seed = PersistedState {
            z_offset_mm: -1.0,
            boot_wizard_pending: true,
            boot_step: 1,
        };
        write_state(&path, &seed).unwrap();

        let mut store = FileOffsetStore::new(&path, -5.0, 0.0);
        store.persist(-2.5).unwrap();

        let got = PersistedState::load(&path).unwrap();
        assert_eq!(got.z_offset_mm, -2.5);
        assert!(got.boot_wizard_pending);
        assert_eq!(got.boot_step, 1);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn out_of_range_value_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        let mut store = FileOffsetStore::new(&path, -5.0, 0.0);
        assert!(store.persist(0.5).is_err());
        assert!(!path.exists());
    }
}
