use crate::cooldown::Deadline;
use anyhow::Context;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key under which the deadline is persisted.
pub const COOLDOWN_KEY: &str = "cooldownTimestamp";

/// Where the cooldown deadline survives between runs.
pub trait CooldownStore {
    fn get(&self) -> anyhow::Result<Option<Deadline>>;
    fn set(&self, deadline: Deadline) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// One file containing the deadline as epoch milliseconds.
#[derive(Debug, Clone)]
pub struct FileCooldownStore {
    path: PathBuf,
}

impl FileCooldownStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(COOLDOWN_KEY))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CooldownStore for FileCooldownStore {
    fn get(&self) -> anyhow::Result<Option<Deadline>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read cooldown file {}", self.path.display())
                })
            }
        };

        let deadline = Deadline::decode(&raw);
        if deadline.is_none() {
            tracing::warn!(path = %self.path.display(), raw = %raw.trim(), "ignoring unreadable cooldown deadline");
        }
        Ok(deadline)
    }

    fn set(&self, deadline: Deadline) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create state dir {}", parent.display()))?;
        }
        std::fs::write(&self.path, deadline.encode())
            .with_context(|| format!("failed to write cooldown file {}", self.path.display()))
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("failed to remove cooldown file {}", self.path.display())
            }),
        }
    }
}

/// In-process store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCooldownStore {
    slot: Arc<Mutex<Option<Deadline>>>,
}

impl MemoryCooldownStore {
    pub fn with_deadline(deadline: Deadline) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(deadline))),
        }
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Option<Deadline>>> {
        self.slot
            .lock()
            .map_err(|_| anyhow::anyhow!("cooldown store lock poisoned"))
    }
}

impl CooldownStore for MemoryCooldownStore {
    fn get(&self) -> anyhow::Result<Option<Deadline>> {
        Ok(*self.lock()?)
    }

    fn set(&self, deadline: Deadline) -> anyhow::Result<()> {
        *self.lock()? = Some(deadline);
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}
