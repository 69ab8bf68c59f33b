use super::GameState;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;

/// Where game progress lives between sessions.
pub trait GameStore: Send {
    /// Saved state, or the default when nothing usable is stored.
    fn load(&self) -> GameState;
    fn save(&self, state: &GameState) -> Result<()>;
}

/// JSON file on local disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GameStore for JsonFileStore {
    fn load(&self) -> GameState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return GameState::default();
            }
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "cannot read game state, starting fresh");
                return GameState::default();
            }
        };

        match serde_json::from_str::<GameState>(&raw) {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "game state is corrupt, starting fresh");
                GameState::default()
            }
        }
    }

    fn save(&self, state: &GameState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let encoded = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, encoded)
            .with_context(|| format!("cannot write game state to {}", self.path.display()))
    }
}

/// In-process store, mostly for tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<GameState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: GameState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    pub fn snapshot(&self) -> Option<GameState> {
        self.state.lock().ok().and_then(|guard| guard.clone())
    }
}

impl GameStore for MemoryStore {
    fn load(&self) -> GameState {
        self.snapshot().unwrap_or_default()
    }

    fn save(&self, state: &GameState) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("game state lock poisoned"))?;
        *guard = Some(state.clone());
        Ok(())
    }
}
