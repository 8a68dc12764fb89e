use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ship::ShipKind;

/// Default edge length of the square board.
pub const BOARD_SIZE: u8 = 10;
/// Largest board edge the bitboard grid can hold.
pub const MAX_BOARD_SIZE: usize = 16;
pub const NUM_SHIPS: usize = 5;
/// The standard fleet, one ship of each kind.
pub const SHIPS: [ShipKind; NUM_SHIPS] = ShipKind::ALL;

/// How the player who fires first is chosen once both fleets are ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartRule {
    /// The player who entered the queue first.
    #[default]
    FirstJoiner,
    /// The player whose fleet was complete first.
    FirstReady,
}

/// Game rules for a session: board size, fleet roster and start rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    pub board_size: u8,
    pub fleet: Vec<ShipKind>,
    pub start_rule: StartRule,
}

impl Default for Ruleset {
    fn default() -> Self {
        Ruleset {
            board_size: BOARD_SIZE,
            fleet: SHIPS.to_vec(),
            start_rule: StartRule::FirstJoiner,
        }
    }
}

impl Ruleset {
    /// Total number of ship cells in the fleet.
    pub fn fleet_cells(&self) -> usize {
        self.fleet.iter().map(|k| k.length()).sum()
    }

    /// How many ships of `kind` the fleet holds.
    pub fn count_of(&self, kind: ShipKind) -> usize {
        self.fleet.iter().filter(|&&k| k == kind).count()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_size == 0 || self.board_size as usize > MAX_BOARD_SIZE {
            return Err(ConfigError::Validation(format!(
                "ruleset.board_size must be in 1..={}",
                MAX_BOARD_SIZE
            )));
        }
        if self.fleet.is_empty() {
            return Err(ConfigError::Validation("ruleset.fleet must not be empty".into()));
        }
        if let Some(kind) = self
            .fleet
            .iter()
            .find(|k| k.length() > self.board_size as usize)
        {
            return Err(ConfigError::Validation(format!(
                "ruleset.fleet: {} does not fit on a {}x{} board",
                kind, self.board_size, self.board_size
            )));
        }
        let area = self.board_size as usize * self.board_size as usize;
        if self.fleet_cells() > area {
            return Err(ConfigError::Validation(
                "ruleset.fleet covers more cells than the board has".into(),
            ));
        }
        Ok(())
    }
}

/// Engine configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ruleset: Ruleset,
    /// Seconds without a move before an unfinished session is forced to end.
    pub idle_timeout_secs: u64,
    /// Seconds a finished session stays live waiting for acknowledgements.
    pub linger_secs: u64,
    /// Milliseconds between background sweeps.
    pub sweep_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ruleset: Ruleset::default(),
            idle_timeout_secs: 300,
            linger_secs: 30,
            sweep_interval_ms: 1_000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ruleset.validate()?;
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Validation("idle_timeout_secs must be > 0".into()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Validation("sweep_interval_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_secs(self.linger_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
