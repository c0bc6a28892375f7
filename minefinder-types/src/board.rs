use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Named board presets offered to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Mode {
    #[default]
    Beginner,
    Intermediate,
    Expert,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Beginner, Mode::Intermediate, Mode::Expert];

    pub fn config(self) -> BoardConfig {
        match self {
            Mode::Beginner => BoardConfig::custom(9, 9, 10),
            Mode::Intermediate => BoardConfig::custom(16, 16, 40),
            Mode::Expert => BoardConfig::custom(30, 16, 99),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Beginner => "beginner",
            Mode::Intermediate => "intermediate",
            Mode::Expert => "expert",
        };
        f.write_str(name)
    }
}

/// Board dimensions and mine count. The mine count never exceeds the
/// number of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BoardConfig {
    pub width: u16,
    pub height: u16,
    pub mines: u32,
}

impl BoardConfig {
    pub fn custom(width: u16, height: u16, mines: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let total = u32::from(width) * u32::from(height);
        Self {
            width,
            height,
            mines: mines.min(total),
        }
    }

    pub fn total_cells(&self) -> u32 {
        u32::from(self.width) * u32::from(self.height)
    }

    pub fn safe_cells(&self) -> u32 {
        self.total_cells() - self.mines
    }

    pub fn is_saturated(&self) -> bool {
        self.mines == self.total_cells()
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        pos.x < self.width && pos.y < self.height
    }
}

impl From<Mode> for BoardConfig {
    fn from(mode: Mode) -> Self {
        mode.config()
    }
}

/// Grid coordinates, origin at the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CellPos {
    pub x: u16,
    pub y: u16,
}

impl CellPos {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.x, self.y)
    }
}

impl From<(u16, u16)> for CellPos {
    fn from((x, y): (u16, u16)) -> Self {
        Self { x, y }
    }
}

/// Mine layout generated by the round leader and relayed to every peer.
/// `mines` keeps generation order so every board is built identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MinePlacement {
    pub safe: CellPos,
    pub mines: Vec<CellPos>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_presets() {
        assert_eq!(Mode::Beginner.config(), BoardConfig { width: 9, height: 9, mines: 10 });
        assert_eq!(Mode::Intermediate.config(), BoardConfig { width: 16, height: 16, mines: 40 });
        assert_eq!(Mode::Expert.config(), BoardConfig { width: 30, height: 16, mines: 99 });
    }

    #[test]
    fn test_custom_config_clamps_mines() {
        let config = BoardConfig::custom(2, 2, 10);
        assert_eq!(config.mines, 4);
        assert!(config.is_saturated());
        assert_eq!(config.safe_cells(), 0);

        let config = BoardConfig::custom(0, 3, 1);
        assert_eq!(config.width, 1);
        assert_eq!(config.total_cells(), 3);
    }

    #[test]
    fn test_mode_wire_name() {
        assert_eq!(serde_json::to_string(&Mode::Expert).unwrap(), "\"expert\"");
        let mode: Mode = serde_json::from_str("\"intermediate\"").unwrap();
        assert_eq!(mode, Mode::Intermediate);
    }
}
