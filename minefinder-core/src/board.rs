//! Single-player minefield: lazy mine placement, flood reveal, flagging and
//! win/loss detection. Networking and drawing live elsewhere.

use minefinder_types::{BoardConfig, CellPos, GameError, MinePlacement, Mode};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Empty,
    Mine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub state: CellState,
    pub revealed: bool,
    pub flagged: bool,
    pub adjacent_mines: Option<u8>,
    /// Mine uncovered when the game was lost.
    pub exploded: bool,
    /// Flag left on a non-mine cell, surfaced when the game is lost.
    pub false_flag: bool,
}

impl Cell {
    pub fn is_mine(&self) -> bool {
        self.state == CellState::Mine
    }
}

/// What a renderer should draw for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellView {
    Hidden,
    Flagged,
    Revealed(u8),
    Exploded,
    FalseFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealOutcome {
    /// Nothing changed: the cell was flagged or revealed, or the game is over.
    NoChange,
    Ongoing,
    Won,
    Lost,
}

impl RevealOutcome {
    pub fn is_game_over(self) -> bool {
        matches!(self, RevealOutcome::Won | RevealOutcome::Lost)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    config: BoardConfig,
    cells: Array2<Cell>,
    cells_remaining: u32,
    flagged_cells: u32,
    game_over: bool,
    mines_placed: bool,
    placement: Option<MinePlacement>,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        let config = BoardConfig::custom(config.width, config.height, config.mines);
        Self {
            config,
            cells: Array2::default((usize::from(config.width), usize::from(config.height))),
            cells_remaining: config.safe_cells(),
            flagged_cells: 0,
            game_over: false,
            mines_placed: false,
            placement: None,
        }
    }

    pub fn with_mode(mode: Mode) -> Self {
        Self::new(mode.config())
    }

    pub fn config(&self) -> BoardConfig {
        self.config
    }

    pub fn cells_remaining(&self) -> u32 {
        self.cells_remaining
    }

    pub fn flagged_cells(&self) -> u32 {
        self.flagged_cells
    }

    /// Mine counter shown to the player: configured mines minus flags.
    pub fn mines_remaining(&self) -> i32 {
        self.config.mines as i32 - self.flagged_cells as i32
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn mines_placed(&self) -> bool {
        self.mines_placed
    }

    pub fn placement(&self) -> Option<&MinePlacement> {
        self.placement.as_ref()
    }

    pub fn cell(&self, pos: CellPos) -> Result<&Cell, GameError> {
        self.check_bounds(pos)?;
        Ok(&self.cells[index(pos)])
    }

    pub fn cell_view(&self, pos: CellPos) -> Result<CellView, GameError> {
        let cell = self.cell(pos)?;
        Ok(if cell.exploded {
            CellView::Exploded
        } else if cell.false_flag {
            CellView::FalseFlag
        } else if cell.flagged {
            CellView::Flagged
        } else if cell.revealed {
            CellView::Revealed(cell.adjacent_mines.unwrap_or(0))
        } else {
            CellView::Hidden
        })
    }

    /// In-bounds neighbours of `pos`, clipped at the edges.
    pub fn neighbors(&self, pos: CellPos) -> impl Iterator<Item = CellPos> + use<> {
        let (width, height) = (i32::from(self.config.width), i32::from(self.config.height));
        DIRECTIONS.into_iter().filter_map(move |(dx, dy)| {
            let x = i32::from(pos.x) + dx;
            let y = i32::from(pos.y) + dy;
            if (0..width).contains(&x) && (0..height).contains(&y) {
                Some(CellPos::new(x as u16, y as u16))
            } else {
                None
            }
        })
    }

    /// Chooses the mine cells for this round, keeping `safe` clear unless
    /// every cell has to be a mine. The returned placement is what peers
    /// apply to build the same board.
    pub fn place_mines<R: Rng + ?Sized>(
        &mut self,
        safe: CellPos,
        rng: &mut R,
    ) -> Result<MinePlacement, GameError> {
        self.check_bounds(safe)?;
        if self.mines_placed {
            return Err(GameError::MinesAlreadyPlaced);
        }

        let mines = if self.config.is_saturated() {
            self.positions().collect::<Vec<_>>()
        } else {
            let candidates: Vec<CellPos> = self.positions().filter(|&pos| pos != safe).collect();
            rand::seq::index::sample(rng, candidates.len(), self.config.mines as usize)
                .into_iter()
                .map(|i| candidates[i])
                .collect()
        };

        let placement = MinePlacement { safe, mines };
        self.set_mines(&placement);
        debug!(
            "Placed {} mines, first click at {}",
            placement.mines.len(),
            safe
        );
        Ok(placement)
    }

    pub fn place_mines_random(&mut self, safe: CellPos) -> Result<MinePlacement, GameError> {
        self.place_mines(safe, &mut rand::rng())
    }

    /// Installs a layout generated on another player's board.
    pub fn apply_mine_placement(&mut self, placement: &MinePlacement) -> Result<(), GameError> {
        if self.mines_placed {
            return Err(GameError::MinesAlreadyPlaced);
        }
        self.check_bounds(placement.safe)?;
        if placement.mines.len() != self.config.mines as usize {
            return Err(GameError::InvalidPlacement {
                reason: format!(
                    "expected {} mines, got {}",
                    self.config.mines,
                    placement.mines.len()
                ),
            });
        }

        let mut seen = HashSet::with_capacity(placement.mines.len());
        for &pos in &placement.mines {
            self.check_bounds(pos)?;
            if !seen.insert(pos) {
                return Err(GameError::InvalidPlacement {
                    reason: format!("cell {} listed twice", pos),
                });
            }
        }
        if !self.config.is_saturated() && seen.contains(&placement.safe) {
            return Err(GameError::InvalidPlacement {
                reason: format!("safe cell {} holds a mine", placement.safe),
            });
        }

        self.set_mines(placement);
        Ok(())
    }

    /// Reveals `pos`, flooding outward through cells with no adjacent mines.
    pub fn reveal_from(&mut self, pos: CellPos) -> Result<RevealOutcome, GameError> {
        self.check_bounds(pos)?;
        if !self.mines_placed {
            return Err(GameError::MinesNotPlaced);
        }
        if self.game_over {
            return Ok(RevealOutcome::NoChange);
        }

        let cell = self.cells[index(pos)];
        if cell.flagged || cell.revealed {
            return Ok(RevealOutcome::NoChange);
        }
        if cell.is_mine() {
            self.cells[index(pos)].exploded = true;
            self.reveal_all_mines(false);
            return Ok(RevealOutcome::Lost);
        }

        let mut stack = vec![pos];
        while let Some(current) = stack.pop() {
            let cell = self.cells[index(current)];
            if cell.revealed || cell.flagged || cell.is_mine() {
                continue;
            }

            let adjacent = self.count_adjacent_mines(current);
            let cell = &mut self.cells[index(current)];
            cell.revealed = true;
            cell.adjacent_mines = Some(adjacent);
            self.cells_remaining -= 1;

            if adjacent == 0 {
                for neighbor in self.neighbors(current) {
                    let next = self.cells[index(neighbor)];
                    if !next.revealed && !next.flagged && !next.is_mine() {
                        stack.push(neighbor);
                    }
                }
            }
        }

        if self.cells_remaining == 0 {
            self.reveal_all_mines(true);
            Ok(RevealOutcome::Won)
        } else {
            Ok(RevealOutcome::Ongoing)
        }
    }

    /// Returns whether the flag actually changed.
    pub fn toggle_flag(&mut self, pos: CellPos) -> Result<bool, GameError> {
        self.check_bounds(pos)?;
        if self.game_over {
            return Ok(false);
        }

        let cell = &mut self.cells[index(pos)];
        if cell.revealed {
            return Ok(false);
        }

        cell.flagged = !cell.flagged;
        if cell.flagged {
            self.flagged_cells += 1;
        } else {
            self.flagged_cells -= 1;
        }
        Ok(true)
    }

    /// End-of-game sweep: a win flags every remaining mine, a loss uncovers
    /// unflagged mines and marks wrong flags.
    pub fn reveal_all_mines(&mut self, won: bool) {
        for cell in self.cells.iter_mut() {
            if won {
                if cell.is_mine() && !cell.flagged {
                    cell.flagged = true;
                    self.flagged_cells += 1;
                }
            } else if cell.is_mine() && !cell.flagged {
                cell.revealed = true;
                cell.exploded = true;
            } else if !cell.is_mine() && cell.flagged {
                cell.false_flag = true;
            }
        }
        self.game_over = true;
    }

    fn set_mines(&mut self, placement: &MinePlacement) {
        for &pos in &placement.mines {
            self.cells[index(pos)].state = CellState::Mine;
        }
        self.mines_placed = true;
        self.placement = Some(placement.clone());
    }

    fn count_adjacent_mines(&self, pos: CellPos) -> u8 {
        self.neighbors(pos)
            .filter(|&neighbor| self.cells[index(neighbor)].is_mine())
            .count() as u8
    }

    fn positions(&self) -> impl Iterator<Item = CellPos> + use<> {
        let (width, height) = (self.config.width, self.config.height);
        (0..width).flat_map(move |x| (0..height).map(move |y| CellPos::new(x, y)))
    }

    fn check_bounds(&self, pos: CellPos) -> Result<(), GameError> {
        if self.config.contains(pos) {
            Ok(())
        } else {
            Err(GameError::InvalidCell { pos })
        }
    }
}

fn index(pos: CellPos) -> [usize; 2] {
    [usize::from(pos.x), usize::from(pos.y)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn board_with_mines(width: u16, height: u16, safe: CellPos, mines: &[(u16, u16)]) -> Board {
        let mut board = Board::new(BoardConfig::custom(width, height, mines.len() as u32));
        let placement = MinePlacement {
            safe,
            mines: mines.iter().map(|&m| m.into()).collect(),
        };
        board.apply_mine_placement(&placement).unwrap();
        board
    }

    #[test]
    fn test_new_board_matches_mode() {
        let board = Board::with_mode(Mode::Expert);
        assert_eq!(board.config().width, 30);
        assert_eq!(board.config().height, 16);
        assert_eq!(board.cells_remaining(), 30 * 16 - 99);
        assert_eq!(board.flagged_cells(), 0);
        assert!(!board.is_game_over());
        assert!(!board.mines_placed());
    }

    #[test]
    fn test_first_click_is_never_a_mine() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut board = Board::with_mode(Mode::Intermediate);
            let safe = CellPos::new((seed % 16) as u16, (seed * 7 % 16) as u16);

            let placement = board.place_mines(safe, &mut rng).unwrap();

            assert_eq!(placement.mines.len(), 40);
            assert!(!placement.mines.contains(&safe));
            assert!(!board.cell(safe).unwrap().is_mine());
            let unique: HashSet<_> = placement.mines.iter().collect();
            assert_eq!(unique.len(), 40);
        }
    }

    #[test]
    fn test_placement_replays_identically_on_peer() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut leader = Board::with_mode(Mode::Beginner);
        let safe = CellPos::new(4, 4);
        let placement = leader.place_mines(safe, &mut rng).unwrap();

        let mut peer = Board::with_mode(Mode::Beginner);
        peer.apply_mine_placement(&placement).unwrap();

        assert_eq!(leader.reveal_from(safe).unwrap(), peer.reveal_from(safe).unwrap());
        assert_eq!(leader.cells_remaining(), peer.cells_remaining());
        for x in 0..9 {
            for y in 0..9 {
                let pos = CellPos::new(x, y);
                assert_eq!(leader.cell(pos).unwrap(), peer.cell(pos).unwrap());
            }
        }
    }

    #[test]
    fn test_saturated_board_is_immediate_loss() {
        let mut board = Board::new(BoardConfig::custom(1, 1, 1));
        let safe = CellPos::new(0, 0);

        let placement = board.place_mines_random(safe).unwrap();

        assert_eq!(placement.mines, vec![safe]);
        assert!(board.cell(safe).unwrap().is_mine());
        assert_eq!(board.reveal_from(safe).unwrap(), RevealOutcome::Lost);
        assert!(board.is_game_over());
        assert_eq!(board.cell_view(safe).unwrap(), CellView::Exploded);
    }

    #[test]
    fn test_flood_fill_counts_and_conservation() {
        // Single mine in the bottom-right corner of a 4x4 board.
        let mut board = board_with_mines(4, 4, CellPos::new(0, 0), &[(3, 3)]);
        assert_eq!(board.cells_remaining(), 15);

        let outcome = board.reveal_from(CellPos::new(0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::Won);
        assert_eq!(board.cells_remaining(), 0);
        assert_eq!(board.cell(CellPos::new(0, 0)).unwrap().adjacent_mines, Some(0));
        assert_eq!(board.cell(CellPos::new(2, 2)).unwrap().adjacent_mines, Some(1));
        assert_eq!(board.cell(CellPos::new(3, 2)).unwrap().adjacent_mines, Some(1));
        // Winning flags the remaining mine.
        assert_eq!(board.cell_view(CellPos::new(3, 3)).unwrap(), CellView::Flagged);
        assert_eq!(board.mines_remaining(), 0);
    }

    #[test]
    fn test_numbered_cell_does_not_expand() {
        let mut board = board_with_mines(3, 1, CellPos::new(0, 0), &[(2, 0)]);

        let outcome = board.reveal_from(CellPos::new(1, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::Ongoing);
        assert_eq!(board.cells_remaining(), 1);
        assert_eq!(board.cell_view(CellPos::new(1, 0)).unwrap(), CellView::Revealed(1));
        assert_eq!(board.cell_view(CellPos::new(0, 0)).unwrap(), CellView::Hidden);
    }

    #[test]
    fn test_cells_remaining_drops_by_revealed_count() {
        let mut board = board_with_mines(5, 5, CellPos::new(0, 0), &[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]);
        let before = board.cells_remaining();

        board.reveal_from(CellPos::new(0, 0)).unwrap();

        let revealed = (0..5u16)
            .flat_map(|x| (0..5u16).map(move |y| CellPos::new(x, y)))
            .filter(|&pos| board.cell(pos).unwrap().revealed)
            .count() as u32;
        // Left strip: columns 0 and 1 only.
        assert_eq!(revealed, 10);
        assert_eq!(before - board.cells_remaining(), revealed);
    }

    #[test]
    fn test_flood_fill_skips_flagged_cells() {
        let mut board = board_with_mines(4, 4, CellPos::new(0, 0), &[(3, 3)]);
        let flagged = CellPos::new(1, 1);
        assert!(board.toggle_flag(flagged).unwrap());

        let outcome = board.reveal_from(CellPos::new(0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::Ongoing);
        let cell = board.cell(flagged).unwrap();
        assert!(cell.flagged);
        assert!(!cell.revealed);
        assert_eq!(cell.adjacent_mines, None);
        assert_eq!(board.cells_remaining(), 1);

        // Revealing the flagged cell is a no-op.
        assert_eq!(board.reveal_from(flagged).unwrap(), RevealOutcome::NoChange);
        assert_eq!(board.cells_remaining(), 1);
    }

    #[test]
    fn test_reveal_is_deterministic() {
        let mines = [(1, 1), (4, 0), (0, 5), (5, 5), (3, 3)];
        let order = [CellPos::new(0, 0), CellPos::new(5, 0), CellPos::new(2, 5)];

        let run = || {
            let mut board = board_with_mines(6, 6, CellPos::new(0, 0), &mines);
            let outcomes: Vec<_> = order.iter().map(|&pos| board.reveal_from(pos).unwrap()).collect();
            let counts: Vec<_> = (0..6u16)
                .flat_map(|x| (0..6u16).map(move |y| CellPos::new(x, y)))
                .map(|pos| board.cell(pos).unwrap().adjacent_mines)
                .collect();
            (outcomes, counts, board.cells_remaining())
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_toggle_flag_rules() {
        let mut board = board_with_mines(3, 1, CellPos::new(0, 0), &[(2, 0)]);
        let pos = CellPos::new(2, 0);

        assert!(board.toggle_flag(pos).unwrap());
        assert_eq!(board.flagged_cells(), 1);
        assert_eq!(board.mines_remaining(), 0);
        assert!(board.toggle_flag(pos).unwrap());
        assert_eq!(board.flagged_cells(), 0);

        board.reveal_from(CellPos::new(1, 0)).unwrap();
        assert!(!board.toggle_flag(CellPos::new(1, 0)).unwrap());
        assert_eq!(board.flagged_cells(), 0);
    }

    #[test]
    fn test_loss_marks_false_flags() {
        let mut board = board_with_mines(3, 3, CellPos::new(0, 0), &[(2, 2), (0, 2)]);
        board.toggle_flag(CellPos::new(1, 0)).unwrap();
        board.toggle_flag(CellPos::new(0, 2)).unwrap();

        assert_eq!(board.reveal_from(CellPos::new(2, 2)).unwrap(), RevealOutcome::Lost);

        assert_eq!(board.cell_view(CellPos::new(1, 0)).unwrap(), CellView::FalseFlag);
        assert_eq!(board.cell_view(CellPos::new(0, 2)).unwrap(), CellView::Flagged);
        assert_eq!(board.cell_view(CellPos::new(2, 2)).unwrap(), CellView::Exploded);
        assert!(!board.toggle_flag(CellPos::new(1, 1)).unwrap());
        assert_eq!(board.reveal_from(CellPos::new(0, 0)).unwrap(), RevealOutcome::NoChange);
    }

    #[test]
    fn test_reveal_requires_placement() {
        let mut board = Board::with_mode(Mode::Beginner);
        assert_eq!(
            board.reveal_from(CellPos::new(0, 0)),
            Err(GameError::MinesNotPlaced)
        );
        assert_eq!(
            board.reveal_from(CellPos::new(9, 0)),
            Err(GameError::InvalidCell { pos: CellPos::new(9, 0) })
        );
    }

    #[test]
    fn test_apply_placement_rejects_bad_layouts() {
        let mut board = Board::new(BoardConfig::custom(3, 3, 2));

        let wrong_count = MinePlacement {
            safe: CellPos::new(0, 0),
            mines: vec![CellPos::new(1, 1)],
        };
        assert!(matches!(
            board.apply_mine_placement(&wrong_count),
            Err(GameError::InvalidPlacement { .. })
        ));

        let duplicate = MinePlacement {
            safe: CellPos::new(0, 0),
            mines: vec![CellPos::new(1, 1), CellPos::new(1, 1)],
        };
        assert!(matches!(
            board.apply_mine_placement(&duplicate),
            Err(GameError::InvalidPlacement { .. })
        ));

        let mined_safe = MinePlacement {
            safe: CellPos::new(0, 0),
            mines: vec![CellPos::new(0, 0), CellPos::new(1, 1)],
        };
        assert!(matches!(
            board.apply_mine_placement(&mined_safe),
            Err(GameError::InvalidPlacement { .. })
        ));

        let out_of_bounds = MinePlacement {
            safe: CellPos::new(0, 0),
            mines: vec![CellPos::new(3, 0), CellPos::new(1, 1)],
        };
        assert!(matches!(
            board.apply_mine_placement(&out_of_bounds),
            Err(GameError::InvalidCell { .. })
        ));
        assert!(!board.mines_placed());
    }

    #[test]
    fn test_neighbors_are_clipped() {
        let board = Board::with_mode(Mode::Beginner);
        assert_eq!(board.neighbors(CellPos::new(0, 0)).count(), 3);
        assert_eq!(board.neighbors(CellPos::new(4, 0)).count(), 5);
        assert_eq!(board.neighbors(CellPos::new(4, 4)).count(), 8);
        assert_eq!(board.neighbors(CellPos::new(8, 8)).count(), 3);
    }
}
