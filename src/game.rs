//! Core rules: numbered tiles, tetromino pieces, the board, and the settle
//! passes (merge, row clear, isolated drops) that run after every tick.

use crate::theme;
use ratatui::style::Color;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("unrecognised shape tag: {0:?}")]
    InvalidShape(char),
}

/// Tetromino kinds (I, O, Z, L, J, S, T).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    I,
    O,
    Z,
    L,
    J,
    S,
    T,
}

impl Shape {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::Z, Self::L, Self::J, Self::S, Self::T];

    /// Occupied-cell bitmap inside the shape's box. Row 0 is the bottom of
    /// the box. Boxes are padded (I sits in 4x4, the rest except O in 3x3),
    /// so locking goes through the trimmed matrix, never the raw box.
    pub fn template(self) -> &'static [&'static [bool]] {
        const F: bool = false;
        const T: bool = true;
        match self {
            Self::I => &[&[F, T, F, F], &[F, T, F, F], &[F, T, F, F], &[F, T, F, F]],
            Self::O => &[&[T, T], &[T, T]],
            Self::Z => &[&[F, T, T], &[T, T, F], &[F, F, F]],
            Self::S => &[&[T, T, F], &[F, T, T], &[F, F, F]],
            Self::T => &[&[T, T, T], &[F, T, F], &[F, F, F]],
            Self::L => &[&[T, T, F], &[T, F, F], &[T, F, F]],
            Self::J => &[&[T, T, F], &[F, T, F], &[F, T, F]],
        }
    }

    /// Starting tile value for pieces of this shape.
    pub fn base_value(self) -> u32 {
        2
    }

    pub fn tag(self) -> char {
        match self {
            Self::I => 'I',
            Self::O => 'O',
            Self::Z => 'Z',
            Self::L => 'L',
            Self::J => 'J',
            Self::S => 'S',
            Self::T => 'T',
        }
    }
}

impl TryFrom<char> for Shape {
    type Error = GameError;

    fn try_from(tag: char) -> Result<Self, GameError> {
        match tag.to_ascii_uppercase() {
            'I' => Ok(Self::I),
            'O' => Ok(Self::O),
            'Z' => Ok(Self::Z),
            'L' => Ok(Self::L),
            'J' => Ok(Self::J),
            'S' => Ok(Self::S),
            'T' => Ok(Self::T),
            _ => Err(GameError::InvalidShape(tag)),
        }
    }
}

/// One numbered cell. Value is always a power of two; colour tracks the
/// value through the fixed ramp in [`theme`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub value: u32,
    pub color: Color,
}

impl Tile {
    pub fn new(value: u32) -> Self {
        Self {
            value,
            color: theme::tile_color(value),
        }
    }
}

/// Grid coordinate. Signed so pieces can sit partly above the board while
/// they enter (row >= height) without wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Down,
    HardDrop,
}

/// A falling tetromino: its shape box filled with freshly minted tiles, and
/// the grid position of the box's bottom-left corner.
#[derive(Debug, Clone)]
pub struct Piece {
    pub shape: Shape,
    cells: Vec<Vec<Option<Tile>>>,
    pub anchor: Position,
}

impl Piece {
    pub fn new(shape: Shape, anchor: Position) -> Self {
        let base = shape.base_value();
        let cells = shape
            .template()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&occ| occ.then(|| Tile::new(base)))
                    .collect()
            })
            .collect();
        Self { shape, cells, anchor }
    }

    /// Box size as (rows, cols).
    pub fn box_size(&self) -> (usize, usize) {
        (self.cells.len(), self.cells.first().map_or(0, Vec::len))
    }

    /// Tile at a local box cell, for previews.
    pub fn tile_at(&self, row: usize, col: usize) -> Option<&Tile> {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(Option::as_ref)
    }

    /// Absolute grid coordinate of every occupied cell.
    pub fn occupied_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().enumerate().flat_map(move |(r, row)| {
            row.iter().enumerate().filter_map(move |(c, cell)| {
                cell.as_ref().map(|_| Position {
                    row: self.anchor.row + r as i32,
                    col: self.anchor.col + c as i32,
                })
            })
        })
    }

    /// Try to translate the piece. Left/Right/Down move one cell and report
    /// whether they did; a blocked Down is the caller's lock trigger.
    /// HardDrop repeats Down until blocked, as one atomic translation.
    /// Tile values never change here.
    pub fn attempt_move(&mut self, direction: Direction, grid: &Grid) -> bool {
        match direction {
            Direction::Left => self.try_translate(0, -1, grid),
            Direction::Right => self.try_translate(0, 1, grid),
            Direction::Down => self.try_translate(-1, 0, grid),
            Direction::HardDrop => {
                let mut moved = false;
                while self.try_translate(-1, 0, grid) {
                    moved = true;
                }
                moved
            }
        }
    }

    fn try_translate(&mut self, drow: i32, dcol: i32, grid: &Grid) -> bool {
        if !self.fits(drow, dcol, grid) {
            return false;
        }
        self.anchor.row += drow;
        self.anchor.col += dcol;
        true
    }

    /// Every occupied cell of the translated piece must stay between the
    /// walls and floor and land on empty cells. Rows at or above the ceiling
    /// pass: `is_occupied` is false there, so an entering piece may protrude
    /// above the board.
    fn fits(&self, drow: i32, dcol: i32, grid: &Grid) -> bool {
        self.occupied_cells().all(|p| {
            let (row, col) = (p.row + drow, p.col + dcol);
            if col < 0 || col >= grid.width as i32 || row < 0 {
                return false;
            }
            !grid.is_occupied(row, col)
        })
    }

    /// Trim the box to the smallest sub-rectangle holding every occupied
    /// cell. Consumes the piece: the returned tiles are handed to
    /// [`Grid::lock_in`] and the piece is gone. The returned position is the
    /// grid coordinate of the sub-rectangle's bottom-left corner.
    pub fn into_bounded_cells(self) -> (Vec<Vec<Option<Tile>>>, Position) {
        let mut min_r = usize::MAX;
        let mut max_r = 0;
        let mut min_c = usize::MAX;
        let mut max_c = 0;
        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_some() {
                    min_r = min_r.min(r);
                    max_r = max_r.max(r);
                    min_c = min_c.min(c);
                    max_c = max_c.max(c);
                }
            }
        }
        assert!(min_r != usize::MAX, "piece box has no occupied cells");
        let bottom_left = Position {
            row: self.anchor.row + min_r as i32,
            col: self.anchor.col + min_c as i32,
        };
        let sub = self
            .cells
            .into_iter()
            .skip(min_r)
            .take(max_r - min_r + 1)
            .map(|mut row| row.drain(min_c..=max_c).collect())
            .collect();
        (sub, bottom_left)
    }
}

/// The board: a height x width array of optional tiles plus the score and
/// the terminal game-over flag. `cells[row][col]`, row 0 is the bottom row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    cells: Vec<Vec<Option<Tile>>>,
    pub score: u32,
    pub game_over: bool,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        let cells = (0..height).map(|_| vec![None; width]).collect();
        Self {
            width,
            height,
            cells,
            score: 0,
            game_over: false,
        }
    }

    /// Total bounds check, never panics. Rows at or above the top count as
    /// outside; that band is where new pieces enter.
    #[inline]
    pub fn is_inside(&self, row: i32, col: i32) -> bool {
        row >= 0 && (row as usize) < self.height && col >= 0 && (col as usize) < self.width
    }

    /// False for anything out of bounds, so collision checks treat the band
    /// above the ceiling as free space.
    #[inline]
    pub fn is_occupied(&self, row: i32, col: i32) -> bool {
        self.is_inside(row, col) && self.cells[row as usize][col as usize].is_some()
    }

    /// Read snapshot of a cell for rendering.
    pub fn tile_at(&self, row: usize, col: usize) -> Option<&Tile> {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(Option::as_ref)
    }

    /// Transfer a landed piece's trimmed tiles onto the board. Cells that
    /// fall at or above the ceiling flip `game_over`, but the remaining
    /// cells are still placed. Returns the flag.
    pub fn lock_in(&mut self, tiles: Vec<Vec<Option<Tile>>>, bottom_left: Position) -> bool {
        for (r, row_tiles) in tiles.into_iter().enumerate() {
            for (c, slot) in row_tiles.into_iter().enumerate() {
                let Some(tile) = slot else { continue };
                let row = bottom_left.row + r as i32;
                let col = bottom_left.col + c as i32;
                if self.is_inside(row, col) {
                    self.cells[row as usize][col as usize] = Some(tile);
                } else {
                    self.game_over = true;
                }
            }
        }
        self.game_over
    }

    /// The per-tick settle sequence. The order is load-bearing: merge, then
    /// row clears, then the isolated drops that compact the holes the first
    /// two leave behind.
    pub fn settle(&mut self) {
        self.merge();
        self.clear_rows();
        self.drop_isolated_singles();
        self.drop_isolated_pairs();
    }

    fn value_at(&self, row: usize, col: usize) -> Option<u32> {
        self.cells[row][col].as_ref().map(|t| t.value)
    }

    /// One merge scan, bottom to top, each row paired with the row above it.
    /// Equal vertical neighbours combine into the upper cell (value doubled,
    /// scored, recoloured through the ramp); the lower cell empties and the
    /// tile two rows above falls straight into it. That shift is a single
    /// step inside the same scan, not a gravity pass, and it can leave the
    /// moved tile below the merged one; later ticks sort the column out.
    /// Pairs are examined once per call, so stacked equal values take
    /// several ticks to cascade.
    pub fn merge(&mut self) {
        if self.height < 2 {
            return;
        }
        for row in 0..self.height - 1 {
            for col in 0..self.width {
                let (Some(lower), Some(upper)) =
                    (self.value_at(row, col), self.value_at(row + 1, col))
                else {
                    continue;
                };
                if lower != upper {
                    continue;
                }
                let doubled = upper * 2;
                if let Some(tile) = self.cells[row + 1][col].as_mut() {
                    tile.value = doubled;
                    if let Some(color) = theme::merge_color(doubled) {
                        tile.color = color;
                    }
                }
                self.score += doubled;
                self.cells[row][col] = None;
                if row + 2 < self.height {
                    self.cells[row][col] = self.cells[row + 2][col].take();
                }
            }
        }
    }

    /// Rows whose cells are contiguously occupied from the left wall, in
    /// ascending order. The scan stops at the first gap: a row with a hole
    /// at column 0 is never full, whatever sits to its right.
    pub fn check_full_rows(&self) -> Vec<usize> {
        let mut full = Vec::new();
        for row in 0..self.height {
            let mut count = 0;
            for col in 0..self.width {
                if self.cells[row][col].is_some() {
                    count += 1;
                } else {
                    break;
                }
            }
            if count == self.width {
                full.push(row);
            }
        }
        full
    }

    /// Empty every full row, scoring each tile's value. Rows are not
    /// shifted down; the isolated-drop passes compact the gap over the
    /// following ticks.
    pub fn clear_rows(&mut self) {
        for row in self.check_full_rows() {
            for col in 0..self.width {
                if let Some(tile) = self.cells[row][col].take() {
                    self.score += tile.value;
                }
            }
        }
    }

    /// Interior tiles with empty left, right and below neighbours lost
    /// their support; each falls one row per call. A tile that reaches
    /// row 0 stays there.
    pub fn drop_isolated_singles(&mut self) {
        if self.height < 3 || self.width < 3 {
            return;
        }
        for row in 1..self.height - 1 {
            for col in 1..self.width - 1 {
                if self.cells[row][col].is_some()
                    && self.cells[row][col - 1].is_none()
                    && self.cells[row][col + 1].is_none()
                    && self.cells[row - 1][col].is_none()
                {
                    self.cells[row - 1][col] = self.cells[row][col].take();
                }
            }
        }
    }

    /// Same detection for two horizontally adjacent tiles whose outer
    /// neighbours and both under-cells are empty; the pair falls together,
    /// one row per call. Runs three or more wide never drop.
    pub fn drop_isolated_pairs(&mut self) {
        if self.height < 3 || self.width < 4 {
            return;
        }
        for row in 1..self.height - 1 {
            for col in 1..self.width - 2 {
                if self.cells[row][col].is_some()
                    && self.cells[row][col + 1].is_some()
                    && self.cells[row][col - 1].is_none()
                    && self.cells[row][col + 2].is_none()
                    && self.cells[row - 1][col].is_none()
                    && self.cells[row - 1][col + 1].is_none()
                {
                    self.cells[row - 1][col] = self.cells[row][col].take();
                    self.cells[row - 1][col + 1] = self.cells[row][col + 1].take();
                }
            }
        }
    }
}

/// Uniform random shape source (tiny LCG, one draw per spawn).
#[derive(Debug, Clone)]
pub struct ShapePicker {
    rng: u32,
}

impl ShapePicker {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0x1234_5678);
        Self::with_seed(seed | 1)
    }

    pub fn with_seed(seed: u32) -> Self {
        Self { rng: seed }
    }

    fn next_rand(&mut self) -> u32 {
        self.rng = self.rng.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        self.rng >> 16
    }

    pub fn next(&mut self) -> Shape {
        Shape::ALL[(self.next_rand() as usize) % Shape::ALL.len()]
    }
}

impl Default for ShapePicker {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver state: the board, the falling piece, and the preview shape.
#[derive(Debug)]
pub struct GameState {
    pub grid: Grid,
    pub piece: Option<Piece>,
    pub next_shape: Shape,
    picker: ShapePicker,
}

impl GameState {
    pub fn new(width: usize, height: usize) -> Self {
        let mut picker = ShapePicker::new();
        let first = picker.next();
        let next_shape = picker.next();
        Self {
            grid: Grid::new(width, height),
            piece: Some(Self::spawn_piece(width, height, first)),
            next_shape,
            picker,
        }
    }

    /// New piece centred horizontally, box fully above the ceiling so it
    /// descends into view.
    fn spawn_piece(width: usize, height: usize, shape: Shape) -> Piece {
        let box_w = shape.template().first().map_or(0, |r| r.len());
        Piece::new(
            shape,
            Position {
                row: height as i32,
                col: (width.saturating_sub(box_w) / 2) as i32,
            },
        )
    }

    pub fn game_over(&self) -> bool {
        self.grid.game_over
    }

    /// One gravity tick: descend, lock when blocked, spawn the next piece,
    /// then run the settle passes. Everything a tick mutates happens here,
    /// in this order, before the frame is drawn.
    pub fn tick(&mut self) {
        if self.grid.game_over {
            return;
        }
        let descended = match self.piece.as_mut() {
            Some(piece) => piece.attempt_move(Direction::Down, &self.grid),
            None => true,
        };
        if !descended {
            self.lock_current();
        }
        self.grid.settle();
    }

    fn lock_current(&mut self) {
        let Some(piece) = self.piece.take() else { return };
        let (tiles, bottom_left) = piece.into_bounded_cells();
        if self.grid.lock_in(tiles, bottom_left) {
            // Terminal: the flag is set once and nothing spawns after it.
            return;
        }
        let shape = std::mem::replace(&mut self.next_shape, self.picker.next());
        self.piece = Some(Self::spawn_piece(self.grid.width, self.grid.height, shape));
    }

    pub fn move_left(&mut self) {
        self.try_move(Direction::Left);
    }

    pub fn move_right(&mut self) {
        self.try_move(Direction::Right);
    }

    pub fn soft_drop(&mut self) {
        self.try_move(Direction::Down);
    }

    /// Drop to the resting position in one step. Locking still happens on
    /// the next tick's blocked descent.
    pub fn hard_drop(&mut self) {
        self.try_move(Direction::HardDrop);
    }

    fn try_move(&mut self, direction: Direction) {
        if self.grid.game_over {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            piece.attempt_move(direction, &self.grid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(grid: &mut Grid, row: i32, col: i32, value: u32) {
        let over = grid.lock_in(vec![vec![Some(Tile::new(value))]], Position { row, col });
        assert!(!over);
    }

    #[test]
    fn test_shape_tag_roundtrip() {
        for shape in Shape::ALL {
            assert_eq!(Shape::try_from(shape.tag()).unwrap(), shape);
        }
        assert_eq!(Shape::try_from('t').unwrap(), Shape::T);
    }

    #[test]
    fn test_invalid_shape_tag() {
        assert!(matches!(
            Shape::try_from('X'),
            Err(GameError::InvalidShape('X'))
        ));
    }

    #[test]
    fn test_bounds_totality() {
        let grid = Grid::new(12, 20);
        assert!(!grid.is_inside(-1, 0));
        assert!(!grid.is_inside(0, -1));
        assert!(!grid.is_inside(20, 0));
        assert!(!grid.is_inside(1_000_000, -1_000_000));
        assert!(grid.is_inside(0, 0));
        assert!(grid.is_inside(19, 11));
        assert!(!grid.is_occupied(-5, 3));
        assert!(!grid.is_occupied(3, 500));
        assert!(!grid.is_occupied(20, 0));
    }

    #[test]
    fn test_merge_two_equal_tiles() {
        let mut grid = Grid::new(1, 2);
        put(&mut grid, 0, 0, 4);
        put(&mut grid, 1, 0, 4);
        grid.merge();
        assert!(grid.tile_at(0, 0).is_none());
        let upper = grid.tile_at(1, 0).unwrap();
        assert_eq!(upper.value, 8);
        assert_eq!(upper.color, theme::merge_color(8).unwrap());
        assert_eq!(grid.score, 8);
    }

    #[test]
    fn test_merge_compaction_single_step() {
        // 4 / 4 / 2 stacked: the 4s merge into row 1 and the 2 two rows
        // above the vacated cell shifts straight into it.
        let mut grid = Grid::new(1, 4);
        put(&mut grid, 0, 0, 4);
        put(&mut grid, 1, 0, 4);
        put(&mut grid, 2, 0, 2);
        grid.merge();
        assert_eq!(grid.tile_at(0, 0).unwrap().value, 2);
        assert_eq!(grid.tile_at(1, 0).unwrap().value, 8);
        assert!(grid.tile_at(2, 0).is_none());
        assert_eq!(grid.score, 8);
    }

    #[test]
    fn test_merge_no_chain_in_one_call() {
        // 2 / 2 / 4: the bottom pair merges to 4 and the top 4 shifts down,
        // leaving two equal 4s that only combine on the next call.
        let mut grid = Grid::new(1, 4);
        put(&mut grid, 0, 0, 2);
        put(&mut grid, 1, 0, 2);
        put(&mut grid, 2, 0, 4);
        grid.merge();
        assert_eq!(grid.tile_at(0, 0).unwrap().value, 4);
        assert_eq!(grid.tile_at(1, 0).unwrap().value, 4);
        assert!(grid.tile_at(2, 0).is_none());
        assert_eq!(grid.score, 4);
        grid.merge();
        assert!(grid.tile_at(0, 0).is_none());
        assert_eq!(grid.tile_at(1, 0).unwrap().value, 8);
        assert_eq!(grid.score, 12);
    }

    #[test]
    fn test_merge_unequal_values_untouched() {
        let mut grid = Grid::new(1, 3);
        put(&mut grid, 0, 0, 2);
        put(&mut grid, 1, 0, 4);
        let before = grid.clone();
        grid.merge();
        assert_eq!(grid, before);
    }

    #[test]
    fn test_merge_beyond_ramp_keeps_color() {
        let mut grid = Grid::new(1, 2);
        put(&mut grid, 0, 0, 2048);
        put(&mut grid, 1, 0, 2048);
        let old_color = grid.tile_at(1, 0).unwrap().color;
        grid.merge();
        let tile = grid.tile_at(1, 0).unwrap();
        assert_eq!(tile.value, 4096);
        assert_eq!(tile.color, old_color);
    }

    #[test]
    fn test_full_row_detection() {
        let mut grid = Grid::new(3, 2);
        put(&mut grid, 0, 0, 2);
        put(&mut grid, 0, 1, 2);
        put(&mut grid, 0, 2, 4);
        put(&mut grid, 1, 1, 2);
        assert_eq!(grid.check_full_rows(), vec![0]);
    }

    #[test]
    fn test_full_row_detection_stops_at_gap() {
        // Hole at column 0: the left-to-right scan breaks immediately, so
        // the row is not full no matter what sits to the right.
        let mut grid = Grid::new(3, 1);
        put(&mut grid, 0, 1, 2);
        put(&mut grid, 0, 2, 2);
        assert!(grid.check_full_rows().is_empty());
    }

    #[test]
    fn test_clear_rows_scores_and_empties() {
        let mut grid = Grid::new(3, 2);
        put(&mut grid, 0, 0, 2);
        put(&mut grid, 0, 1, 2);
        put(&mut grid, 0, 2, 4);
        put(&mut grid, 1, 0, 16);
        grid.clear_rows();
        assert_eq!(grid.score, 8);
        for col in 0..3 {
            assert!(grid.tile_at(0, col).is_none());
        }
        // The row above is compacted by later drop passes, not by the clear.
        assert_eq!(grid.tile_at(1, 0).unwrap().value, 16);
    }

    #[test]
    fn test_drop_isolated_single_one_row_per_call() {
        let mut grid = Grid::new(3, 7);
        put(&mut grid, 5, 1, 2);
        grid.drop_isolated_singles();
        assert!(grid.tile_at(5, 1).is_none());
        assert_eq!(grid.tile_at(4, 1).unwrap().value, 2);
        for _ in 0..4 {
            grid.drop_isolated_singles();
        }
        assert_eq!(grid.tile_at(0, 1).unwrap().value, 2);
        // Row 0 is the floor; further calls leave it alone.
        grid.drop_isolated_singles();
        assert_eq!(grid.tile_at(0, 1).unwrap().value, 2);
    }

    #[test]
    fn test_drop_isolated_single_needs_all_neighbours_empty() {
        let mut grid = Grid::new(4, 4);
        put(&mut grid, 2, 1, 2);
        put(&mut grid, 2, 2, 4);
        let before = grid.clone();
        grid.drop_isolated_singles();
        // Lateral support: neither tile is isolated.
        assert_eq!(grid, before);
    }

    #[test]
    fn test_drop_isolated_pair_falls_together() {
        let mut grid = Grid::new(4, 5);
        put(&mut grid, 3, 1, 2);
        put(&mut grid, 3, 2, 4);
        grid.drop_isolated_pairs();
        assert_eq!(grid.tile_at(2, 1).unwrap().value, 2);
        assert_eq!(grid.tile_at(2, 2).unwrap().value, 4);
        assert!(grid.tile_at(3, 1).is_none());
        assert!(grid.tile_at(3, 2).is_none());
    }

    #[test]
    fn test_unsupported_triple_never_drops() {
        let mut grid = Grid::new(5, 5);
        put(&mut grid, 3, 1, 2);
        put(&mut grid, 3, 2, 2);
        put(&mut grid, 3, 3, 2);
        let before = grid.clone();
        grid.drop_isolated_singles();
        grid.drop_isolated_pairs();
        assert_eq!(grid, before);
    }

    #[test]
    fn test_lock_in_above_ceiling_sets_game_over() {
        let mut grid = Grid::new(4, 4);
        let tiles = vec![vec![Some(Tile::new(2))], vec![Some(Tile::new(2))]];
        let over = grid.lock_in(tiles, Position { row: 3, col: 0 });
        assert!(over);
        assert!(grid.game_over);
        // The in-bounds cell is still placed.
        assert_eq!(grid.tile_at(3, 0).unwrap().value, 2);
    }

    #[test]
    fn test_settle_noop_is_idempotent() {
        let mut grid = Grid::new(3, 4);
        put(&mut grid, 0, 0, 2);
        put(&mut grid, 0, 1, 4);
        put(&mut grid, 1, 1, 8);
        let before = grid.clone();
        grid.settle();
        assert_eq!(grid, before);
    }

    #[test]
    fn test_into_bounded_cells_trims_padding() {
        // I sits in a 4x4 box with only column 1 occupied.
        let piece = Piece::new(Shape::I, Position { row: 10, col: 3 });
        let (tiles, bottom_left) = piece.into_bounded_cells();
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|row| row.len() == 1));
        assert!(tiles.iter().all(|row| row[0].is_some()));
        assert_eq!(bottom_left, Position { row: 10, col: 4 });
    }

    #[test]
    fn test_into_bounded_cells_keeps_holes_inside_bounds() {
        // T's trimmed box is 2x3 with the top corners empty.
        let piece = Piece::new(Shape::T, Position { row: 0, col: 0 });
        let (tiles, bottom_left) = piece.into_bounded_cells();
        assert_eq!(bottom_left, Position { row: 0, col: 0 });
        assert_eq!(tiles.len(), 2);
        assert!(tiles[0].iter().all(Option::is_some));
        assert!(tiles[1][0].is_none());
        assert!(tiles[1][1].is_some());
        assert!(tiles[1][2].is_none());
    }

    #[test]
    fn test_attempt_move_blocked_at_walls_and_floor() {
        let grid = Grid::new(4, 6);
        let mut piece = Piece::new(Shape::O, Position { row: 0, col: 0 });
        assert!(!piece.attempt_move(Direction::Left, &grid));
        assert_eq!(piece.anchor, Position { row: 0, col: 0 });
        assert!(!piece.attempt_move(Direction::Down, &grid));
        assert!(piece.attempt_move(Direction::Right, &grid));
        assert_eq!(piece.anchor, Position { row: 0, col: 1 });
        // Right wall: O is 2 wide on a 4-wide board.
        assert!(piece.attempt_move(Direction::Right, &grid));
        assert!(!piece.attempt_move(Direction::Right, &grid));
        assert_eq!(piece.anchor.col, 2);
    }

    #[test]
    fn test_attempt_move_blocked_by_tiles() {
        let mut grid = Grid::new(4, 6);
        put(&mut grid, 0, 0, 2);
        let mut piece = Piece::new(Shape::O, Position { row: 1, col: 0 });
        assert!(!piece.attempt_move(Direction::Down, &grid));
        assert!(piece.attempt_move(Direction::Right, &grid));
        assert!(piece.attempt_move(Direction::Down, &grid));
        assert_eq!(piece.anchor, Position { row: 0, col: 1 });
    }

    #[test]
    fn test_piece_may_protrude_above_ceiling() {
        let grid = Grid::new(4, 4);
        // Vertical I anchored at the ceiling: its occupied rows 4..8 sit in
        // the entry band, columns are in range, so moves still work.
        let mut piece = Piece::new(Shape::I, Position { row: 4, col: 0 });
        assert!(piece.attempt_move(Direction::Right, &grid));
        assert!(piece.attempt_move(Direction::Down, &grid));
        assert_eq!(piece.anchor.row, 3);
    }

    #[test]
    fn test_hard_drop_lands_on_stack() {
        let mut grid = Grid::new(4, 8);
        put(&mut grid, 0, 0, 2);
        let mut piece = Piece::new(Shape::O, Position { row: 5, col: 0 });
        assert!(piece.attempt_move(Direction::HardDrop, &grid));
        assert_eq!(piece.anchor, Position { row: 1, col: 0 });
        // Already resting: a second hard drop reports no movement.
        assert!(!piece.attempt_move(Direction::HardDrop, &grid));
    }

    #[test]
    fn test_tick_locks_merges_and_respawns() {
        let mut state = GameState::new(12, 20);
        state.grid.score = 0;
        state.piece = Some(Piece::new(Shape::O, Position { row: 0, col: 0 }));
        state.tick();
        // Descent blocked on the floor: the O locks as four 2s, then the
        // settle merge combines each column upward into a 4.
        assert_eq!(state.grid.tile_at(1, 0).unwrap().value, 4);
        assert_eq!(state.grid.tile_at(1, 1).unwrap().value, 4);
        assert!(state.grid.tile_at(0, 0).is_none());
        assert!(state.grid.tile_at(0, 1).is_none());
        assert_eq!(state.grid.score, 8);
        assert!(!state.game_over());
        assert!(state.piece.is_some());
    }

    #[test]
    fn test_tick_after_game_over_mutates_nothing() {
        let mut state = GameState::new(6, 6);
        state.grid.game_over = true;
        let before = state.grid.clone();
        state.tick();
        state.move_left();
        state.hard_drop();
        assert_eq!(state.grid, before);
    }

    #[test]
    fn test_clear_then_drop_compacts_in_same_settle() {
        // Full bottom row with one supported tile above. The clear frees the
        // tile and the singles pass of the same settle call walks it one row
        // down, onto the floor.
        let mut grid = Grid::new(3, 5);
        for col in 0..3 {
            put(&mut grid, 0, col, 2);
        }
        put(&mut grid, 1, 1, 8);
        grid.settle();
        assert_eq!(grid.score, 6);
        assert_eq!(grid.tile_at(0, 1).unwrap().value, 8);
        assert!(grid.tile_at(1, 1).is_none());
    }
}
