//! # Board bookkeeping
//!
//! The board is a fixed array of topping slots. The first [`PIZZA_SQUARES`] slots map one-to-one
//! onto the 8x8 grid over the pizza. The remaining slots are split into one pool of
//! [`PLATE_CAPACITY`] entries per supply plate; each pool keeps a counter of how many toppings are
//! currently stacked on its plate.
//!
//! Nothing in here knows about the engine. The [`Board`] is generic over the item it stores so the
//! game can keep entities in it while tests use plain integers.

use bevy::prelude::{Resource, Vec2};

use crate::error::BoardError;

/// Width and height of the grid laid over the pizza.
pub const GRID_SIZE: usize = 8;
pub const PIZZA_SQUARES: usize = GRID_SIZE * GRID_SIZE;
pub const PLATE_COUNT: usize = 4;
/// Pizza squares followed by one square per supply plate.
pub const SQUARE_COUNT: usize = PIZZA_SQUARES + PLATE_COUNT;
pub const PLATE_CAPACITY: usize = 20;
pub const PLATE_INITIAL_TOPPINGS: usize = 10;
pub const TOPPING_SLOTS: usize = PIZZA_SQUARES + PLATE_COUNT * PLATE_CAPACITY;

/// Grid squares cut away to round off the pizza. Each one is mirrored through the center.
const CROPPED_SQUARES: [usize; 6] = [0, 1, 6, 7, 8, 15];

/// Returns `true` if the grid square at `index` lies outside the pizza.
pub fn is_cropped(index: usize) -> bool {
    index < PIZZA_SQUARES
        && CROPPED_SQUARES
            .iter()
            .any(|&j| j == index || PIZZA_SQUARES - 1 - j == index)
}

/// Position of a square on the board plane.
///
/// Grid squares are unit cells centered on the pizza. Plate squares sit in a row behind it, five
/// units apart.
pub fn square_position(index: usize) -> Vec2 {
    if index >= PIZZA_SQUARES {
        let plate = (index % PIZZA_SQUARES) as f32;
        return Vec2::new(-8.0 + plate * 5.0, 8.0);
    }
    Vec2::new(
        (index % GRID_SIZE) as f32 - 3.5,
        (index / GRID_SIZE) as f32 - 3.5,
    )
}

/// A square that exists on the board: either an uncropped grid square or a plate square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(usize);

impl Square {
    pub fn new(index: usize) -> Option<Self> {
        (index < SQUARE_COUNT && !is_cropped(index)).then_some(Square(index))
    }

    /// The square on top of supply plate `plate`.
    pub fn plate_square(plate: usize) -> Option<Self> {
        if plate < PLATE_COUNT {
            Some(Square(PIZZA_SQUARES + plate))
        } else {
            None
        }
    }

    /// Iterates every square that exists, grid squares first.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..SQUARE_COUNT).filter_map(Square::new)
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn is_plate(self) -> bool {
        self.0 >= PIZZA_SQUARES
    }

    /// The plate this square belongs to, if it is a plate square.
    pub fn plate(self) -> Option<usize> {
        self.is_plate().then(|| self.0 - PIZZA_SQUARES)
    }

    pub fn position(self) -> Vec2 {
        square_position(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToppingKind {
    Mushroom,
    Pepperoni,
    Broccoli,
    Pepper,
}

impl ToppingKind {
    /// What each supply plate holds, indexed by plate.
    pub const PLATES: [ToppingKind; PLATE_COUNT] = [
        ToppingKind::Mushroom,
        ToppingKind::Pepperoni,
        ToppingKind::Broccoli,
        ToppingKind::Pepper,
    ];

    /// Inclusive upper bound of the roll passed to [`ToppingKind::roll`].
    pub const ROLL_MAX: u32 = 6;

    /// Maps a roll in `0..=ROLL_MAX` to the topping placed on a fresh pizza square. Most rolls
    /// leave the square empty.
    pub fn roll(roll: u32) -> Option<Self> {
        match roll {
            0 => Some(ToppingKind::Broccoli),
            1 => Some(ToppingKind::Pepperoni),
            2 => Some(ToppingKind::Mushroom),
            3 => Some(ToppingKind::Pepper),
            _ => None,
        }
    }

    /// File name of the model for this topping in the asset manifest.
    pub fn model_file(self) -> &'static str {
        match self {
            ToppingKind::Mushroom => "mushroom.obj",
            ToppingKind::Pepperoni => "pepperoni.obj",
            ToppingKind::Broccoli => "broccoli.obj",
            ToppingKind::Pepper => "paprikaSlice.obj",
        }
    }
}

/// The section of the slot array backing one supply plate. Entries `base..base + len` hold
/// toppings, the rest are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlatePool {
    base: usize,
    len: usize,
}

impl PlatePool {
    fn new(plate: usize) -> Self {
        PlatePool {
            base: PIZZA_SQUARES + plate * PLATE_CAPACITY,
            len: 0,
        }
    }

    /// First free entry.
    fn top(&self) -> usize {
        self.base + self.len
    }

    fn is_full(&self) -> bool {
        self.len == PLATE_CAPACITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    slot: usize,
    from: Square,
}

/// Where things ended up after letting go of a topping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release<T> {
    /// Nothing valid was highlighted; the topping goes back to the square it was grabbed from.
    Returned { item: T, home: Square },
    /// The topping was dropped on `to`. Whatever occupied that slot moved to the square the
    /// dragged topping came from.
    Dropped {
        item: T,
        to: Square,
        displaced: Option<(T, Square)>,
    },
}

/// Topping slots plus the highlight and drag state driven by the mouse.
#[derive(Debug, Clone, Resource)]
pub struct Board<T> {
    slots: Vec<Option<T>>,
    pools: [PlatePool; PLATE_COUNT],
    hovered: Option<Square>,
    drag: Option<Drag>,
}

impl<T: Copy> Default for Board<T> {
    fn default() -> Self {
        Board {
            slots: vec![None; TOPPING_SLOTS],
            pools: std::array::from_fn(PlatePool::new),
            hovered: None,
            drag: None,
        }
    }
}

impl<T: Copy> Board<T> {
    pub fn new() -> Self {
        Board::default()
    }

    /// Puts `item` on a grid square, returning whatever was there.
    pub fn place(&mut self, square: Square, item: T) -> Result<Option<T>, BoardError> {
        if square.is_plate() {
            return Err(BoardError::PlateSquare(square.index()));
        }
        Ok(self.slots[square.index()].replace(item))
    }

    /// Stacks `item` on a supply plate.
    pub fn stock(&mut self, plate: usize, item: T) -> Result<(), BoardError> {
        let pool = self
            .pools
            .get_mut(plate)
            .ok_or(BoardError::NoSuchPlate(plate))?;
        if pool.is_full() {
            return Err(BoardError::PlateFull(plate));
        }
        self.slots[pool.top()] = Some(item);
        pool.len += 1;
        Ok(())
    }

    /// The item stored at a raw slot index.
    pub fn slot(&self, slot: usize) -> Option<T> {
        self.slots.get(slot).copied().flatten()
    }

    /// The topping a grab on `square` would pick up.
    pub fn topping_at(&self, square: Square) -> Option<T> {
        match square.plate() {
            Some(plate) => {
                let pool = &self.pools[plate];
                if pool.len == 0 {
                    None
                } else {
                    self.slots[pool.top() - 1]
                }
            }
            None => self.slots[square.index()],
        }
    }

    /// Number of toppings stacked on `plate`.
    pub fn plate_len(&self, plate: usize) -> usize {
        self.pools.get(plate).map_or(0, |pool| pool.len)
    }

    /// Every stored item with its slot index.
    pub fn items(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.map(|item| (slot, item)))
    }

    /// The square a slot's topping rests on when it is not being dragged.
    pub fn home_square(slot: usize) -> Option<Square> {
        if slot < PIZZA_SQUARES {
            Square::new(slot)
        } else if slot < TOPPING_SLOTS {
            Square::plate_square((slot - PIZZA_SQUARES) / PLATE_CAPACITY)
        } else {
            None
        }
    }

    pub fn hover(&mut self, square: Option<Square>) {
        self.hovered = square;
    }

    pub fn hovered(&self) -> Option<Square> {
        self.hovered
    }

    /// The topping currently being dragged.
    pub fn dragging(&self) -> Option<T> {
        self.drag.and_then(|drag| self.slots[drag.slot])
    }

    /// Starts dragging the topping under the highlighted square.
    ///
    /// Grabbing from a plate takes the top of its stack. Nothing happens if no square is
    /// highlighted, the square is empty, or a drag is already in progress.
    pub fn grab(&mut self) -> Option<T> {
        if self.drag.is_some() {
            return None;
        }
        let square = self.hovered?;
        let item = self.topping_at(square)?;
        let slot = match square.plate() {
            Some(plate) => {
                let pool = &mut self.pools[plate];
                pool.len -= 1;
                pool.top()
            }
            None => square.index(),
        };
        self.drag = Some(Drag { slot, from: square });
        self.hovered = None;
        Some(item)
    }

    /// Lets go of the dragged topping over the highlighted square.
    ///
    /// Dropping on a grid square swaps with its occupant. Dropping on a plate pushes onto its
    /// stack; a full plate refuses the topping, which is then returned.
    pub fn release(&mut self) -> Option<Release<T>> {
        let drag = self.drag.take()?;
        let item = self.slots[drag.slot]?;

        let Some((to, target)) = self
            .hovered
            .and_then(|square| self.drop_slot(square).map(|slot| (square, slot)))
        else {
            if let Some(plate) = drag.from.plate() {
                self.pools[plate].len += 1;
            }
            return Some(Release::Returned {
                item,
                home: drag.from,
            });
        };

        self.slots.swap(drag.slot, target);
        if let Some(plate) = to.plate() {
            self.pools[plate].len += 1;
        }

        let displaced = if target == drag.slot {
            None
        } else {
            self.slots[drag.slot]
        };
        if displaced.is_some() {
            // The displaced topping now sits on top of the source plate's stack.
            if let Some(plate) = drag.from.plate() {
                self.pools[plate].len += 1;
            }
        }

        Some(Release::Dropped {
            item,
            to,
            displaced: displaced.map(|displaced| (displaced, drag.from)),
        })
    }

    fn drop_slot(&self, square: Square) -> Option<usize> {
        match square.plate() {
            Some(plate) => {
                let pool = &self.pools[plate];
                (!pool.is_full()).then(|| pool.top())
            }
            None => Some(square.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(index: usize) -> Square {
        Square::new(index).unwrap()
    }

    fn plate(p: usize) -> Square {
        Square::plate_square(p).unwrap()
    }

    fn stocked_board() -> Board<u32> {
        let mut board = Board::new();
        for p in 0..PLATE_COUNT {
            for i in 0..PLATE_INITIAL_TOPPINGS {
                board.stock(p, 100 * (p as u32 + 1) + i as u32).unwrap();
            }
        }
        board
    }

    fn drag(board: &mut Board<u32>, from: Square, to: Option<Square>) -> Option<Release<u32>> {
        board.hover(Some(from));
        board.grab()?;
        board.hover(to);
        board.release()
    }

    #[test]
    fn cropped_corners_are_mirrored() {
        let cropped: Vec<usize> = (0..PIZZA_SQUARES).filter(|&i| is_cropped(i)).collect();
        assert_eq!(cropped, vec![0, 1, 6, 7, 8, 15, 48, 55, 56, 57, 62, 63]);
        assert_eq!(Square::all().count(), SQUARE_COUNT - 12);
        assert!(Square::new(0).is_none());
        assert!(Square::new(SQUARE_COUNT).is_none());
    }

    #[test]
    fn square_positions() {
        assert_eq!(square_position(0), Vec2::new(-3.5, -3.5));
        assert_eq!(square_position(9), Vec2::new(-2.5, -2.5));
        assert_eq!(square_position(63), Vec2::new(3.5, 3.5));
        assert_eq!(square_position(64), Vec2::new(-8.0, 8.0));
        assert_eq!(square_position(67), Vec2::new(7.0, 8.0));
    }

    #[test]
    fn home_squares() {
        assert_eq!(Board::<u32>::home_square(9), Some(sq(9)));
        assert_eq!(Board::<u32>::home_square(64), Some(plate(0)));
        assert_eq!(Board::<u32>::home_square(83), Some(plate(0)));
        assert_eq!(Board::<u32>::home_square(84), Some(plate(1)));
        assert_eq!(Board::<u32>::home_square(143), Some(plate(3)));
        assert_eq!(Board::<u32>::home_square(144), None);
    }

    #[test]
    fn rolls_match_plate_kinds() {
        let rolled: Vec<_> = (0..=ToppingKind::ROLL_MAX)
            .filter_map(ToppingKind::roll)
            .collect();
        assert_eq!(rolled.len(), 4);
        for kind in ToppingKind::PLATES {
            assert!(rolled.contains(&kind));
        }
    }

    #[test]
    fn place_rejects_plate_square() {
        let mut board = Board::new();
        assert_eq!(
            board.place(plate(2), 1u32),
            Err(BoardError::PlateSquare(66))
        );
        assert_eq!(board.place(sq(9), 1), Ok(None));
        assert_eq!(board.place(sq(9), 2), Ok(Some(1)));
    }

    #[test]
    fn stock_is_bounded() {
        let mut board = Board::new();
        for i in 0..PLATE_CAPACITY as u32 {
            board.stock(1, i).unwrap();
        }
        assert_eq!(board.stock(1, 99), Err(BoardError::PlateFull(1)));
        assert_eq!(board.stock(PLATE_COUNT, 99), Err(BoardError::NoSuchPlate(4)));
        assert_eq!(board.plate_len(1), PLATE_CAPACITY);
    }

    #[test]
    fn grab_needs_highlight_and_topping() {
        let mut board = stocked_board();
        assert_eq!(board.grab(), None);
        board.hover(Some(sq(20)));
        assert_eq!(board.grab(), None);
        assert_eq!(board.hovered(), Some(sq(20)));

        board.place(sq(20), 7).unwrap();
        assert_eq!(board.grab(), Some(7));
        assert_eq!(board.hovered(), None);
        assert_eq!(board.dragging(), Some(7));

        // A second grab while dragging does nothing.
        board.hover(Some(sq(20)));
        assert_eq!(board.grab(), None);
    }

    #[test]
    fn swap_between_grid_squares() {
        let mut board = stocked_board();
        board.place(sq(20), 1).unwrap();
        board.place(sq(21), 2).unwrap();

        let release = drag(&mut board, sq(20), Some(sq(21)));
        assert_eq!(
            release,
            Some(Release::Dropped {
                item: 1,
                to: sq(21),
                displaced: Some((2, sq(20))),
            })
        );
        assert_eq!(board.slot(20), Some(2));
        assert_eq!(board.slot(21), Some(1));
    }

    #[test]
    fn move_to_empty_grid_square() {
        let mut board = stocked_board();
        board.place(sq(20), 1).unwrap();
        let release = drag(&mut board, sq(20), Some(sq(30)));
        assert_eq!(
            release,
            Some(Release::Dropped {
                item: 1,
                to: sq(30),
                displaced: None,
            })
        );
        assert_eq!(board.slot(20), None);
        assert_eq!(board.slot(30), Some(1));
    }

    #[test]
    fn drop_on_own_square_is_noop() {
        let mut board = stocked_board();
        board.place(sq(20), 1).unwrap();
        let release = drag(&mut board, sq(20), Some(sq(20)));
        assert_eq!(
            release,
            Some(Release::Dropped {
                item: 1,
                to: sq(20),
                displaced: None,
            })
        );
        assert_eq!(board.slot(20), Some(1));
    }

    #[test]
    fn take_from_plate_onto_pizza() {
        let mut board = stocked_board();
        let release = drag(&mut board, plate(0), Some(sq(20)));
        assert_eq!(
            release,
            Some(Release::Dropped {
                item: 109,
                to: sq(20),
                displaced: None,
            })
        );
        assert_eq!(board.plate_len(0), 9);
        assert_eq!(board.topping_at(plate(0)), Some(108));
        assert_eq!(board.slot(20), Some(109));
    }

    #[test]
    fn take_from_plate_onto_occupied_square() {
        let mut board = stocked_board();
        board.place(sq(20), 1).unwrap();
        let release = drag(&mut board, plate(1), Some(sq(20)));
        assert_eq!(
            release,
            Some(Release::Dropped {
                item: 209,
                to: sq(20),
                displaced: Some((1, plate(1))),
            })
        );
        // The displaced topping takes the freed entry on top of the plate.
        assert_eq!(board.plate_len(1), 10);
        assert_eq!(board.topping_at(plate(1)), Some(1));
    }

    #[test]
    fn put_topping_back_on_plate() {
        let mut board = stocked_board();
        board.place(sq(20), 1).unwrap();
        let release = drag(&mut board, sq(20), Some(plate(3)));
        assert_eq!(
            release,
            Some(Release::Dropped {
                item: 1,
                to: plate(3),
                displaced: None,
            })
        );
        assert_eq!(board.slot(20), None);
        assert_eq!(board.plate_len(3), 11);
        assert_eq!(board.topping_at(plate(3)), Some(1));
    }

    #[test]
    fn move_between_plates() {
        let mut board = stocked_board();
        let release = drag(&mut board, plate(0), Some(plate(2)));
        assert_eq!(
            release,
            Some(Release::Dropped {
                item: 109,
                to: plate(2),
                displaced: None,
            })
        );
        assert_eq!(board.plate_len(0), 9);
        assert_eq!(board.plate_len(2), 11);
        assert_eq!(board.topping_at(plate(2)), Some(109));
    }

    #[test]
    fn drop_back_on_same_plate() {
        let mut board = stocked_board();
        let release = drag(&mut board, plate(0), Some(plate(0)));
        assert_eq!(
            release,
            Some(Release::Dropped {
                item: 109,
                to: plate(0),
                displaced: None,
            })
        );
        assert_eq!(board.plate_len(0), 10);
        assert_eq!(board.topping_at(plate(0)), Some(109));
    }

    #[test]
    fn release_without_highlight_returns_home() {
        let mut board = stocked_board();
        let release = drag(&mut board, plate(2), None);
        assert_eq!(
            release,
            Some(Release::Returned {
                item: 309,
                home: plate(2),
            })
        );
        assert_eq!(board.plate_len(2), 10);
        assert_eq!(board.topping_at(plate(2)), Some(309));
        assert_eq!(board.release(), None);
    }

    #[test]
    fn full_plate_refuses_drop() {
        let mut board = stocked_board();
        for i in 0..(PLATE_CAPACITY - PLATE_INITIAL_TOPPINGS) as u32 {
            board.stock(1, 500 + i).unwrap();
        }
        board.place(sq(20), 1).unwrap();
        let release = drag(&mut board, sq(20), Some(plate(1)));
        assert_eq!(
            release,
            Some(Release::Returned {
                item: 1,
                home: sq(20),
            })
        );
        assert_eq!(board.slot(20), Some(1));
        assert_eq!(board.plate_len(1), PLATE_CAPACITY);
    }

    #[test]
    fn empty_plate_grab_leaves_counter() {
        let mut board = stocked_board();
        for _ in 0..PLATE_INITIAL_TOPPINGS {
            drag(&mut board, plate(3), Some(plate(0))).unwrap();
        }
        assert_eq!(board.plate_len(3), 0);
        board.hover(Some(plate(3)));
        assert_eq!(board.grab(), None);
        assert_eq!(board.plate_len(3), 0);
        assert_eq!(board.plate_len(0), PLATE_CAPACITY);
    }

    #[test]
    fn shuffling_preserves_items() {
        let mut board = stocked_board();
        for (i, square) in Square::all().filter(|s| !s.is_plate()).enumerate().step_by(3) {
            board.place(square, i as u32).unwrap();
        }
        let mut before: Vec<u32> = board.items().map(|(_, item)| item).collect();

        let squares: Vec<Square> = Square::all().collect();
        for step in 0..500 {
            let from = squares[(step * 7) % squares.len()];
            let to = (step % 5 != 0).then(|| squares[(step * 13 + 5) % squares.len()]);
            drag(&mut board, from, to);

            for p in 0..PLATE_COUNT {
                let len = board.plate_len(p);
                assert!(len <= PLATE_CAPACITY);
                let base = PIZZA_SQUARES + p * PLATE_CAPACITY;
                for slot in base..base + PLATE_CAPACITY {
                    assert_eq!(board.slot(slot).is_some(), slot < base + len);
                }
            }
            for index in (0..PIZZA_SQUARES).filter(|&i| is_cropped(i)) {
                assert_eq!(board.slot(index), None);
            }
        }

        let mut after: Vec<u32> = board.items().map(|(_, item)| item).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
    }
}
