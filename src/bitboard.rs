//! A fixed-capacity bitboard implementation using const generics.
//!
//! The grid is stored row by row: `R` rows, each packed into one unsigned
//! integer `T`, so the column capacity is `T::BITS`. Boards of any size up to
//! that capacity can be tracked without heap allocation; callers that use a
//! smaller logical size simply never touch the remaining bits.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};
use core::{fmt, mem};
use num_traits::{PrimInt, Unsigned, Zero};

/// Errors returned by bitboard operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitBoardError {
    /// Row or column index is outside the board capacity.
    IndexOutOfBounds { row: usize, col: usize },
}

impl fmt::Display for BitBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitBoardError::IndexOutOfBounds { row, col } => {
                write!(f, "IndexOutOfBounds: row={}, col={}", row, col)
            }
        }
    }
}

/// A bitboard of `R` rows, each row stored in the unsigned integer `T`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitBoard<T, const R: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    rows: [T; R],
}

impl<T, const R: usize> BitBoard<T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    /// Number of columns a single row word can hold.
    pub const COLS: usize = mem::size_of::<T>() * 8;

    /// Create a new empty bitboard (all bits cleared).
    #[inline]
    pub fn new() -> Self {
        BitBoard {
            rows: [T::zero(); R],
        }
    }

    /// Returns the number of set bits (occupied cells).
    pub fn count_ones(&self) -> usize {
        self.rows.iter().map(|r| r.count_ones() as usize).sum()
    }

    /// Returns true if no bits are set.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_zero())
    }

    /// Gets the bit at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Result<bool, BitBoardError> {
        self.check_bounds(row, col)?;
        Ok(((self.rows[row] >> col) & T::one()) != T::zero())
    }

    /// Sets the bit at (row, col) to 1.
    pub fn set(&mut self, row: usize, col: usize) -> Result<(), BitBoardError> {
        self.check_bounds(row, col)?;
        self.rows[row] = self.rows[row] | (T::one() << col);
        Ok(())
    }

    /// Clears the bit at (row, col) to 0.
    pub fn clear(&mut self, row: usize, col: usize) -> Result<(), BitBoardError> {
        self.check_bounds(row, col)?;
        self.rows[row] = self.rows[row] & !(T::one() << col);
        Ok(())
    }

    /// Clears all bits to `0`.
    #[inline]
    pub fn clear_all(&mut self) {
        self.rows = [T::zero(); R];
    }

    #[inline]
    fn check_bounds(&self, row: usize, col: usize) -> Result<(), BitBoardError> {
        if row >= R || col >= Self::COLS {
            Err(BitBoardError::IndexOutOfBounds { row, col })
        } else {
            Ok(())
        }
    }

    /// Creates a bitboard from an iterator over `(row, col)` positions.
    pub fn from_cells<I>(iter: I) -> Result<Self, BitBoardError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut board = Self::new();
        for (r, c) in iter {
            board.set(r, c)?;
        }
        Ok(board)
    }

    /// Iterator over the set bits of the board in row-major order.
    #[inline]
    pub fn iter_set_bits(&self) -> SetBits<'_, T, R> {
        SetBits {
            board: self,
            row: 0,
            col: 0,
        }
    }
}

impl<T, const R: usize> Default for BitBoard<T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const R: usize> fmt::Debug for BitBoard<T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<_> = self.iter_set_bits().collect();
        f.debug_struct("BitBoard").field("set", &cells).finish()
    }
}

/// Iterator over the set bits of a bitboard.
#[derive(Clone, Copy)]
pub struct SetBits<'a, T, const R: usize>
where
    T: PrimInt + Unsigned + Zero,
{
    board: &'a BitBoard<T, R>,
    row: usize,
    col: usize,
}

impl<'a, T, const R: usize> Iterator for SetBits<'a, T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.row < R {
            let word = self.board.rows[self.row];
            // skip empty rows
            if word.is_zero() {
                self.row += 1;
                self.col = 0;
                continue;
            }
            while self.col < BitBoard::<T, R>::COLS {
                let col = self.col;
                self.col += 1;
                if ((word >> col) & T::one()) != T::zero() {
                    return Some((self.row, col));
                }
            }
            self.row += 1;
            self.col = 0;
        }
        None
    }
}

impl<T, const R: usize> BitAnd for BitBoard<T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitand(mut self, rhs: Self) -> Self {
        self &= rhs;
        self
    }
}

impl<T, const R: usize> BitOr for BitBoard<T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    fn bitor(mut self, rhs: Self) -> Self {
        self |= rhs;
        self
    }
}

impl<T, const R: usize> Not for BitBoard<T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    type Output = Self;
    #[inline]
    fn not(mut self) -> Self {
        for r in self.rows.iter_mut() {
            *r = !*r;
        }
        self
    }
}

impl<T, const R: usize> BitAndAssign for BitBoard<T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        for (l, r) in self.rows.iter_mut().zip(rhs.rows) {
            *l = *l & r;
        }
    }
}

impl<T, const R: usize> BitOrAssign for BitBoard<T, R>
where
    T: PrimInt + Unsigned + Zero,
{
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        for (l, r) in self.rows.iter_mut().zip(rhs.rows) {
            *l = *l | r;
        }
    }
}
