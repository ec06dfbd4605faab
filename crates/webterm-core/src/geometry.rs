//! Terminal geometry.

use crate::{Error, Result};

/// Terminal geometry in character cells.
///
/// Always at least [`Geometry::MIN_COLS`] x [`Geometry::MIN_ROWS`]. The remote
/// PTY cannot use anything smaller, so such a value never leaves the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    cols: u16,
    rows: u16,
}

impl Geometry {
    /// Smallest column count a geometry may hold.
    pub const MIN_COLS: u16 = 2;
    /// Smallest row count a geometry may hold.
    pub const MIN_ROWS: u16 = 2;

    /// Create a geometry, rejecting values below the 2x2 floor.
    pub fn new(cols: u16, rows: u16) -> Result<Self> {
        if cols < Self::MIN_COLS || rows < Self::MIN_ROWS {
            return Err(Error::InvalidDimensions { cols, rows });
        }
        Ok(Self { cols, rows })
    }

    /// Number of columns.
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// The same geometry one column narrower, if that is still valid.
    pub fn narrowed(&self) -> Option<Self> {
        Self::new(self.cols - 1, self.rows).ok()
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Unchecked dimensions proposed by a render surface.
///
/// A surface that is not laid out yet may report 0 or 1 in either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposedDimensions {
    /// Proposed columns
    pub cols: u16,
    /// Proposed rows
    pub rows: u16,
}

impl ProposedDimensions {
    /// Create a new proposal.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl TryFrom<ProposedDimensions> for Geometry {
    type Error = Error;

    fn try_from(proposed: ProposedDimensions) -> Result<Self> {
        Geometry::new(proposed.cols, proposed.rows)
    }
}
