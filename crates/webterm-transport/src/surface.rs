//! The local rendering surface the transport draws into.

use webterm_core::{Geometry, ProposedDimensions};

/// A terminal widget capable of rendering PTY output.
///
/// Parsing escape sequences and mapping keys is the surface's business; the
/// transport only moves bytes and geometry.
pub trait RenderSurface: Send {
    /// Render raw PTY output.
    fn write(&mut self, bytes: &[u8]);

    /// Dimensions that would fill the available space.
    ///
    /// `None` when the surface cannot be measured. Values below 2 in either
    /// axis mean the surface is not laid out yet.
    fn propose_dimensions(&self) -> Option<ProposedDimensions>;

    /// Apply a geometry locally.
    fn resize(&mut self, geometry: Geometry);

    /// Geometry currently applied.
    fn geometry(&self) -> Geometry;

    /// Give the surface keyboard focus.
    fn focus(&mut self);
}
