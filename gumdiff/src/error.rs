use facet::Facet;

/// Errors surfaced by the diff pipeline and by edit-script replay.
///
/// Broken algorithm invariants are not represented here: they panic.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum DiffError {
    /// matcher `{name}` is not implemented
    UnimplementedMatcher { name: String },
    /// node {index} does not exist in the tree being edited
    UnknownNode { index: usize },
    /// insert allocated node {actual}, but the script expected node {expected}
    InsertMismatch { expected: usize, actual: usize },
    /// position {position} is out of bounds for a parent with {len} children
    PositionOutOfBounds { position: usize, len: usize },
}
