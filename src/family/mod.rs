//! Relationship resolution over an in-memory snapshot of family members.
//!
//! Nothing here performs I/O or fails: handlers load the member list, build a
//! [`graph::FamilyGraph`] and ask it questions.

pub mod duplicates;
pub mod graph;
pub mod layout;
pub mod ordering;

pub use duplicates::{find_duplicates, DuplicateGroup, DuplicateReason};
pub use graph::{FamilyGraph, GenerationLayout};
pub use layout::{tree_view, TreeView};
pub use ordering::{plan_move, OrderChange};
