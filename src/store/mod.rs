//! The version history of a zone.
//!
//! Every time a zone moves from one version to the next, the difference
//! can be captured as an [`IxfrDelta`]: the records deleted, the records
//! added, and the two SOA records bounding the change. A zone's deltas
//! are kept in a [`ZoneIxfr`], an ordered chain in which each delta's new
//! serial is the next delta's old serial, so that any stored version can
//! be upgraded to the current one by replaying the chain forward.
//!
//! Deltas are built during ingestion of a zone update through an
//! [`IxfrStore`], which accumulates records into growing buffers and
//! either commits the finished delta into the chain or cancels and
//! leaves the chain untouched. The chain enforces the per-zone count and
//! size budgets by evicting its oldest entries.

mod builder;
mod chain;
mod delta;

pub use self::builder::IxfrStore;
pub use self::chain::ZoneIxfr;
pub use self::delta::IxfrDelta;
