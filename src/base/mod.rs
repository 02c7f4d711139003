//! Fundamental DNS types used throughout the engine.
//!
//! Everything the engine stores is kept in uncompressed wire format, so
//! this module deliberately contains no name compression tables: names are
//! parsed out of (possibly compressed) received packets once, stored flat,
//! and re-emitted verbatim.

pub mod header;
pub mod iana;
pub mod name;
pub mod serial;
pub mod soa;
pub mod wire;

pub use self::header::{Header, HeaderCounts, HEADER_LEN};
pub use self::iana::{Class, Rcode, Rtype};
pub use self::name::Name;
pub use self::serial::Serial;
pub use self::soa::Soa;
pub use self::wire::{FormError, ParseError};
