//! An incremental zone transfer engine for authoritative name servers.
//!
//! This crate implements the server side of IXFR ([RFC 1995]): it records
//! the sequence of differences between successive versions of a zone,
//! serves those differences to secondary name servers over DNS/TCP (and
//! DNS/UDP with truncation), and persists them across restarts as numbered
//! sibling files of the zone file.
//!
//! The crate is an engine, not a server. Network I/O, zone data, TSIG
//! signing, and full zone transfers ([RFC 5936]) live with the caller; the
//! seams to them are the traits in [`zone`]. What the crate owns is the
//! version history and everything needed to turn it into response packets:
//!
//! * [`base`] contains the fundamental DNS types the engine works with:
//!   serial numbers with [RFC 1982] arithmetic, uncompressed wire-format
//!   names, the message header, and the walker over stored record
//!   segments.
//! * [`store`] holds the version history: one [`IxfrDelta`] per zone
//!   update, collected into a per-zone [`ZoneIxfr`] chain, built up during
//!   ingestion by an [`IxfrStore`].
//! * [`serve`] answers IXFR queries from the chain, streaming records
//!   across as many response packets as needed.
//! * [`persist`] writes each delta to a numbered `<zonefile>.ixfr` file
//!   and reads them back at startup.
//!
//! [RFC 1982]: https://tools.ietf.org/html/rfc1982
//! [RFC 1995]: https://tools.ietf.org/html/rfc1995
//! [RFC 5936]: https://tools.ietf.org/html/rfc5936
//! [`IxfrDelta`]: store::IxfrDelta
//! [`ZoneIxfr`]: store::ZoneIxfr
//! [`IxfrStore`]: store::IxfrStore

pub mod base;
pub mod config;
pub mod persist;
pub mod serve;
pub mod store;
pub mod zone;
