//! Interfaces to the zone database.
//!
//! The engine does not own zone data. It asks the host server for the
//! little it needs through [`ZoneIxfrInfo`] and finds zones through
//! [`ZoneLookup`]; full zone transfers are delegated back to the host
//! through the fallback passed into
//! [`query_ixfr`][crate::serve::query_ixfr].

use crate::base::soa::stored_rr_serial;
use crate::base::{Name, Serial};
use crate::store::ZoneIxfr;

//------------ ZoneIxfrInfo --------------------------------------------------

/// The view of a single zone the engine works against.
pub trait ZoneIxfrInfo {
    /// Returns the apex name of the zone.
    fn apex(&self) -> &Name;

    /// Returns the zone's current SOA record in stored form.
    ///
    /// That is the full record with uncompressed names, exactly as the
    /// segments kept in [`ZoneIxfr`] hold it. `None` means the zone has
    /// no usable SOA and cannot be served.
    fn soa_rr(&self) -> Option<&[u8]>;

    /// Returns the zone's IXFR version chain, if it has one.
    fn ixfr(&self) -> Option<&ZoneIxfr>;

    /// Returns the serial of the zone's current version.
    fn current_serial(&self) -> Option<Serial> {
        self.soa_rr().and_then(stored_rr_serial)
    }

    /// Encodes the current SOA as the sole answer record into `packet`.
    ///
    /// This is the "up to date" reply of RFC 1995 section 2. A zone
    /// database that keeps compression state can override this to emit a
    /// compressed record; the default appends the stored form verbatim.
    /// Returns `false` if the record could not be encoded.
    fn encode_soa_answer(&self, packet: &mut Vec<u8>) -> bool {
        match self.soa_rr() {
            Some(rr) => {
                packet.extend_from_slice(rr);
                true
            }
            None => false,
        }
    }
}

//------------ ZoneLookup ----------------------------------------------------

/// Access to the set of zones the server is authoritative for.
pub trait ZoneLookup {
    type Zone: ZoneIxfrInfo;

    /// Returns the zone whose apex is exactly `qname`.
    fn find_zone(&self, qname: &Name) -> Option<&Self::Zone>;
}

//------------ QueryState ----------------------------------------------------

/// What the query loop should do with a request after the engine ran.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryState {
    /// The response packet is complete; no more packets will follow.
    Processed,

    /// An IXFR stream is in progress: send the current packet, then call
    /// the engine again with a fresh packet buffer.
    InIxfr,
}
