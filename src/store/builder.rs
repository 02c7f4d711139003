//! Building a delta during ingestion of a zone update.

use core::cmp;
use std::collections::TryReserveError;

use bytes::Bytes;
use octseq::parse::Parser;
use tracing::error;

use crate::base::iana::{Class, Rtype};
use crate::base::name::Name;
use crate::base::soa::Soa;
use crate::base::wire::ParseError;
use crate::base::Serial;
use crate::config::ZoneIxfrConfig;

use super::chain::ZoneIxfr;
use super::delta::IxfrDelta;

/// Initial space in the record buffers for storing records.
const STORE_INITIAL_SIZE: usize = 4096;

//------------ IxfrStore -----------------------------------------------------

/// Accumulates one delta while a zone update is being ingested.
///
/// The ingestion driver feeds the store the records of an incoming
/// transfer one by one: the two bounding SOAs through
/// [`add_newsoa`][Self::add_newsoa] and [`add_oldsoa`][Self::add_oldsoa],
/// everything else through [`del_rr`][Self::del_rr] and
/// [`add_rr`][Self::add_rr]. At the end, [`finish`][Self::finish] commits
/// the delta into the zone's chain.
///
/// Cancellation is sticky: once the store failed or was cancelled, every
/// further call is a no-op and `finish` discards the delta, so the
/// ingestion driver never needs to special-case a dead store.
#[derive(Debug)]
pub struct IxfrStore {
    state: State,
}

#[derive(Debug)]
enum State {
    Open(Box<Building>),
    Cancelled,
}

#[derive(Debug)]
struct Building {
    apex: Name,
    old_serial: Serial,
    new_serial: Serial,
    newsoa: Vec<u8>,
    oldsoa: Vec<u8>,
    del: Vec<u8>,
    add: Vec<u8>,
}

/// Which record segment a record goes into.
enum Section {
    Del,
    Add,
}

impl IxfrStore {
    /// Starts collecting a delta crossing `old_serial` to `new_serial`.
    #[must_use]
    pub fn start(
        apex: &Name,
        old_serial: Serial,
        new_serial: Serial,
    ) -> Self {
        IxfrStore {
            state: State::Open(Box::new(Building {
                apex: apex.clone(),
                old_serial,
                new_serial,
                newsoa: Vec::new(),
                oldsoa: Vec::new(),
                del: Vec::new(),
                add: Vec::new(),
            })),
        }
    }

    /// Cancels the store. Irrevocable and idempotent.
    pub fn cancel(&mut self) {
        self.state = State::Cancelled;
    }

    /// Returns whether the store has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.state, State::Cancelled)
    }

    /// Stores the SOA record bounding the new version.
    ///
    /// `ttl_pos` is the offset of the record's TTL field in `packet`; the
    /// rdata behind it may use name compression. A previously stored new
    /// SOA is replaced. The record is re-serialized with the zone apex as
    /// owner and uncompressed names.
    pub fn add_newsoa(&mut self, packet: &[u8], ttl_pos: usize) {
        let building = match self.state {
            State::Open(ref mut building) => building,
            State::Cancelled => return,
        };
        let mut parser = Parser::from_ref(packet);
        let res: Result<(u32, Soa), ParseError> = (|| {
            parser.seek(ttl_pos)?;
            let ttl = parser.parse_u32_be()?;
            let _rdlen = parser.parse_u16_be()?;
            let soa = Soa::parse(&mut parser)?;
            Ok((ttl, soa))
        })();
        match res {
            Ok((ttl, soa)) => {
                building.newsoa.clear();
                soa.compose_rr(&mut building.newsoa, &building.apex, ttl);
            }
            Err(err) => {
                error!("ixfr store newsoa: cannot parse packet: {}", err);
                self.cancel();
            }
        }
    }

    /// Stores the SOA record bounding the old version.
    ///
    /// `rdata_pos` is the offset of the record's rdata in `packet`.
    /// Seeing the old SOA is the signal that this transfer really is an
    /// IXFR, so this is also the point where room is made in the chain.
    pub fn add_oldsoa(
        &mut self,
        chain: &mut ZoneIxfr,
        config: &ZoneIxfrConfig,
        ttl: u32,
        packet: &[u8],
        rdata_pos: usize,
    ) {
        let size = match self.state {
            State::Open(ref building) => building.size(),
            State::Cancelled => return,
        };
        // we have the old SOA and thus we are sure this is an IXFR
        if !chain.make_space(size, config) {
            self.cancel();
            return;
        }
        let building = match self.state {
            State::Open(ref mut building) => building,
            State::Cancelled => return,
        };
        let mut parser = Parser::from_ref(packet);
        let res: Result<Soa, ParseError> = (|| {
            parser.seek(rdata_pos)?;
            Soa::parse(&mut parser)
        })();
        match res {
            Ok(soa) => {
                building.oldsoa.clear();
                soa.compose_rr(&mut building.oldsoa, &building.apex, ttl);
            }
            Err(err) => {
                error!("ixfr store oldsoa: cannot parse packet: {}", err);
                self.cancel();
            }
        }
    }

    /// Appends a record to the deleted records.
    #[allow(clippy::too_many_arguments)]
    pub fn del_rr(
        &mut self,
        chain: &mut ZoneIxfr,
        config: &ZoneIxfrConfig,
        owner: &Name,
        rtype: Rtype,
        class: Class,
        ttl: u32,
        packet: &[u8],
        rdata_pos: usize,
        rdlen: u16,
    ) {
        self.put_rr(
            chain, config, Section::Del, owner, rtype, class, ttl, packet,
            rdata_pos, rdlen,
        )
    }

    /// Appends a record to the added records.
    #[allow(clippy::too_many_arguments)]
    pub fn add_rr(
        &mut self,
        chain: &mut ZoneIxfr,
        config: &ZoneIxfrConfig,
        owner: &Name,
        rtype: Rtype,
        class: Class,
        ttl: u32,
        packet: &[u8],
        rdata_pos: usize,
        rdlen: u16,
    ) {
        self.put_rr(
            chain, config, Section::Add, owner, rtype, class, ttl, packet,
            rdata_pos, rdlen,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn put_rr(
        &mut self,
        chain: &mut ZoneIxfr,
        config: &ZoneIxfrConfig,
        section: Section,
        owner: &Name,
        rtype: Rtype,
        class: Class,
        ttl: u32,
        packet: &[u8],
        rdata_pos: usize,
        rdlen: u16,
    ) {
        if self.is_cancelled() {
            return;
        }
        // The SOA records are stored through separate calls and appended
        // during the finish operation.
        if rtype == Rtype::SOA {
            return;
        }
        {
            let size = match self.state {
                State::Open(ref building) => building.size(),
                State::Cancelled => return,
            };
            if !chain.make_space(size, config) {
                self.cancel();
                return;
            }
        }
        let building = match self.state {
            State::Open(ref mut building) => building,
            State::Cancelled => return,
        };

        // Re-serialize the rdata with any compressed names flattened.
        let mut rdata = Vec::with_capacity(usize::from(rdlen));
        let rdlen_uncompressed = match append_rdata_uncompressed(
            rtype, packet, rdata_pos, rdlen, &mut rdata,
        ) {
            Ok(len) => len,
            Err(err) => {
                error!("ixfr store rr: cannot parse packet: {}", err);
                self.cancel();
                return;
            }
        };

        let buf = match section {
            Section::Del => &mut building.del,
            Section::Add => &mut building.add,
        };
        let size =
            owner.len() + 10 + usize::from(rdlen_uncompressed);
        if make_room(buf, size).is_err() {
            error!("ixfr store rr: cannot allocate space");
            self.cancel();
            return;
        }
        owner.compose(buf);
        buf.extend_from_slice(&rtype.to_int().to_be_bytes());
        buf.extend_from_slice(&class.to_int().to_be_bytes());
        buf.extend_from_slice(&ttl.to_be_bytes());
        buf.extend_from_slice(&rdlen_uncompressed.to_be_bytes());
        buf.extend_from_slice(&rdata);
    }

    /// Commits the delta into the chain.
    ///
    /// Appends the new SOA as terminator of both record segments, trims
    /// the buffers to size, enforces the budgets one last time, and hands
    /// the delta to the chain. Returns whether the delta was published;
    /// a cancelled store discards it and returns `false`.
    pub fn finish(
        self,
        chain: &mut ZoneIxfr,
        config: &ZoneIxfrConfig,
        log_str: Option<String>,
    ) -> bool {
        let mut building = match self.state {
            State::Open(building) => building,
            State::Cancelled => return false,
        };
        if building.newsoa.is_empty() || building.oldsoa.is_empty() {
            error!("ixfr store finish: missing bounding SOA records");
            return false;
        }

        // put the new serial SOA record after the del and add records
        let newsoa = building.newsoa.clone();
        for buf in [&mut building.del, &mut building.add] {
            if make_room(buf, newsoa.len()).is_err() {
                error!("ixfr store finish: cannot allocate space");
                return false;
            }
            buf.extend_from_slice(&newsoa);
            // the capacity overhead is not worth keeping for the lifetime
            // of the delta
            buf.shrink_to_fit();
        }

        let Building {
            old_serial,
            new_serial,
            newsoa,
            oldsoa,
            del,
            add,
            ..
        } = *building;
        let delta = IxfrDelta::new(
            old_serial,
            new_serial,
            Bytes::from(newsoa),
            Bytes::from(oldsoa),
            Bytes::from(del),
            Bytes::from(add),
            log_str,
        );
        if !chain.make_space(delta.size(), config) {
            return false;
        }
        chain.add(delta);
        true
    }
}

impl Building {
    /// The delta's budget size as it stands.
    fn size(&self) -> u64 {
        (core::mem::size_of::<IxfrDelta>()
            + self.newsoa.len()
            + self.oldsoa.len()
            + self.del.len()
            + self.add.len()) as u64
    }
}

//------------ make_room -----------------------------------------------------

/// Grows a record buffer to hold `added` more bytes.
///
/// Buffers start out with 4096 bytes and double whenever they run out,
/// jumping straight to the needed size for a single oversized record.
fn make_room(
    buf: &mut Vec<u8>,
    added: usize,
) -> Result<(), TryReserveError> {
    let capacity = buf.capacity();
    let newsize = if capacity == 0 {
        STORE_INITIAL_SIZE
    } else if buf.len() + added <= capacity {
        return Ok(());
    } else {
        capacity * 2
    };
    let newsize = cmp::max(newsize, buf.len() + added);
    buf.try_reserve_exact(newsize - buf.len())
}

//------------ append_rdata_uncompressed -------------------------------------

/// Re-serializes rdata from a packet with all names uncompressed.
///
/// Only the well-known RFC 1035 types may carry compressed names in
/// their rdata; everything else is copied verbatim. Returns the length
/// of the uncompressed rdata.
fn append_rdata_uncompressed(
    rtype: Rtype,
    packet: &[u8],
    rdata_pos: usize,
    rdlen: u16,
    target: &mut Vec<u8>,
) -> Result<u16, ParseError> {
    let mut parser = Parser::from_ref(packet);
    parser.seek(rdata_pos)?;
    let end = rdata_pos + usize::from(rdlen);
    if end > packet.len() {
        return Err(ParseError::ShortInput);
    }
    match rtype {
        Rtype::NS
        | Rtype::CNAME
        | Rtype::PTR
        | Rtype::MB
        | Rtype::MD
        | Rtype::MF
        | Rtype::MG
        | Rtype::MR => {
            Name::from_wire(&mut parser)?.compose(target);
        }
        Rtype::MINFO => {
            Name::from_wire(&mut parser)?.compose(target);
            Name::from_wire(&mut parser)?.compose(target);
        }
        Rtype::MX => {
            target.extend_from_slice(
                &parser.parse_u16_be()?.to_be_bytes(),
            );
            Name::from_wire(&mut parser)?.compose(target);
        }
        Rtype::SOA => {
            Name::from_wire(&mut parser)?.compose(target);
            Name::from_wire(&mut parser)?.compose(target);
            let start = target.len();
            target.resize(start + 20, 0);
            parser.parse_buf(&mut target[start..])?;
        }
        _ => {
            let start = target.len();
            target.resize(start + usize::from(rdlen), 0);
            parser.parse_buf(&mut target[start..])?;
        }
    }
    if parser.pos() != end {
        return Err(ParseError::form_error("trailing rdata"));
    }
    u16::try_from(target.len())
        .map_err(|_| ParseError::form_error("rdata too long"))
}

//============ Testing =======================================================
