//! The SOA record.
//!
//! The engine cares about SOA records more than about any other type:
//! they carry the zone serial, they bound every difference sequence, and
//! they are the one record the store re-serializes itself rather than
//! copying. This module models the SOA rdata and builds the stored-form
//! record the rest of the crate passes around.

use core::fmt;
use octseq::parse::Parser;

use super::iana::{Class, Rtype};
use super::name::Name;
use super::serial::Serial;
use super::wire::{rr_length, ParseError};

//------------ Soa -----------------------------------------------------------

/// SOA record data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: Serial,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Soa {
    /// Parses SOA rdata from a message.
    ///
    /// The names may be compressed; the parser must cover the whole
    /// message so pointers can be followed. The result is uncompressed.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<Octs>,
    ) -> Result<Self, ParseError> {
        Ok(Soa {
            mname: Name::from_wire(parser)?,
            rname: Name::from_wire(parser)?,
            serial: Serial::parse(parser)?,
            refresh: parser.parse_u32_be()?,
            retry: parser.parse_u32_be()?,
            expire: parser.parse_u32_be()?,
            minimum: parser.parse_u32_be()?,
        })
    }

    /// The length of the rdata in uncompressed form.
    #[must_use]
    pub fn rdlen(&self) -> u16 {
        (self.mname.len() + self.rname.len() + 20) as u16
    }

    /// Appends the rdata in uncompressed wire format.
    pub fn compose_rdata(&self, target: &mut Vec<u8>) {
        self.mname.compose(target);
        self.rname.compose(target);
        target.extend_from_slice(&self.serial.into_int().to_be_bytes());
        target.extend_from_slice(&self.refresh.to_be_bytes());
        target.extend_from_slice(&self.retry.to_be_bytes());
        target.extend_from_slice(&self.expire.to_be_bytes());
        target.extend_from_slice(&self.minimum.to_be_bytes());
    }

    /// Appends the whole record in the form used by the store.
    ///
    /// That is `apex`, type, class IN, `ttl`, rdata length, rdata, with
    /// every name uncompressed.
    pub fn compose_rr(&self, target: &mut Vec<u8>, apex: &Name, ttl: u32) {
        apex.compose(target);
        target.extend_from_slice(&Rtype::SOA.to_int().to_be_bytes());
        target.extend_from_slice(&Class::IN.to_int().to_be_bytes());
        target.extend_from_slice(&ttl.to_be_bytes());
        target.extend_from_slice(&self.rdlen().to_be_bytes());
        self.compose_rdata(target);
    }
}

//--- Display

impl fmt::Display for Soa {
    /// Formats the rdata in presentation format.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname,
            self.rname,
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum
        )
    }
}

//------------ Stored record inspection --------------------------------------

/// Returns the serial of a stored-form record if it is a SOA.
///
/// `rr` must be exactly one record in stored form. Used to recognize the
/// section terminators inside delta segments.
#[must_use]
pub fn stored_rr_serial(rr: &[u8]) -> Option<Serial> {
    let mut parser = Parser::from_ref(rr);
    Name::skip(&mut parser).ok()?;
    if parser.parse_u16_be().ok()? != Rtype::SOA.to_int() {
        return None;
    }
    // class, ttl, rdlen
    parser.advance(8).ok()?;
    Name::skip(&mut parser).ok()?;
    Name::skip(&mut parser).ok()?;
    Some(Serial(parser.parse_u32_be().ok()?))
}

/// Parses a single stored-form record into its parts.
///
/// Returns the owner, type, class, TTL and the rdata range within `rr`.
pub fn split_stored_rr(
    rr: &[u8],
) -> Result<(Name, Rtype, Class, u32, &[u8]), ParseError> {
    if rr_length(rr, 0) != Some(rr.len()) {
        return Err(ParseError::form_error("not a single stored record"));
    }
    let mut parser = Parser::from_ref(rr);
    let owner = Name::parse_uncompressed(&mut parser)?;
    let rtype = Rtype::from_int(parser.parse_u16_be()?);
    let class = Class::from_int(parser.parse_u16_be()?);
    let ttl = parser.parse_u32_be()?;
    let rdlen = usize::from(parser.parse_u16_be()?);
    let start = parser.pos();
    Ok((owner, rtype, class, ttl, &rr[start..start + rdlen]))
}

//============ Testing =======================================================
