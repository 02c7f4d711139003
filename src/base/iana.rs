//! DNS parameter value types.
//!
//! Newtypes over the raw wire integers for the record types, classes, and
//! response codes the engine deals in. Values outside the known set are
//! kept verbatim and presented in the `TYPE###`/`CLASS###` notation of
//! [RFC 3597].
//!
//! [RFC 3597]: https://tools.ietf.org/html/rfc3597

use core::fmt;
use core::str::FromStr;

//------------ Rtype ---------------------------------------------------------

/// A resource record type.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rtype(u16);

impl Rtype {
    /// A host address.
    pub const A: Rtype = Rtype(1);
    /// An authoritative name server.
    pub const NS: Rtype = Rtype(2);
    /// A mail destination (obsolete).
    pub const MD: Rtype = Rtype(3);
    /// A mail forwarder (obsolete).
    pub const MF: Rtype = Rtype(4);
    /// The canonical name for an alias.
    pub const CNAME: Rtype = Rtype(5);
    /// Marks the start of a zone of authority.
    pub const SOA: Rtype = Rtype(6);
    /// A mailbox domain name.
    pub const MB: Rtype = Rtype(7);
    /// A mail group member.
    pub const MG: Rtype = Rtype(8);
    /// A mail rename domain name.
    pub const MR: Rtype = Rtype(9);
    /// A domain name pointer.
    pub const PTR: Rtype = Rtype(12);
    /// Mailbox or mail list information.
    pub const MINFO: Rtype = Rtype(14);
    /// Mail exchange.
    pub const MX: Rtype = Rtype(15);
    /// Text strings.
    pub const TXT: Rtype = Rtype(16);
    /// An IPv6 host address.
    pub const AAAA: Rtype = Rtype(28);
    /// An incremental zone transfer.
    pub const IXFR: Rtype = Rtype(251);
    /// A transfer of an entire zone.
    pub const AXFR: Rtype = Rtype(252);

    /// Creates a record type value from its wire integer.
    #[must_use]
    pub const fn from_int(value: u16) -> Self {
        Rtype(value)
    }

    /// Returns the raw wire integer.
    #[must_use]
    pub const fn to_int(self) -> u16 {
        self.0
    }

    fn mnemonic(self) -> Option<&'static str> {
        match self {
            Rtype::A => Some("A"),
            Rtype::NS => Some("NS"),
            Rtype::MD => Some("MD"),
            Rtype::MF => Some("MF"),
            Rtype::CNAME => Some("CNAME"),
            Rtype::SOA => Some("SOA"),
            Rtype::MB => Some("MB"),
            Rtype::MG => Some("MG"),
            Rtype::MR => Some("MR"),
            Rtype::PTR => Some("PTR"),
            Rtype::MINFO => Some("MINFO"),
            Rtype::MX => Some("MX"),
            Rtype::TXT => Some("TXT"),
            Rtype::AAAA => Some("AAAA"),
            Rtype::IXFR => Some("IXFR"),
            Rtype::AXFR => Some("AXFR"),
            _ => None,
        }
    }
}

//--- From

impl From<u16> for Rtype {
    fn from(value: u16) -> Self {
        Rtype(value)
    }
}

impl From<Rtype> for u16 {
    fn from(value: Rtype) -> Self {
        value.0
    }
}

//--- FromStr and Display

impl FromStr for Rtype {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Rtype::A),
            "NS" => Ok(Rtype::NS),
            "MD" => Ok(Rtype::MD),
            "MF" => Ok(Rtype::MF),
            "CNAME" => Ok(Rtype::CNAME),
            "SOA" => Ok(Rtype::SOA),
            "MB" => Ok(Rtype::MB),
            "MG" => Ok(Rtype::MG),
            "MR" => Ok(Rtype::MR),
            "PTR" => Ok(Rtype::PTR),
            "MINFO" => Ok(Rtype::MINFO),
            "MX" => Ok(Rtype::MX),
            "TXT" => Ok(Rtype::TXT),
            "AAAA" => Ok(Rtype::AAAA),
            "IXFR" => Ok(Rtype::IXFR),
            "AXFR" => Ok(Rtype::AXFR),
            other => match other.strip_prefix("TYPE") {
                Some(num) => num
                    .parse::<u16>()
                    .map(Rtype)
                    .map_err(|_| UnknownMnemonic),
                None => Err(UnknownMnemonic),
            },
        }
    }
}

impl fmt::Display for Rtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mnemonic() {
            Some(m) => f.write_str(m),
            None => write!(f, "TYPE{}", self.0),
        }
    }
}

//------------ Class ---------------------------------------------------------

/// A record class.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Class(u16);

impl Class {
    /// The Internet class.
    pub const IN: Class = Class(1);
    /// The CSNET class (obsolete).
    pub const CS: Class = Class(2);
    /// The CHAOS class.
    pub const CH: Class = Class(3);
    /// The Hesiod class.
    pub const HS: Class = Class(4);

    /// Creates a class value from its wire integer.
    #[must_use]
    pub const fn from_int(value: u16) -> Self {
        Class(value)
    }

    /// Returns the raw wire integer.
    #[must_use]
    pub const fn to_int(self) -> u16 {
        self.0
    }
}

impl Default for Class {
    fn default() -> Self {
        Class::IN
    }
}

//--- From

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        Class(value)
    }
}

impl From<Class> for u16 {
    fn from(value: Class) -> Self {
        value.0
    }
}

//--- FromStr and Display

impl FromStr for Class {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(Class::IN),
            "CS" => Ok(Class::CS),
            "CH" => Ok(Class::CH),
            "HS" => Ok(Class::HS),
            other => match other.strip_prefix("CLASS") {
                Some(num) => num
                    .parse::<u16>()
                    .map(Class)
                    .map_err(|_| UnknownMnemonic),
                None => Err(UnknownMnemonic),
            },
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Class::IN => f.write_str("IN"),
            Class::CS => f.write_str("CS"),
            Class::CH => f.write_str("CH"),
            Class::HS => f.write_str("HS"),
            Class(value) => write!(f, "CLASS{}", value),
        }
    }
}

//------------ Rcode ---------------------------------------------------------

/// A response code.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rcode(u8);

impl Rcode {
    /// No error condition.
    pub const NOERROR: Rcode = Rcode(0);
    /// The server was unable to interpret the query.
    pub const FORMERR: Rcode = Rcode(1);
    /// A problem with the name server prevented an answer.
    pub const SERVFAIL: Rcode = Rcode(2);
    /// The queried domain name does not exist.
    pub const NXDOMAIN: Rcode = Rcode(3);
    /// The requested kind of query is not supported.
    pub const NOTIMP: Rcode = Rcode(4);
    /// The server refuses to answer for policy reasons.
    pub const REFUSED: Rcode = Rcode(5);
    /// The server is not authoritative for the zone.
    pub const NOTAUTH: Rcode = Rcode(9);

    /// Creates an rcode from the low four bits of the given integer.
    #[must_use]
    pub const fn from_int(value: u8) -> Self {
        Rcode(value & 0x0F)
    }

    /// Returns the raw integer.
    #[must_use]
    pub const fn to_int(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Rcode::NOERROR => f.write_str("NOERROR"),
            Rcode::FORMERR => f.write_str("FORMERR"),
            Rcode::SERVFAIL => f.write_str("SERVFAIL"),
            Rcode::NXDOMAIN => f.write_str("NXDOMAIN"),
            Rcode::NOTIMP => f.write_str("NOTIMP"),
            Rcode::REFUSED => f.write_str("REFUSED"),
            Rcode::NOTAUTH => f.write_str("NOTAUTH"),
            Rcode(value) => write!(f, "RCODE{}", value),
        }
    }
}

//------------ UnknownMnemonic -----------------------------------------------

/// A string did not name a known parameter value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnknownMnemonic;

impl fmt::Display for UnknownMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unknown mnemonic")
    }
}

impl std::error::Error for UnknownMnemonic {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rtype_names() {
        assert_eq!(Rtype::SOA.to_string(), "SOA");
        assert_eq!(Rtype::from_int(4711).to_string(), "TYPE4711");
        assert_eq!("soa".parse::<Rtype>(), Ok(Rtype::SOA));
        assert_eq!("TYPE4711".parse::<Rtype>(), Ok(Rtype::from_int(4711)));
        assert_eq!("TYPEX".parse::<Rtype>(), Err(UnknownMnemonic));
    }

    #[test]
    fn class_names() {
        assert_eq!(Class::IN.to_string(), "IN");
        assert_eq!(Class::from_int(17).to_string(), "CLASS17");
        assert_eq!("in".parse::<Class>(), Ok(Class::IN));
        assert_eq!("CLASS17".parse::<Class>(), Ok(Class::from_int(17)));
    }
}
