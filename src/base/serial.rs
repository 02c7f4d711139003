//! Serial numbers.
//!
//! Zone versions are tracked through the 32 bit serial number of the SOA
//! record, conceptually the modulus of a larger number space. [RFC 1982]
//! defines the arithmetic that follows from that. This module provides the
//! type [`Serial`] that implements these rules atop a native `u32`.
//!
//! [RFC 1982]: https://tools.ietf.org/html/rfc1982

use core::cmp::Ordering;
use core::{cmp, fmt, str};
use octseq::parse::Parser;

use super::wire::ParseError;

//------------ Serial --------------------------------------------------------

/// A serial number.
///
/// Serial numbers are compared using the sequence space arithmetic of
/// [RFC 1982]: a serial is larger than another if the distance going
/// forward from the other is less than half the number space. Because of
/// that, serial numbers only implement a partial ordering: two values that
/// are exactly `2^31` apart are not equal but neither is larger than the
/// other. This is neatly expressed by the [`PartialOrd`] trait, so the
/// type implements that and not [`Ord`].
///
/// Addition is only defined for amounts of up to `2^31 - 1`, which is why
/// there is a dedicated [`add`][Self::add] method rather than an [`Add`]
/// impl that could panic by surprise.
///
/// [`Add`]: core::ops::Add
/// [RFC 1982]: https://tools.ietf.org/html/rfc1982
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Serial(pub u32);

impl Serial {
    /// Creates a new serial number from its octets in big endian notation.
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    /// Returns the serial number as a raw integer.
    #[must_use]
    pub fn into_int(self) -> u32 {
        self.0
    }

    /// Add `other` to `self`.
    ///
    /// # Panics
    ///
    /// This method panics if `other` is greater than `2^31 - 1`.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn add(self, other: u32) -> Self {
        assert!(other <= 0x7FFF_FFFF);
        Serial(self.0.wrapping_add(other))
    }

    /// Returns whether `self` is at least as recent as `other`.
    ///
    /// This is the "same or newer version" test of RFC 1995 section 2: it
    /// is true on equality and when `self` is greater under RFC 1982
    /// comparison, and false when the comparison is undefined.
    #[must_use]
    pub fn at_least(self, other: Serial) -> bool {
        matches!(
            self.partial_cmp(&other),
            Some(Ordering::Equal) | Some(Ordering::Greater)
        )
    }
}

/// # Parsing
///
impl Serial {
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<Octs>,
    ) -> Result<Self, ParseError> {
        Ok(Self(parser.parse_u32_be()?))
    }
}

//--- From and FromStr

impl From<u32> for Serial {
    fn from(value: u32) -> Serial {
        Serial(value)
    }
}

impl From<Serial> for u32 {
    fn from(serial: Serial) -> u32 {
        serial.0
    }
}

impl str::FromStr for Serial {
    type Err = <u32 as str::FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <u32 as str::FromStr>::from_str(s).map(Into::into)
    }
}

//--- Display

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--- PartialOrd

impl cmp::PartialOrd for Serial {
    fn partial_cmp(&self, other: &Serial) -> Option<cmp::Ordering> {
        match self.0.cmp(&other.0) {
            Ordering::Equal => Some(Ordering::Equal),
            Ordering::Less => {
                let sub = other.0 - self.0;
                match sub.cmp(&0x8000_0000) {
                    Ordering::Less => Some(Ordering::Less),
                    Ordering::Greater => Some(Ordering::Greater),
                    Ordering::Equal => None,
                }
            }
            Ordering::Greater => {
                let sub = self.0 - other.0;
                match sub.cmp(&0x8000_0000) {
                    Ordering::Less => Some(Ordering::Greater),
                    Ordering::Greater => Some(Ordering::Less),
                    Ordering::Equal => None,
                }
            }
        }
    }
}

//============ Testing =======================================================
