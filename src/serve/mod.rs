//! Generating IXFR responses.
//!
//! The entry point is [`query_ixfr`]: given a request that the query loop
//! has classified as an IXFR query, it either produces a complete
//! response packet right away (up to date, error, or delegated to the
//! AXFR fallback) or begins streaming the difference sequences of the
//! zone's chain across as many packets as needed.
//!
//! Streaming is cooperative. Each call fills one packet and returns
//! [`QueryState::InIxfr`]; the outer loop sends the packet and calls
//! again, until a call finds the stream finished and returns
//! [`QueryState::Processed`]. All continuation state lives in the
//! [`IxfrQuery`], so the loop may interleave any number of other
//! requests between packets.

use tracing::debug;

use crate::base::header::{Header, HeaderCounts, HEADER_LEN};
use crate::base::iana::{Rcode, Rtype};
use crate::base::name::Name;
use crate::base::wire::ParseError;
use crate::base::Serial;
use crate::zone::{QueryState, ZoneIxfrInfo, ZoneLookup};

use self::responder::IxfrResponseState;

mod responder;

/// For optimal compression IXFR response packets are limited in size to
/// the maximum name compression offset.
pub const IXFR_MAX_MESSAGE_LEN: usize = 16384;

/// TSIG sign every N packets. Zero means sign every packet, which is
/// what draft-ietf-dnsop-rfc2845bis section 5.3.1 says to do.
pub const TSIG_SIGN_EVERY_NTH: u32 = 0;

//------------ IxfrQuery -----------------------------------------------------

/// One IXFR request and the response being generated for it.
///
/// Owns the packet buffer: it arrives holding the request and is rewritten
/// in place into each successive response packet. After every call to
/// [`query_ixfr`] the buffer holds the packet to send.
#[derive(Clone, Debug)]
pub struct IxfrQuery {
    /// The packet buffer, request first, then each response packet.
    packet: Vec<u8>,

    /// Whether the request arrived over TCP.
    tcp: bool,

    /// The maximum size of a response packet.
    maxlen: usize,

    /// Whether the request was TSIG signed and responses will be too.
    tsig_active: bool,

    /// Responses signed since the last multi-message signature point.
    /// Maintained by the host's TSIG layer; only consulted when
    /// [`TSIG_SIGN_EVERY_NTH`] is non-zero.
    tsig_updates_since_prepare: u32,

    /// TSIG intent: sign the packet about to be sent.
    sign_it: bool,

    /// TSIG intent: remember this packet's MAC for the next signature.
    prepare_it: bool,

    /// TSIG intent: include this packet in the rolling MAC.
    update_it: bool,

    /// The streaming state, once the request has been admitted.
    state: Option<IxfrResponseState>,

    /// The response is complete.
    done: bool,
}

impl IxfrQuery {
    /// Creates the request state around a received packet.
    #[must_use]
    pub fn new(
        packet: Vec<u8>,
        tcp: bool,
        maxlen: usize,
        tsig_active: bool,
    ) -> Self {
        IxfrQuery {
            packet,
            tcp,
            maxlen,
            tsig_active,
            tsig_updates_since_prepare: 0,
            sign_it: false,
            prepare_it: false,
            update_it: false,
            state: None,
            done: false,
        }
    }

    /// Returns the current packet content.
    #[must_use]
    pub fn packet(&self) -> &[u8] {
        &self.packet
    }

    /// Whether the packet about to be sent must carry a TSIG signature.
    #[must_use]
    pub fn sign_it(&self) -> bool {
        self.sign_it
    }

    /// Whether the TSIG layer must store this packet's MAC as the basis
    /// of the next signature.
    #[must_use]
    pub fn prepare_it(&self) -> bool {
        self.prepare_it
    }

    /// Whether the TSIG layer must roll this packet into the running MAC.
    #[must_use]
    pub fn update_it(&self) -> bool {
        self.update_it
    }

    /// Updates the signed-packet counter kept by the TSIG layer.
    pub fn set_tsig_updates_since_prepare(&mut self, value: u32) {
        self.tsig_updates_since_prepare = value
    }

    fn header_mut(&mut self) -> &mut Header {
        Header::for_message_slice_mut(&mut self.packet)
    }

    fn counts_mut(&mut self) -> &mut HeaderCounts {
        HeaderCounts::for_message_slice_mut(&mut self.packet)
    }

    /// Finishes the response as an error with the given rcode.
    fn set_error(&mut self, rcode: Rcode) -> QueryState {
        self.header_mut().set_rcode(rcode);
        self.done = true;
        QueryState::Processed
    }
}

//------------ query_ixfr ----------------------------------------------------

/// Processes an IXFR query, one response packet per call.
///
/// On the first call the request in the query's packet buffer is parsed
/// and admitted; later calls continue a running stream. `start_axfr` is
/// invoked instead of answering when the zone cannot be served
/// incrementally, per RFC 1995 section 4.
pub fn query_ixfr<Z: ZoneLookup>(
    query: &mut IxfrQuery,
    zones: &Z,
    start_axfr: impl FnOnce(&mut IxfrQuery) -> QueryState,
) -> QueryState {
    if query.done {
        return QueryState::Processed;
    }

    if query.maxlen > IXFR_MAX_MESSAGE_LEN {
        query.maxlen = IXFR_MAX_MESSAGE_LEN;
    }

    // only keep running values for most packets
    query.prepare_it = false;
    query.update_it = true;
    if query.sign_it {
        // prepare for next updates
        query.prepare_it = true;
        query.sign_it = false;
    }

    if query.state.is_none() {
        // This is the first packet, process the query further.
        let request = match parse_qserial(&query.packet) {
            Ok(request) => request,
            Err(snip_pos) => {
                query.packet.truncate(snip_pos);
                if query.packet.len() < HEADER_LEN {
                    query.packet.resize(HEADER_LEN, 0);
                }
                query.counts_mut().set_nscount(0);
                query.counts_mut().set_arcount(0);
                query.header_mut().set_qr(true);
                return query.set_error(Rcode::FORMERR);
            }
        };

        // snip off the authority section before answering
        query.packet.truncate(request.snip_pos);
        query.counts_mut().set_nscount(0);
        query.counts_mut().set_arcount(0);
        query.header_mut().set_qr(true);
        debug!(
            "ixfr query routine, {} IXFR={}",
            request.qname, request.qserial
        );

        // do we have an IXFR with this serial number? If not, serve AXFR
        let Some(zone) = zones.find_zone(&request.qname) else {
            return query.set_error(Rcode::NOTAUTH);
        };

        // if the query is for the same or newer serial than our current
        // serial, serve a single SOA with our current serial
        let current_serial =
            zone.current_serial().unwrap_or(Serial(0));
        if request.qserial.at_least(current_serial) {
            if zone.soa_rr().is_none() {
                return query.set_error(Rcode::SERVFAIL);
            }
            if !zone.encode_soa_answer(&mut query.packet) {
                return query.set_error(Rcode::SERVFAIL);
            }
            query.counts_mut().set_ancount(1);
            query.header_mut().set_aa(true);
            query.done = true;
            return QueryState::Processed;
        }

        let Some(chain) = zone.ixfr() else {
            // we have no ixfr information for the zone, make an AXFR
            return start_axfr(query);
        };
        if chain.find(request.qserial).is_none() {
            // the specific version is not available, make an AXFR
            return start_axfr(query);
        }
        // see if the deltas connect up to the current served zone
        if chain.connected(request.qserial) != Some(current_serial) {
            return start_axfr(query);
        }

        query.state =
            Some(IxfrResponseState::new(chain, request.qserial));
        if query.tsig_active {
            // sign the first packet in the stream
            query.sign_it = true;
        }
    } else {
        // The query name need not be repeated after the first response
        // packet.
        query.packet.truncate(HEADER_LEN);
        query.counts_mut().set_qdcount(0);
        query.header_mut().set_qr(true);
    }

    let state = query.state.as_mut().expect("admitted above");
    let (total_added, finished) =
        state.pack(&mut query.packet, query.maxlen);
    let pos_of_newsoa = state.pos_of_newsoa;
    if finished {
        // sign the last packet
        query.sign_it = true;
        query.done = true;
    }

    // return the answer
    query.header_mut().set_aa(true);
    query.counts_mut().set_ancount(total_added);
    query.counts_mut().set_nscount(0);
    query.counts_mut().set_arcount(0);

    if !query.tcp && !query.done {
        query.header_mut().set_tc(true);
        if let Some(pos) = pos_of_newsoa {
            // the whole IXFR does not fit; the RFC 1995 response for
            // that case is only the latest SOA
            query.packet.truncate(pos);
            query.counts_mut().set_ancount(1);
        }
        query.done = true;
    }

    // check if it needs tsig signatures
    if query.tsig_active
        && (TSIG_SIGN_EVERY_NTH == 0
            || query.tsig_updates_since_prepare >= TSIG_SIGN_EVERY_NTH)
    {
        query.sign_it = true;
    }

    QueryState::InIxfr
}

//------------ parse_qserial -------------------------------------------------

/// A parsed IXFR request.
struct IxfrRequest {
    qname: Name,
    qserial: Serial,
    snip_pos: usize,
}

/// Parses the serial number from an IXFR query.
///
/// The query must carry exactly one question and the client's SOA in the
/// authority section; the serial of the first SOA found there is the
/// client's version. On success also returns the offset directly behind
/// the question, where the response content will be written. On failure
/// returns the offset to truncate the packet to for the error response.
fn parse_qserial(packet: &[u8]) -> Result<IxfrRequest, usize> {
    use octseq::parse::Parser;

    if packet.len() < HEADER_LEN {
        return Err(packet.len());
    }
    let counts = HeaderCounts::for_message_slice(packet);
    // we must have a SOA in the authority section
    if counts.nscount() == 0 {
        return Err(HEADER_LEN);
    }
    // skip over the question section, we want only one
    if counts.qdcount() != 1 {
        return Err(HEADER_LEN);
    }
    let mut parser = Parser::from_ref(packet);
    let res: Result<(Name, usize), ParseError> = (|| {
        parser.seek(HEADER_LEN)?;
        let qname = Name::from_wire(&mut parser)?;
        parser.advance(4)?;
        Ok((qname, parser.pos()))
    })();
    let Ok((qname, snip_pos)) = res else {
        return Err(HEADER_LEN);
    };

    // skip over the authority section records until we find the SOA
    let res: Result<Option<Serial>, ParseError> = (|| {
        for _ in 0..counts.nscount() {
            Name::skip(&mut parser)?;
            let rtype = Rtype::from_int(parser.parse_u16_be()?);
            // class, ttl
            parser.advance(6)?;
            let rdlen = parser.parse_u16_be()?;
            if usize::from(rdlen) > parser.remaining() {
                return Err(ParseError::ShortInput);
            }
            if rtype == Rtype::SOA {
                // read the serial from the rdata: skip two names, then
                // read the 32 bit value
                Name::skip(&mut parser)?;
                Name::skip(&mut parser)?;
                return Ok(Some(Serial(parser.parse_u32_be()?)));
            }
            parser.advance(usize::from(rdlen))?;
        }
        Ok(None)
    })();
    match res {
        Ok(Some(qserial)) => Ok(IxfrRequest {
            qname,
            qserial,
            snip_pos,
        }),
        _ => Err(snip_pos),
    }
}
