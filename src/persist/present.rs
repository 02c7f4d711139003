//! Stored records in zone presentation format.
//!
//! The data files keep one record per line, `owner ttl class type
//! rdata`. The common RFC 1035 types are written in their native rdata
//! syntax; everything else uses the unknown-record notation of
//! [RFC 3597] (`\# <length> <hex>`), which round-trips any rdata
//! unchanged. The parser accepts both notations for every type.
//!
//! [RFC 3597]: https://tools.ietf.org/html/rfc3597

use core::fmt::{self, Write as _};
use std::net::{Ipv4Addr, Ipv6Addr};

use octseq::parse::Parser;

use crate::base::iana::{Class, Rtype};
use crate::base::name::{Name, NameError};
use crate::base::soa::{split_stored_rr, Soa};
use crate::base::wire::ParseError;

//------------ fmt_rr --------------------------------------------------------

/// Formats a single stored-form record as one presentation line.
///
/// No trailing newline is produced.
pub fn fmt_rr(rr: &[u8], line: &mut String) -> Result<(), ParseError> {
    let (owner, rtype, class, ttl, rdata) = split_stored_rr(rr)?;
    write!(line, "{}\t{}\t{}\t{}\t", owner, ttl, class, rtype)
        .expect("writing to a string");
    if fmt_rdata(rtype, rdata, line).is_err() {
        // fall back to the unknown-record notation
        fmt_rdata_unknown(rdata, line);
    }
    Ok(())
}

fn fmt_rdata(
    rtype: Rtype,
    rdata: &[u8],
    line: &mut String,
) -> Result<(), ParseError> {
    let mut out = String::new();
    let mut parser = Parser::from_ref(rdata);
    match rtype {
        Rtype::A => {
            let mut octets = [0u8; 4];
            parser.parse_buf(&mut octets)?;
            write!(out, "{}", Ipv4Addr::from(octets))
        }
        Rtype::AAAA => {
            let mut octets = [0u8; 16];
            parser.parse_buf(&mut octets)?;
            write!(out, "{}", Ipv6Addr::from(octets))
        }
        Rtype::NS
        | Rtype::CNAME
        | Rtype::PTR
        | Rtype::MB
        | Rtype::MD
        | Rtype::MF
        | Rtype::MG
        | Rtype::MR => {
            write!(out, "{}", Name::parse_uncompressed(&mut parser)?)
        }
        Rtype::MINFO => {
            let rmailbx = Name::parse_uncompressed(&mut parser)?;
            let emailbx = Name::parse_uncompressed(&mut parser)?;
            write!(out, "{} {}", rmailbx, emailbx)
        }
        Rtype::MX => {
            let preference = parser.parse_u16_be()?;
            let exchange = Name::parse_uncompressed(&mut parser)?;
            write!(out, "{} {}", preference, exchange)
        }
        Rtype::SOA => {
            write!(out, "{}", Soa::parse(&mut parser)?)
        }
        Rtype::TXT => {
            if parser.remaining() == 0 {
                return Err(ParseError::ShortInput);
            }
            let mut first = true;
            while parser.remaining() > 0 {
                let len = usize::from(parser.parse_u8()?);
                let start = parser.pos();
                parser.advance(len)?;
                if !first {
                    out.push(' ');
                }
                first = false;
                fmt_charstr(&rdata[start..start + len], &mut out);
            }
            Ok(())
        }
        _ => return Err(ParseError::form_error("no native notation")),
    }
    .expect("writing to a string");
    if parser.remaining() != 0 {
        return Err(ParseError::form_error("trailing rdata"));
    }
    line.push_str(&out);
    Ok(())
}

fn fmt_rdata_unknown(rdata: &[u8], line: &mut String) {
    write!(line, "\\# {}", rdata.len()).expect("writing to a string");
    if !rdata.is_empty() {
        line.push(' ');
    }
    for octet in rdata {
        write!(line, "{:02x}", octet).expect("writing to a string");
    }
}

fn fmt_charstr(content: &[u8], out: &mut String) {
    out.push('"');
    for ch in content.iter().copied() {
        if ch == b'"' || ch == b'\\' {
            out.push('\\');
            out.push(ch as char);
        } else if !(0x20..0x7F).contains(&ch) {
            write!(out, "\\{:03}", ch).expect("writing to a string");
        } else {
            out.push(ch as char);
        }
    }
    out.push('"');
}

//------------ parse_rr ------------------------------------------------------

/// Parses one presentation line back into a stored-form record.
pub fn parse_rr(line: &str) -> Result<Vec<u8>, PresentError> {
    let mut tokens = Tokenizer::new(line);
    let owner: Name = tokens.word()?.parse()?;
    let ttl: u32 = tokens
        .word()?
        .parse()
        .map_err(|_| PresentError::expected("TTL"))?;
    let class: Class = tokens
        .word()?
        .parse()
        .map_err(|_| PresentError::expected("class"))?;
    let rtype: Rtype = tokens
        .word()?
        .parse()
        .map_err(|_| PresentError::expected("record type"))?;
    let rdata = parse_rdata(rtype, &mut tokens)?;
    if tokens.next()?.is_some() {
        return Err(PresentError::expected("end of line"));
    }

    let rdlen = u16::try_from(rdata.len())
        .map_err(|_| PresentError::expected("rdata under 64 KiB"))?;
    let mut rr = Vec::with_capacity(owner.len() + 10 + rdata.len());
    owner.compose(&mut rr);
    rr.extend_from_slice(&rtype.to_int().to_be_bytes());
    rr.extend_from_slice(&class.to_int().to_be_bytes());
    rr.extend_from_slice(&ttl.to_be_bytes());
    rr.extend_from_slice(&rdlen.to_be_bytes());
    rr.extend_from_slice(&rdata);
    Ok(rr)
}

fn parse_rdata(
    rtype: Rtype,
    tokens: &mut Tokenizer,
) -> Result<Vec<u8>, PresentError> {
    let mut rdata = Vec::new();
    let first_token = tokens
        .next()?
        .ok_or(PresentError::expected("rdata"))?;
    if let Token::Word(word) = &first_token {
        if *word == "\\#" {
            return parse_rdata_unknown(tokens);
        }
    }
    if let Rtype::TXT = rtype {
        let mut token = Some(first_token);
        loop {
            let content = match token {
                Some(Token::Word(word)) => unescape(word)?,
                Some(Token::Quoted(content)) => content,
                None => break,
            };
            if content.len() > 255 {
                return Err(PresentError::expected(
                    "string of up to 255 octets",
                ));
            }
            rdata.push(content.len() as u8);
            rdata.extend_from_slice(&content);
            token = tokens.next()?;
        }
        return Ok(rdata);
    }
    let Token::Word(first) = first_token else {
        return Err(PresentError::expected("unquoted rdata token"));
    };
    match rtype {
        Rtype::A => {
            let addr: Ipv4Addr = first
                .parse()
                .map_err(|_| PresentError::expected("IPv4 address"))?;
            rdata.extend_from_slice(&addr.octets());
        }
        Rtype::AAAA => {
            let addr: Ipv6Addr = first
                .parse()
                .map_err(|_| PresentError::expected("IPv6 address"))?;
            rdata.extend_from_slice(&addr.octets());
        }
        Rtype::NS
        | Rtype::CNAME
        | Rtype::PTR
        | Rtype::MB
        | Rtype::MD
        | Rtype::MF
        | Rtype::MG
        | Rtype::MR => {
            first.parse::<Name>()?.compose(&mut rdata);
        }
        Rtype::MINFO => {
            first.parse::<Name>()?.compose(&mut rdata);
            tokens.word()?.parse::<Name>()?.compose(&mut rdata);
        }
        Rtype::MX => {
            let preference: u16 = first
                .parse()
                .map_err(|_| PresentError::expected("preference"))?;
            rdata.extend_from_slice(&preference.to_be_bytes());
            tokens.word()?.parse::<Name>()?.compose(&mut rdata);
        }
        Rtype::SOA => {
            first.parse::<Name>()?.compose(&mut rdata);
            tokens.word()?.parse::<Name>()?.compose(&mut rdata);
            for _ in 0..5 {
                let value: u32 = tokens
                    .word()?
                    .parse()
                    .map_err(|_| PresentError::expected("number"))?;
                rdata.extend_from_slice(&value.to_be_bytes());
            }
        }
        _ => {
            return Err(PresentError::expected(
                "\\# notation for this record type",
            ));
        }
    }
    Ok(rdata)
}

fn parse_rdata_unknown(
    tokens: &mut Tokenizer,
) -> Result<Vec<u8>, PresentError> {
    let len: usize = tokens
        .word()?
        .parse()
        .map_err(|_| PresentError::expected("rdata length"))?;
    let mut rdata = Vec::with_capacity(len);
    let mut digit = None;
    while let Some(token) = tokens.next()? {
        let Token::Word(word) = token else {
            return Err(PresentError::expected("hex rdata"));
        };
        for ch in word.chars() {
            let value = ch
                .to_digit(16)
                .ok_or(PresentError::expected("hex digit"))?
                as u8;
            match digit.take() {
                None => digit = Some(value),
                Some(high) => rdata.push(high << 4 | value),
            }
        }
    }
    if digit.is_some() || rdata.len() != len {
        return Err(PresentError::expected("matching rdata length"));
    }
    Ok(rdata)
}

/// Resolves presentation escapes in an unquoted string token.
fn unescape(word: &str) -> Result<Vec<u8>, PresentError> {
    let mut out = Vec::with_capacity(word.len());
    let mut chars = word.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let esc = chars
                .next()
                .ok_or(PresentError::expected("escape sequence"))?;
            if esc.is_ascii_digit() {
                let mut value = esc.to_digit(10).unwrap();
                for _ in 0..2 {
                    let digit = chars
                        .next()
                        .and_then(|ch| ch.to_digit(10))
                        .ok_or(PresentError::expected(
                            "three digit escape",
                        ))?;
                    value = value * 10 + digit;
                }
                if value > 255 {
                    return Err(PresentError::expected(
                        "octet escape below 256",
                    ));
                }
                out.push(value as u8);
            } else if esc.is_ascii() {
                out.push(esc as u8);
            } else {
                return Err(PresentError::expected("ASCII escape"));
            }
        } else if ch.is_ascii() {
            out.push(ch as u8);
        } else {
            return Err(PresentError::expected("ASCII character"));
        }
    }
    Ok(out)
}

//------------ Tokenizer -----------------------------------------------------

/// Splits a presentation line into word and quoted-string tokens.
struct Tokenizer<'a> {
    rest: &'a str,
}

enum Token<'a> {
    /// A bare word, escapes unresolved.
    Word(&'a str),

    /// A quoted string with escapes resolved.
    Quoted(Vec<u8>),
}

impl<'a> Tokenizer<'a> {
    fn new(line: &'a str) -> Self {
        Tokenizer { rest: line }
    }

    /// Returns the next token, or `None` at the end of the line.
    fn next(&mut self) -> Result<Option<Token<'a>>, PresentError> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return Ok(None);
        }
        if let Some(rest) = self.rest.strip_prefix('"') {
            let mut content = Vec::new();
            let mut chars = rest.char_indices();
            loop {
                let (pos, ch) = chars.next().ok_or(
                    PresentError::expected("closing quote"),
                )?;
                match ch {
                    '"' => {
                        self.rest = &rest[pos + 1..];
                        return Ok(Some(Token::Quoted(content)));
                    }
                    '\\' => {
                        let (_, esc) = chars.next().ok_or(
                            PresentError::expected("escape sequence"),
                        )?;
                        if esc.is_ascii_digit() {
                            let mut value = esc.to_digit(10).unwrap();
                            for _ in 0..2 {
                                let digit = chars
                                    .next()
                                    .and_then(|(_, ch)| ch.to_digit(10))
                                    .ok_or(PresentError::expected(
                                        "three digit escape",
                                    ))?;
                                value = value * 10 + digit;
                            }
                            if value > 255 {
                                return Err(PresentError::expected(
                                    "octet escape below 256",
                                ));
                            }
                            content.push(value as u8);
                        } else if esc.is_ascii() {
                            content.push(esc as u8);
                        } else {
                            return Err(PresentError::expected(
                                "ASCII escape",
                            ));
                        }
                    }
                    ch if ch.is_ascii() => content.push(ch as u8),
                    _ => {
                        return Err(PresentError::expected(
                            "ASCII character",
                        ));
                    }
                }
            }
        }
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(Some(Token::Word(word)))
    }

    /// Returns the next token, which must be a bare word.
    fn word(&mut self) -> Result<&'a str, PresentError> {
        match self.next()? {
            Some(Token::Word(word)) => Ok(word),
            Some(Token::Quoted(_)) => {
                Err(PresentError::expected("unquoted token"))
            }
            None => Err(PresentError::expected("another token")),
        }
    }
}

//------------ PresentError --------------------------------------------------

/// A presentation format line was not acceptable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PresentError(&'static str);

impl PresentError {
    fn expected(what: &'static str) -> Self {
        PresentError(what)
    }
}

impl fmt::Display for PresentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected {}", self.0)
    }
}

impl std::error::Error for PresentError {}

impl From<NameError> for PresentError {
    fn from(_: NameError) -> Self {
        PresentError::expected("domain name")
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::Serial;

    fn mk_rr(
        owner: &str,
        rtype: Rtype,
        ttl: u32,
        rdata: &[u8],
    ) -> Vec<u8> {
        let owner: Name = owner.parse().unwrap();
        let mut rr = Vec::new();
        owner.compose(&mut rr);
        rr.extend_from_slice(&rtype.to_int().to_be_bytes());
        rr.extend_from_slice(&Class::IN.to_int().to_be_bytes());
        rr.extend_from_slice(&ttl.to_be_bytes());
        rr.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        rr.extend_from_slice(rdata);
        rr
    }

    fn round_trip(rr: &[u8]) -> String {
        let mut line = String::new();
        fmt_rr(rr, &mut line).unwrap();
        assert_eq!(
            parse_rr(&line).unwrap(),
            rr,
            "line was: {}",
            line
        );
        line
    }

    #[test]
    fn a_record() {
        let rr = mk_rr("www.example.com", Rtype::A, 300, &[192, 0, 2, 1]);
        let line = round_trip(&rr);
        assert_eq!(line, "www.example.com.\t300\tIN\tA\t192.0.2.1");
    }

    #[test]
    fn aaaa_record() {
        let mut rdata = [0u8; 16];
        rdata[0] = 0x20;
        rdata[1] = 0x01;
        rdata[2] = 0x0d;
        rdata[3] = 0xb8;
        rdata[15] = 1;
        let rr = mk_rr("www.example.com", Rtype::AAAA, 300, &rdata);
        let line = round_trip(&rr);
        assert_eq!(
            line,
            "www.example.com.\t300\tIN\tAAAA\t2001:db8::1"
        );
    }

    #[test]
    fn ns_record() {
        let target: Name = "ns1.example.com".parse().unwrap();
        let rr =
            mk_rr("example.com", Rtype::NS, 3600, target.as_slice());
        let line = round_trip(&rr);
        assert_eq!(
            line,
            "example.com.\t3600\tIN\tNS\tns1.example.com."
        );
    }

    #[test]
    fn mx_record() {
        let mut rdata = 10u16.to_be_bytes().to_vec();
        let target: Name = "mail.example.com".parse().unwrap();
        target.compose(&mut rdata);
        let rr = mk_rr("example.com", Rtype::MX, 3600, &rdata);
        let line = round_trip(&rr);
        assert_eq!(
            line,
            "example.com.\t3600\tIN\tMX\t10 mail.example.com."
        );
    }

    #[test]
    fn soa_record() {
        let soa = Soa {
            mname: "ns1.example.com".parse().unwrap(),
            rname: "hostmaster.example.com".parse().unwrap(),
            serial: Serial(2024010101),
            refresh: 3600,
            retry: 900,
            expire: 604800,
            minimum: 86400,
        };
        let mut rr = Vec::new();
        soa.compose_rr(
            &mut rr,
            &"example.com".parse().unwrap(),
            3600,
        );
        let line = round_trip(&rr);
        assert_eq!(
            line,
            "example.com.\t3600\tIN\tSOA\tns1.example.com. \
             hostmaster.example.com. 2024010101 3600 900 604800 86400"
        );
    }

    #[test]
    fn txt_record() {
        let rr = mk_rr(
            "example.com",
            Rtype::TXT,
            60,
            b"\x05hello\x0csay \"hi\" \\o/",
        );
        let line = round_trip(&rr);
        assert_eq!(
            line,
            "example.com.\t60\tIN\tTXT\t\"hello\" \"say \\\"hi\\\" \\\\o/\""
        );
    }

    #[test]
    fn txt_with_binary_content() {
        let rr = mk_rr("example.com", Rtype::TXT, 60, b"\x02\x00\xff");
        round_trip(&rr);
    }

    #[test]
    fn unknown_type_uses_generic_notation() {
        let rr = mk_rr(
            "example.com",
            Rtype::from_int(4711),
            60,
            &[0xde, 0xad, 0xbe, 0xef],
        );
        let line = round_trip(&rr);
        assert_eq!(
            line,
            "example.com.\t60\tIN\tTYPE4711\t\\# 4 deadbeef"
        );
    }

    #[test]
    fn empty_rdata_uses_generic_notation() {
        let rr = mk_rr("example.com", Rtype::from_int(4711), 60, &[]);
        let line = round_trip(&rr);
        assert_eq!(line, "example.com.\t60\tIN\tTYPE4711\t\\# 0");
    }

    #[test]
    fn generic_notation_accepted_for_known_type() {
        let rr = parse_rr("www.example.com. 300 IN A \\# 4 c0000201")
            .unwrap();
        assert_eq!(
            rr,
            mk_rr("www.example.com", Rtype::A, 300, &[192, 0, 2, 1])
        );
    }

    #[test]
    fn corrupt_native_rdata_falls_back_to_generic() {
        // an A record with a bad rdata length still renders
        let rr = mk_rr("www.example.com", Rtype::A, 300, &[1, 2]);
        let line = round_trip(&rr);
        assert_eq!(line, "www.example.com.\t300\tIN\tA\t\\# 2 0102");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_rr("").is_err());
        assert!(parse_rr("www.example.com. 300 IN").is_err());
        assert!(parse_rr("www.example.com. 300 IN A").is_err());
        assert!(parse_rr("www.example.com. 300 IN A not-an-ip").is_err());
        assert!(
            parse_rr("www.example.com. 300 IN A 192.0.2.1 extra").is_err()
        );
        assert!(parse_rr("www.example.com. x IN A 192.0.2.1").is_err());
        assert!(parse_rr("example.com. 60 IN TYPE1 \\# 3 0102").is_err());
    }
}
