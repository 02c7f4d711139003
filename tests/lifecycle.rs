//! End to end: ingest a transfer, serve it, persist it, recover it.

use std::path::PathBuf;

use ixfr::base::header::{Header, HeaderCounts, HEADER_LEN};
use ixfr::base::iana::{Class, Rtype};
use ixfr::base::name::Name;
use ixfr::base::soa::{stored_rr_serial, Soa};
use ixfr::base::wire::rr_length;
use ixfr::base::Serial;
use ixfr::config::ZoneIxfrConfig;
use ixfr::persist;
use ixfr::serve::{query_ixfr, IxfrQuery};
use ixfr::store::{IxfrStore, ZoneIxfr};
use ixfr::zone::{QueryState, ZoneIxfrInfo, ZoneLookup};

fn apex() -> Name {
    "example.com".parse().unwrap()
}

fn mk_soa(serial: u32) -> Soa {
    Soa {
        mname: "ns1.example.com".parse().unwrap(),
        rname: "hostmaster.example.com".parse().unwrap(),
        serial: Serial(serial),
        refresh: 3600,
        retry: 900,
        expire: 604800,
        minimum: 86400,
    }
}

fn soa_rr_bytes(serial: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    mk_soa(serial).compose_rr(&mut buf, &apex(), 3600);
    buf
}

struct Zone {
    apex: Name,
    soa: Vec<u8>,
    ixfr: ZoneIxfr,
}

impl ZoneIxfrInfo for Zone {
    fn apex(&self) -> &Name {
        &self.apex
    }

    fn soa_rr(&self) -> Option<&[u8]> {
        Some(&self.soa)
    }

    fn ixfr(&self) -> Option<&ZoneIxfr> {
        Some(&self.ixfr)
    }
}

struct Zones(Zone);

impl ZoneLookup for Zones {
    type Zone = Zone;

    fn find_zone(&self, qname: &Name) -> Option<&Zone> {
        (self.0.apex == *qname).then_some(&self.0)
    }
}

/// Ingests one update: a couple of hosts change their addresses.
fn ingest_delta(chain: &mut ZoneIxfr, config: &ZoneIxfrConfig, old: u32, new: u32) {
    let mut store = IxfrStore::start(&apex(), Serial(old), Serial(new));
    let newsoa = soa_rr_bytes(new);
    store.add_newsoa(&newsoa, apex().len() + 4);
    let oldsoa = soa_rr_bytes(old);
    store.add_oldsoa(chain, config, 3600, &oldsoa, apex().len() + 10);
    for host in 0..3u8 {
        let owner: Name = format!("host{}.example.com", host).parse().unwrap();
        store.del_rr(
            chain,
            config,
            &owner,
            Rtype::A,
            Class::IN,
            300,
            &[10, 0, old as u8, host],
            0,
            4,
        );
        store.add_rr(
            chain,
            config,
            &owner,
            Rtype::A,
            Class::IN,
            300,
            &[10, 0, new as u8, host],
            0,
            4,
        );
    }
    assert!(store.finish(chain, config, Some(format!("{} -> {}", old, new))));
}

fn build_request(qserial: u32) -> Vec<u8> {
    let mut packet = vec![0u8; HEADER_LEN];
    Header::for_message_slice_mut(&mut packet).set_id(4711);
    {
        let counts = HeaderCounts::for_message_slice_mut(&mut packet);
        counts.set_qdcount(1);
        counts.set_nscount(1);
    }
    apex().compose(&mut packet);
    packet.extend_from_slice(&Rtype::IXFR.to_int().to_be_bytes());
    packet.extend_from_slice(&Class::IN.to_int().to_be_bytes());
    mk_soa(qserial).compose_rr(&mut packet, &apex(), 3600);
    packet
}

/// Collects the answer records of a response packet.
fn answer_rrs(packet: &[u8]) -> Vec<Vec<u8>> {
    let counts = HeaderCounts::for_message_slice(packet);
    let mut pos = HEADER_LEN;
    if counts.qdcount() == 1 {
        while packet[pos] != 0 {
            pos += 1 + usize::from(packet[pos]);
        }
        pos += 1 + 4;
    }
    let mut rrs = Vec::new();
    for _ in 0..counts.ancount() {
        let len = rr_length(packet, pos).expect("malformed answer record");
        rrs.push(packet[pos..pos + len].to_vec());
        pos += len;
    }
    assert_eq!(pos, packet.len());
    rrs
}

/// Runs a full TCP transfer and returns the records of the whole stream.
fn transfer(zones: &Zones, qserial: u32, maxlen: usize) -> Vec<Vec<u8>> {
    let mut query = IxfrQuery::new(build_request(qserial), true, maxlen, false);
    let mut stream = Vec::new();
    loop {
        match query_ixfr(&mut query, zones, |_| panic!("AXFR fallback")) {
            QueryState::InIxfr => stream.extend(answer_rrs(query.packet())),
            QueryState::Processed => return stream,
        }
    }
}

#[test]
fn ingest_serve_persist_recover() {
    let config = ZoneIxfrConfig {
        store_ixfr: true,
        ixfr_number: 5,
        ixfr_size: 0,
    };
    let dir = tempfile::tempdir().unwrap();
    let zfile: PathBuf = dir.path().join("example.com.zone");

    // ingest three updates
    let mut chain = ZoneIxfr::new();
    ingest_delta(&mut chain, &config, 1000, 1001);
    ingest_delta(&mut chain, &config, 1001, 1002);
    ingest_delta(&mut chain, &config, 1002, 1003);
    assert_eq!(chain.connected(Serial(1000)), Some(Serial(1003)));

    // serve the whole history over TCP
    let zones = Zones(Zone {
        apex: apex(),
        soa: soa_rr_bytes(1003),
        ixfr: chain,
    });
    let stream = transfer(&zones, 1000, 600);

    // response starts and ends with the current SOA
    assert_eq!(stored_rr_serial(stream.first().unwrap()), Some(Serial(1003)));
    assert_eq!(stored_rr_serial(stream.last().unwrap()), Some(Serial(1003)));
    // second record is the client's SOA, and every difference sequence
    // carries three deletions and three additions
    assert_eq!(stored_rr_serial(&stream[1]), Some(Serial(1000)));
    assert_eq!(stream.len(), 2 + 3 * 8);

    // persist, then recover into a fresh chain
    let Zones(mut zone) = zones;
    persist::write_to_file(&mut zone.ixfr, &config, &apex(), &zfile);
    let mut restored = ZoneIxfr::new();
    persist::read_from_file(&mut restored, &config, &apex(), Serial(1003), &zfile);
    assert_eq!(restored.len(), 3);
    assert_eq!(restored.connected(Serial(1000)), Some(Serial(1003)));

    // the restored chain serves byte for byte the same stream
    let restored_zones = Zones(Zone {
        apex: apex(),
        soa: soa_rr_bytes(1003),
        ixfr: restored,
    });
    assert_eq!(transfer(&restored_zones, 1000, 600), stream);
    // a shorter transfer from a later version works too
    let tail = transfer(&restored_zones, 1002, 600);
    assert_eq!(stored_rr_serial(&tail[1]), Some(Serial(1002)));
    assert_eq!(tail.len(), 2 + 8);

    // over UDP with no room, the reply collapses to the current SOA
    let mut query = IxfrQuery::new(build_request(1000), false, 512, false);
    assert_eq!(
        query_ixfr(&mut query, &restored_zones, |_| panic!("AXFR fallback")),
        QueryState::InIxfr
    );
    let header = Header::for_message_slice(query.packet());
    assert!(header.tc());
    let rrs = answer_rrs(query.packet());
    assert_eq!(rrs.len(), 1);
    assert_eq!(stored_rr_serial(&rrs[0]), Some(Serial(1003)));
}
