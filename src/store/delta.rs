//! A single zone difference.

use bytes::Bytes;
use core::mem;

use crate::base::Serial;

//------------ IxfrDelta -----------------------------------------------------

/// The difference between two successive versions of a zone.
///
/// The four record segments are kept in stored form: concatenated
/// resource records with fully uncompressed names, re-emittable into any
/// packet without fixups. `del` holds the records removed going from the
/// old version to the new one and is terminated by a copy of the new SOA;
/// `add` holds the records added, likewise terminated by the new SOA.
/// Emitted in chain order behind the old SOA this yields exactly the
/// difference sequence format of RFC 1995 section 4.
#[derive(Clone, Debug)]
pub struct IxfrDelta {
    old_serial: Serial,
    new_serial: Serial,
    newsoa: Bytes,
    oldsoa: Bytes,
    del: Bytes,
    add: Bytes,
    log_str: Option<String>,
    file_num: u32,
}

impl IxfrDelta {
    pub(crate) fn new(
        old_serial: Serial,
        new_serial: Serial,
        newsoa: Bytes,
        oldsoa: Bytes,
        del: Bytes,
        add: Bytes,
        log_str: Option<String>,
    ) -> Self {
        IxfrDelta {
            old_serial,
            new_serial,
            newsoa,
            oldsoa,
            del,
            add,
            log_str,
            file_num: 0,
        }
    }

    /// The serial of the version this delta upgrades from.
    #[must_use]
    pub fn old_serial(&self) -> Serial {
        self.old_serial
    }

    /// The serial of the version this delta upgrades to.
    #[must_use]
    pub fn new_serial(&self) -> Serial {
        self.new_serial
    }

    /// The new version's SOA record.
    #[must_use]
    pub fn newsoa(&self) -> &Bytes {
        &self.newsoa
    }

    /// The old version's SOA record.
    #[must_use]
    pub fn oldsoa(&self) -> &Bytes {
        &self.oldsoa
    }

    /// The deleted records, terminated by the new SOA.
    #[must_use]
    pub fn del(&self) -> &Bytes {
        &self.del
    }

    /// The added records, terminated by the new SOA.
    #[must_use]
    pub fn add(&self) -> &Bytes {
        &self.add
    }

    /// The log string describing the transfer, if one was recorded.
    #[must_use]
    pub fn log_str(&self) -> Option<&str> {
        self.log_str.as_deref()
    }

    /// The disk slot this delta is stored in; 0 if unwritten.
    #[must_use]
    pub fn file_num(&self) -> u32 {
        self.file_num
    }

    pub(crate) fn set_file_num(&mut self, file_num: u32) {
        self.file_num = file_num
    }

    /// The delta's contribution to the zone's IXFR size budget.
    #[must_use]
    pub fn size(&self) -> u64 {
        (mem::size_of::<IxfrDelta>()
            + self.newsoa.len()
            + self.oldsoa.len()
            + self.del.len()
            + self.add.len()) as u64
    }
}
