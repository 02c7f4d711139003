//! The cross-packet streaming state of one IXFR response.

use bytes::Bytes;
use tracing::error;

use crate::base::wire::rr_length;
use crate::base::Serial;
use crate::store::{IxfrDelta, ZoneIxfr};

//------------ Frame ---------------------------------------------------------

/// The byte segments of one delta pinned for a response.
///
/// The segments are reference-counted clones of the chain's buffers, so
/// the response keeps streaming the admitted snapshot even if the chain
/// evicts or replaces deltas between packets.
#[derive(Clone, Debug)]
struct Frame {
    oldsoa: Bytes,
    del: Bytes,
    add: Bytes,
}

impl Frame {
    fn new(delta: &IxfrDelta) -> Self {
        Frame {
            oldsoa: delta.oldsoa().clone(),
            del: delta.del().clone(),
            add: delta.add().clone(),
        }
    }
}

//------------ IxfrResponseState ---------------------------------------------

/// Where a streaming IXFR response currently stands.
///
/// Holds the snapshot of deltas taken at admission time and byte cursors
/// into the current delta's segments. Between packets the outer loop may
/// do anything it likes with the chain; resuming the stream only touches
/// this state.
#[derive(Clone, Debug)]
pub(super) struct IxfrResponseState {
    /// The pinned deltas, oldest first, starting at the requested serial.
    frames: Vec<Frame>,

    /// The newest pinned delta's new SOA: the final SOA of the response.
    end_newsoa: Bytes,

    /// Index of the delta currently being emitted.
    cur: usize,

    /// Byte cursors into the current delta's segments.
    count_newsoa: usize,
    count_oldsoa: usize,
    count_del: usize,
    count_add: usize,

    /// Packet offset directly behind the final SOA, if it was written
    /// into the current packet. Used for the UDP truncation fallback.
    pub(super) pos_of_newsoa: Option<usize>,
}

impl IxfrResponseState {
    /// Pins the chain snapshot for a request starting at `qserial`.
    ///
    /// The caller has already verified that the chain is connected from
    /// `qserial` through to the zone's current serial.
    pub(super) fn new(chain: &ZoneIxfr, qserial: Serial) -> Self {
        let mut frames = Vec::new();
        let mut delta = chain.find(qserial);
        let mut end_newsoa = Bytes::new();
        while let Some(d) = delta {
            frames.push(Frame::new(d));
            end_newsoa = d.newsoa().clone();
            delta = chain.next_after(d.old_serial());
        }
        IxfrResponseState {
            frames,
            end_newsoa,
            cur: 0,
            count_newsoa: 0,
            count_oldsoa: 0,
            count_del: 0,
            count_add: 0,
            pos_of_newsoa: None,
        }
    }

    /// Packs records into `packet` until it is full or the stream ends.
    ///
    /// Returns the number of records added and whether the response is
    /// complete.
    pub(super) fn pack(
        &mut self,
        packet: &mut Vec<u8>,
        maxlen: usize,
    ) -> (u16, bool) {
        let mut total_added = self.copy_rrs(packet, maxlen);
        let mut finished = false;
        while self.count_add >= self.frames[self.cur].add.len() {
            if self.cur + 1 < self.frames.len() {
                // move to the next delta; its old SOA is not repeated
                // between stitched difference sequences
                self.cur += 1;
                self.count_oldsoa = self.frames[self.cur].oldsoa.len();
                self.count_del = 0;
                self.count_add = 0;
                total_added += self.copy_rrs(packet, maxlen);
            } else {
                finished = true;
                break;
            }
        }
        (total_added, finished)
    }

    /// Copies records into the packet until it is full.
    ///
    /// When a record does not fit, returns and adds no more.
    fn copy_rrs(&mut self, packet: &mut Vec<u8>, maxlen: usize) -> u16 {
        let mut total_added = 0;

        // Add first SOA. It comes from the last pinned delta: the final
        // SOA of the result of the IXFR.
        if self.count_newsoa < self.end_newsoa.len() {
            if packet.len() + self.end_newsoa.len() <= maxlen {
                packet.extend_from_slice(&self.end_newsoa);
                self.count_newsoa = self.end_newsoa.len();
                total_added += 1;
                self.pos_of_newsoa = Some(packet.len());
            } else {
                return total_added;
            }
        }

        let frame = &self.frames[self.cur];

        // Add second SOA
        if self.count_oldsoa < frame.oldsoa.len() {
            if packet.len() + frame.oldsoa.len() <= maxlen {
                packet.extend_from_slice(&frame.oldsoa);
                self.count_oldsoa = frame.oldsoa.len();
                total_added += 1;
            } else {
                return total_added;
            }
        }

        // Add the deleted records, ending in a SOA
        while self.count_del < frame.del.len() {
            match rr_length(&frame.del, self.count_del) {
                Some(rrlen) if packet.len() + rrlen <= maxlen => {
                    packet.extend_from_slice(
                        &frame.del[self.count_del..self.count_del + rrlen],
                    );
                    self.count_del += rrlen;
                    total_added += 1;
                }
                Some(_) => return total_added,
                None => {
                    // stored segments are well formed by construction;
                    // drop the segment rather than stall the stream
                    error!("ixfr response: corrupt stored del segment");
                    self.count_del = frame.del.len();
                    return total_added;
                }
            }
        }

        // Add the added records, ending in a SOA
        while self.count_add < frame.add.len() {
            match rr_length(&frame.add, self.count_add) {
                Some(rrlen) if packet.len() + rrlen <= maxlen => {
                    packet.extend_from_slice(
                        &frame.add[self.count_add..self.count_add + rrlen],
                    );
                    self.count_add += rrlen;
                    total_added += 1;
                }
                Some(_) => return total_added,
                None => {
                    error!("ixfr response: corrupt stored add segment");
                    self.count_add = frame.add.len();
                    return total_added;
                }
            }
        }

        total_added
    }
}
