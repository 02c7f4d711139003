//! Keeping IXFR data on disk.
//!
//! Each delta of a zone is stored in its own file next to the zone file:
//! slot 1 (`<zonefile>.ixfr`) holds the newest delta, higher numbered
//! slots (`<zonefile>.ixfr.2`, ...) successively older ones. When the
//! zone file is rewritten, [`write_to_file`] brings the files in line
//! with the in-memory chain: stale slots are deleted, existing files are
//! renamed to their new slot numbers, and unwritten deltas are appended.
//! At startup [`read_from_file`] replays the files back into a chain,
//! verifying that they connect up to the zone's current serial.
//!
//! Failures never propagate: both routines log and leave behind the
//! longest valid prefix of slots they can, since a partial set of files
//! merely shortens how far back incremental transfers can reach.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, error, info};

use crate::base::iana::{Class, Rtype};
use crate::base::name::Name;
use crate::base::soa::{split_stored_rr, stored_rr_serial};
use crate::base::wire::RrIter;
use crate::base::Serial;
use crate::config::ZoneIxfrConfig;
use crate::store::{IxfrDelta, ZoneIxfr};

pub mod present;

//------------ write_to_file -------------------------------------------------

/// Writes the zone's IXFR data to disk after the zone file was written.
///
/// `zfile` is the path of the zone file the data files sit next to;
/// `zone_name` is used for logging only. In-memory deltas beyond what
/// will be stored are evicted. On I/O failure the routine stops early,
/// removing any files it can no longer vouch for so that the remaining
/// slots are a valid prefix.
pub fn write_to_file(
    chain: &mut ZoneIxfr,
    config: &ZoneIxfrConfig,
    zone_name: &Name,
    zfile: &Path,
) {
    // find out what the target number of files is that we want on disk
    let target = target_number_files(chain, config);

    // delete if we have more than we need
    delete_superfluous_files(zone_name, zfile, target);

    // delete if we have too much in memory
    delete_memory_items(chain, target);

    // rename the transfers that we have that already have a file
    if !rename_files(chain, zone_name, zfile, target) {
        return;
    }

    // write the transfers that are not written yet
    write_files(chain, zone_name, zfile);
}

/// The number of files we want on disk.
fn target_number_files(
    chain: &ZoneIxfr,
    config: &ZoneIxfrConfig,
) -> u32 {
    if !config.store_ixfr {
        return 0;
    }
    // if we store ixfr, it is the configured number of files, but if the
    // number of available transfers is smaller, store less
    config.ixfr_number.min(chain.len() as u32)
}

/// The file name for the given slot. Slot numbers start at 1.
fn make_ixfr_name(zfile: &Path, file_num: u32) -> PathBuf {
    let mut name = zfile.as_os_str().to_os_string();
    if file_num == 1 {
        name.push(".ixfr");
    } else {
        name.push(format!(".ixfr.{}", file_num));
    }
    PathBuf::from(name)
}

fn ixfr_file_exists(zfile: &Path, file_num: u32) -> bool {
    fs::metadata(make_ixfr_name(zfile, file_num)).is_ok()
}

/// Deletes the file in the given slot.
///
/// Returns whether the file was deleted; with `ignore_enoent` a missing
/// file is reported as not deleted without an error.
fn unlink_it(
    zone_name: &Name,
    zfile: &Path,
    file_num: u32,
    ignore_enoent: bool,
) -> bool {
    let path = make_ixfr_name(zfile, file_num);
    debug!(
        "delete zone {} IXFR data file {}",
        zone_name,
        path.display()
    );
    match fs::remove_file(&path) {
        Ok(()) => true,
        Err(err) if ignore_enoent && err.kind() == io::ErrorKind::NotFound => {
            false
        }
        Err(err) => {
            error!(
                "error to delete file {}: {}",
                path.display(),
                err
            );
            false
        }
    }
}

/// Deletes the files in slots above the target count.
fn delete_superfluous_files(
    zone_name: &Name,
    zfile: &Path,
    target: u32,
) {
    let mut file_num = target + 1;
    if !ixfr_file_exists(zfile, file_num) {
        return;
    }
    while unlink_it(zone_name, zfile, file_num, true) {
        file_num += 1;
    }
}

/// Evicts oldest deltas until only `target` remain.
fn delete_memory_items(chain: &mut ZoneIxfr, target: u32) {
    while (target as usize) < chain.len() {
        chain.remove_oldest();
    }
}

/// Deletes the files of `deltas` and marks them unwritten.
///
/// Used to unwind after a failed rename or write: the files can no
/// longer be used without the one that failed.
fn delete_rest_files(
    zone_name: &Name,
    zfile: &Path,
    deltas: &mut [&mut IxfrDelta],
) {
    for delta in deltas.iter_mut().rev() {
        if delta.file_num() != 0 {
            unlink_it(zone_name, zfile, delta.file_num(), false);
            delta.set_file_num(0);
        }
    }
}

/// Renames the existing files into their new slots.
///
/// The oldest delta belongs in the highest slot. Returns `false` if a
/// rename failed; the already renamed files are deleted in that case
/// since they are useless without the remaining ones.
fn rename_files(
    chain: &mut ZoneIxfr,
    zone_name: &Name,
    zfile: &Path,
    target: u32,
) -> bool {
    let mut deltas: Vec<&mut IxfrDelta> = chain.iter_mut().collect();
    let mut destnum = target;
    for idx in 0..deltas.len() {
        if deltas[idx].file_num() == 0 {
            break;
        }
        if deltas[idx].file_num() == destnum {
            // nothing to do for rename
            return true;
        }

        // if there is an existing file, delete it
        if ixfr_file_exists(zfile, destnum) {
            unlink_it(zone_name, zfile, destnum, false);
        }

        let from = make_ixfr_name(zfile, deltas[idx].file_num());
        let to = make_ixfr_name(zfile, destnum);
        debug!(
            "rename zone {} IXFR data file {} to {}",
            zone_name,
            from.display(),
            to.display()
        );
        if let Err(err) = fs::rename(&from, &to) {
            error!(
                "error to rename file {}: {}",
                from.display(),
                err
            );
            // delete the previously renamed files
            delete_rest_files(zone_name, zfile, &mut deltas[..idx]);
            return false;
        }
        deltas[idx].set_file_num(destnum);

        destnum -= 1;
        if destnum == 0 {
            // not possible to hit slot number 0
            return true;
        }
    }
    true
}

/// Writes the deltas that have no file yet, newest first into slot 1 up.
fn write_files(chain: &mut ZoneIxfr, zone_name: &Name, zfile: &Path) {
    let mut deltas: Vec<&mut IxfrDelta> = chain.iter_mut().collect();
    let mut file_num = 1;
    for idx in (0..deltas.len()).rev() {
        if deltas[idx].file_num() != 0 {
            break;
        }
        let path = make_ixfr_name(zfile, file_num);
        info!(
            "writing zone {} IXFR data to file {}",
            zone_name,
            path.display()
        );
        if let Err(err) = write_file(zone_name, deltas[idx], &path) {
            error!(
                "failed to write zone {} IXFR data {}: {}",
                zone_name,
                path.display(),
                err
            );
            // there could be more files sitting on the disk; remove
            // them, they are not used without this ixfr file
            unlink_it(zone_name, zfile, file_num, true);
            delete_rest_files(zone_name, zfile, &mut deltas[..=idx]);
            return;
        }
        deltas[idx].set_file_num(file_num);
        file_num += 1;
    }
}

/// Writes one delta into its data file.
fn write_file(
    zone_name: &Name,
    delta: &IxfrDelta,
    path: &Path,
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "; IXFR data file")?;
    writeln!(out, "; zone {}", zone_name)?;
    writeln!(out, "; from_serial {}", delta.old_serial())?;
    writeln!(out, "; to_serial {}", delta.new_serial())?;
    if let Some(log_str) = delta.log_str() {
        writeln!(out, "; {}", log_str)?;
    }

    for segment in
        [delta.newsoa(), delta.oldsoa(), delta.del(), delta.add()]
    {
        for rr in RrIter::new(segment) {
            let mut line = String::new();
            present::fmt_rr(rr, &mut line).map_err(|err| {
                io::Error::new(io::ErrorKind::InvalidData, err)
            })?;
            writeln!(out, "{}", line)?;
        }
    }
    out.flush()
}

//------------ read_from_file ------------------------------------------------

/// Reads the zone's IXFR data files back into the chain at startup.
///
/// The existing chain content is dropped first: the zone data in memory
/// has likely changed, e.g. due to reading a new zone file, so it needs
/// new IXFRs. Files are read from slot 1 up until one is missing or does
/// not parse; each file's new serial must equal the serial the previous
/// file upgrades from, starting at the zone's current serial.
pub fn read_from_file(
    chain: &mut ZoneIxfr,
    config: &ZoneIxfrConfig,
    apex: &Name,
    current_serial: Serial,
    zfile: &Path,
) {
    chain.clear();

    // track the serial number that we need to end up with, and check
    // that the files match up and result in the required version
    let mut dest_serial = current_serial;
    let mut num_files = 0;

    while read_one_more_file(
        chain,
        config,
        apex,
        &mut dest_serial,
        zfile,
        num_files + 1,
    ) {
        num_files += 1;
    }
    if num_files > 0 {
        info!(
            "zone {} read {} IXFR transfers with success",
            apex, num_files
        );
        chain.set_num_files(num_files);
    }
}

/// Tries to read the data file in the given slot.
///
/// Returns `false` when the file does not exist, cannot be parsed, or
/// does not fit the configured limits; reading stops there so that the
/// loaded chain is a prefix from slot 1.
fn read_one_more_file(
    chain: &mut ZoneIxfr,
    config: &ZoneIxfrConfig,
    apex: &Name,
    dest_serial: &mut Serial,
    zfile: &Path,
    file_num: u32,
) -> bool {
    let path = make_ixfr_name(zfile, file_num);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // we reached the end of the list of IXFR files
            return false;
        }
        Err(err) => {
            error!(
                "could not read zone {} IXFR file {}: {}",
                apex,
                path.display(),
                err
            );
            return false;
        }
    };

    if chain.len() as u32 >= config.ixfr_number {
        debug!(
            "zone {} skip {} IXFR data because only {} ixfr-number \
             configured",
            apex,
            path.display(),
            config.ixfr_number
        );
        return false;
    }

    let mut reader = BufReader::new(file);
    let delta = match read_delta(
        apex,
        &mut reader,
        *dest_serial,
        file_num,
    ) {
        Ok(delta) => delta,
        Err(err) => {
            error!(
                "zone {} IXFR data {}: {}",
                apex,
                path.display(),
                err
            );
            return false;
        }
    };

    if config.ixfr_size != 0
        && chain.total_size() + delta.size() > config.ixfr_size
    {
        debug!(
            "zone {} skip {} IXFR data because only ixfr-size: {} \
             configured, and it is {} size",
            apex,
            path.display(),
            config.ixfr_size,
            delta.size()
        );
        return false;
    }

    *dest_serial = delta.old_serial();
    debug!(
        "zone {} read {} IXFR data of {} bytes",
        apex,
        path.display(),
        delta.size()
    );
    chain.add(delta);
    true
}

/// Reads one delta from its data file.
///
/// The file has header comments, the new SOA, the old SOA, the del
/// section and the add section. The del and add sections each end in a
/// SOA with the new serial.
fn read_delta(
    apex: &Name,
    reader: &mut impl BufRead,
    dest_serial: Serial,
    file_num: u32,
) -> Result<IxfrDelta, ReadError> {
    // new SOA
    let newsoa = read_rr(reader)?;
    let (owner, rtype, class, _, _) = split_stored_rr(&newsoa)
        .map_err(|_| ReadError::Bad("cannot parse record"))?;
    if rtype != Rtype::SOA {
        return Err(ReadError::Bad("IXFR data does not start with SOA"));
    }
    if class != Class::IN {
        return Err(ReadError::Bad("IXFR data is not class IN"));
    }
    if owner != *apex {
        return Err(ReadError::Bad("IXFR data has wrong SOA owner"));
    }
    let new_serial = stored_rr_serial(&newsoa)
        .ok_or(ReadError::Bad("cannot parse SOA serial"))?;
    if new_serial != dest_serial {
        return Err(ReadError::WrongVersion {
            found: new_serial,
            wanted: dest_serial,
        });
    }

    // old SOA
    let oldsoa = read_rr(reader)?;
    let (owner, rtype, class, _, _) = split_stored_rr(&oldsoa)
        .map_err(|_| ReadError::Bad("cannot parse record"))?;
    if rtype != Rtype::SOA {
        return Err(ReadError::Bad("IXFR data 2nd record is not SOA"));
    }
    if class != Class::IN {
        return Err(ReadError::Bad("IXFR data 2nd SOA is not class IN"));
    }
    if owner != *apex {
        return Err(ReadError::Bad("IXFR data has wrong 2nd SOA owner"));
    }
    let old_serial = stored_rr_serial(&oldsoa)
        .ok_or(ReadError::Bad("cannot parse SOA serial"))?;

    // the del and add sections; each ends with a SOA carrying the new
    // serial. There could be SOAs of other versions collated inside, so
    // only that serial ends a section.
    let mut del = Vec::new();
    loop {
        let rr = read_rr(reader)?;
        del.extend_from_slice(&rr);
        if stored_rr_serial(&rr) == Some(new_serial) {
            break;
        }
    }
    let mut add = Vec::new();
    loop {
        let rr = read_rr(reader)?;
        add.extend_from_slice(&rr);
        if stored_rr_serial(&rr) == Some(new_serial) {
            break;
        }
    }

    del.shrink_to_fit();
    add.shrink_to_fit();
    let mut delta = IxfrDelta::new(
        old_serial,
        new_serial,
        Bytes::from(newsoa),
        Bytes::from(oldsoa),
        Bytes::from(del),
        Bytes::from(add),
        None,
    );
    delta.set_file_num(file_num);
    Ok(delta)
}

/// Reads the next record line, skipping comments and empty lines.
fn read_rr(reader: &mut impl BufRead) -> Result<Vec<u8>, ReadError> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(ReadError::Bad("unexpected end of file"));
        }
        let text = line.trim();
        if text.is_empty() || text.starts_with(';') {
            continue;
        }
        return Ok(present::parse_rr(text)?);
    }
}

//------------ ReadError -----------------------------------------------------

/// Reading a data file failed.
#[derive(Debug)]
enum ReadError {
    /// Reading from the file failed.
    Io(io::Error),

    /// A line could not be parsed as a record.
    Present(present::PresentError),

    /// The file content was not valid IXFR data.
    Bad(&'static str),

    /// The file does not continue the chain.
    WrongVersion { found: Serial, wanted: Serial },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ReadError::Io(err) => write!(f, "cannot read: {}", err),
            ReadError::Present(err) => write!(f, "parse error: {}", err),
            ReadError::Bad(msg) => f.write_str(msg),
            ReadError::WrongVersion { found, wanted } => write!(
                f,
                "IXFR data contains the wrong version, serial {} but \
                 want destination serial {}",
                found, wanted
            ),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        ReadError::Io(err)
    }
}

impl From<present::PresentError> for ReadError {
    fn from(err: present::PresentError) -> Self {
        ReadError::Present(err)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::soa::Soa;
    use tempfile::tempdir;

    fn apex() -> Name {
        "example.com".parse().unwrap()
    }

    fn soa_rr(serial: u32) -> Vec<u8> {
        let soa = Soa {
            mname: "ns1.example.com".parse().unwrap(),
            rname: "hostmaster.example.com".parse().unwrap(),
            serial: Serial(serial),
            refresh: 3600,
            retry: 900,
            expire: 604800,
            minimum: 86400,
        };
        let mut rr = Vec::new();
        soa.compose_rr(&mut rr, &apex(), 3600);
        rr
    }

    fn a_rr(host: u8) -> Vec<u8> {
        let owner: Name = "host.example.com".parse().unwrap();
        let mut rr = Vec::new();
        owner.compose(&mut rr);
        rr.extend_from_slice(&Rtype::A.to_int().to_be_bytes());
        rr.extend_from_slice(&Class::IN.to_int().to_be_bytes());
        rr.extend_from_slice(&300u32.to_be_bytes());
        rr.extend_from_slice(&4u16.to_be_bytes());
        rr.extend_from_slice(&[192, 0, 2, host]);
        rr
    }

    fn mk_delta(old: u32, new: u32) -> IxfrDelta {
        let mut del = a_rr(old as u8);
        del.extend_from_slice(&soa_rr(new));
        let mut add = a_rr(new as u8);
        add.extend_from_slice(&soa_rr(new));
        IxfrDelta::new(
            Serial(old),
            Serial(new),
            Bytes::from(soa_rr(new)),
            Bytes::from(soa_rr(old)),
            Bytes::from(del),
            Bytes::from(add),
            Some(format!("transfer {}->{}", old, new)),
        )
    }

    fn config(number: u32, size: u64) -> ZoneIxfrConfig {
        ZoneIxfrConfig {
            store_ixfr: true,
            ixfr_number: number,
            ixfr_size: size,
        }
    }

    /// Returns the (from, to) serials recorded in a slot's file header.
    fn slot_header(zfile: &Path, file_num: u32) -> (u32, u32) {
        let text =
            fs::read_to_string(make_ixfr_name(zfile, file_num)).unwrap();
        let mut from = None;
        let mut to = None;
        for line in text.lines() {
            if let Some(value) = line.strip_prefix("; from_serial ") {
                from = Some(value.parse().unwrap());
            }
            if let Some(value) = line.strip_prefix("; to_serial ") {
                to = Some(value.parse().unwrap());
            }
        }
        (from.unwrap(), to.unwrap())
    }

    fn existing_slots(zfile: &Path) -> Vec<u32> {
        let mut slots = Vec::new();
        for file_num in 1..20 {
            if ixfr_file_exists(zfile, file_num) {
                slots.push(file_num);
            }
        }
        slots
    }

    #[test]
    fn file_naming() {
        let zfile = Path::new("/var/db/example.com.zone");
        assert_eq!(
            make_ixfr_name(zfile, 1),
            Path::new("/var/db/example.com.zone.ixfr")
        );
        assert_eq!(
            make_ixfr_name(zfile, 3),
            Path::new("/var/db/example.com.zone.ixfr.3")
        );
    }

    #[test]
    fn write_read_round_trip() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");
        let config = config(5, 0);

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        chain.add(mk_delta(11, 12));
        let originals: Vec<IxfrDelta> = chain.iter().cloned().collect();

        write_to_file(&mut chain, &config, &apex(), &zfile);
        assert_eq!(existing_slots(&zfile), [1, 2]);
        assert_eq!(slot_header(&zfile, 1), (11, 12));
        assert_eq!(slot_header(&zfile, 2), (10, 11));

        let mut restored = ZoneIxfr::new();
        read_from_file(
            &mut restored,
            &config,
            &apex(),
            Serial(12),
            &zfile,
        );
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.num_files(), 2);
        for (restored, original) in restored.iter().zip(&originals) {
            assert_eq!(restored.old_serial(), original.old_serial());
            assert_eq!(restored.new_serial(), original.new_serial());
            assert_eq!(restored.newsoa(), original.newsoa());
            assert_eq!(restored.oldsoa(), original.oldsoa());
            assert_eq!(restored.del(), original.del());
            assert_eq!(restored.add(), original.add());
        }
        // the newest delta sits in slot 1
        assert_eq!(restored.last().unwrap().file_num(), 1);
        assert_eq!(restored.first().unwrap().file_num(), 2);
        assert_eq!(
            restored.connected(Serial(10)),
            Some(Serial(12))
        );
    }

    #[test]
    fn new_delta_renames_older_files_up() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");
        let config = config(5, 0);

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        chain.add(mk_delta(11, 12));
        write_to_file(&mut chain, &config, &apex(), &zfile);
        assert_eq!(slot_header(&zfile, 1), (11, 12));
        assert_eq!(slot_header(&zfile, 2), (10, 11));

        chain.add(mk_delta(12, 13));
        write_to_file(&mut chain, &config, &apex(), &zfile);

        assert_eq!(existing_slots(&zfile), [1, 2, 3]);
        assert_eq!(slot_header(&zfile, 1), (12, 13));
        assert_eq!(slot_header(&zfile, 2), (11, 12));
        assert_eq!(slot_header(&zfile, 3), (10, 11));
        assert_eq!(
            chain
                .iter()
                .map(|delta| delta.file_num())
                .collect::<Vec<_>>(),
            [3, 2, 1]
        );
    }

    #[test]
    fn write_evicts_memory_beyond_target() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");
        let config = config(2, 0);

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        chain.add(mk_delta(11, 12));
        chain.add(mk_delta(12, 13));
        write_to_file(&mut chain, &config, &apex(), &zfile);

        assert_eq!(chain.len(), 2);
        assert!(chain.find(Serial(10)).is_none());
        assert_eq!(existing_slots(&zfile), [1, 2]);
        assert_eq!(slot_header(&zfile, 1), (12, 13));
        assert_eq!(slot_header(&zfile, 2), (11, 12));
    }

    #[test]
    fn shrinking_target_deletes_superfluous_files() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        chain.add(mk_delta(11, 12));
        chain.add(mk_delta(12, 13));
        write_to_file(&mut chain, &config(5, 0), &apex(), &zfile);
        assert_eq!(existing_slots(&zfile), [1, 2, 3]);

        // a smaller budget on the next write trims both disk and memory
        write_to_file(&mut chain, &config(1, 0), &apex(), &zfile);
        assert_eq!(existing_slots(&zfile), [1]);
        assert_eq!(chain.len(), 1);
        assert_eq!(slot_header(&zfile, 1), (12, 13));
    }

    #[test]
    fn disabled_store_removes_files() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        write_to_file(&mut chain, &config(5, 0), &apex(), &zfile);
        assert_eq!(existing_slots(&zfile), [1]);

        let disabled = ZoneIxfrConfig {
            store_ixfr: false,
            ..config(5, 0)
        };
        write_to_file(&mut chain, &disabled, &apex(), &zfile);
        assert!(existing_slots(&zfile).is_empty());
    }

    #[test]
    fn read_stops_at_missing_slot() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");
        let config = config(5, 0);

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        chain.add(mk_delta(11, 12));
        chain.add(mk_delta(12, 13));
        write_to_file(&mut chain, &config, &apex(), &zfile);

        // a hole at slot 2 limits recovery to slot 1
        fs::remove_file(make_ixfr_name(&zfile, 2)).unwrap();
        let mut restored = ZoneIxfr::new();
        read_from_file(
            &mut restored,
            &config,
            &apex(),
            Serial(13),
            &zfile,
        );
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.first().unwrap().old_serial(), Serial(12));

        // no slot 1 at all: nothing is recovered
        fs::remove_file(make_ixfr_name(&zfile, 1)).unwrap();
        let mut restored = ZoneIxfr::new();
        read_from_file(
            &mut restored,
            &config,
            &apex(),
            Serial(13),
            &zfile,
        );
        assert!(restored.is_empty());
        assert_eq!(restored.num_files(), 0);
    }

    #[test]
    fn read_rejects_wrong_current_serial() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");
        let config = config(5, 0);

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        write_to_file(&mut chain, &config, &apex(), &zfile);

        // the zone was reloaded at another version; the file is stale
        let mut restored = ZoneIxfr::new();
        read_from_file(
            &mut restored,
            &config,
            &apex(),
            Serial(99),
            &zfile,
        );
        assert!(restored.is_empty());
    }

    #[test]
    fn read_stops_at_truncated_file() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");
        let config = config(5, 0);

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        chain.add(mk_delta(11, 12));
        write_to_file(&mut chain, &config, &apex(), &zfile);

        // cut the newest file short in the middle of its records
        let path = make_ixfr_name(&zfile, 1);
        let text = fs::read_to_string(&path).unwrap();
        let cut: String = text
            .lines()
            .take(7)
            .map(|line| format!("{}\n", line))
            .collect();
        fs::write(&path, cut).unwrap();

        let mut restored = ZoneIxfr::new();
        read_from_file(
            &mut restored,
            &config,
            &apex(),
            Serial(12),
            &zfile,
        );
        assert!(restored.is_empty());
    }

    #[test]
    fn read_honors_count_budget() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        chain.add(mk_delta(11, 12));
        chain.add(mk_delta(12, 13));
        write_to_file(&mut chain, &config(5, 0), &apex(), &zfile);

        let mut restored = ZoneIxfr::new();
        read_from_file(
            &mut restored,
            &config(2, 0),
            &apex(),
            Serial(13),
            &zfile,
        );
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.first().unwrap().old_serial(), Serial(11));
    }

    #[test]
    fn read_honors_size_budget() {
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        chain.add(mk_delta(11, 12));
        let one_size = chain.first().unwrap().size();
        write_to_file(&mut chain, &config(5, 0), &apex(), &zfile);

        let mut restored = ZoneIxfr::new();
        read_from_file(
            &mut restored,
            &config(5, one_size + 1),
            &apex(),
            Serial(12),
            &zfile,
        );
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.first().unwrap().old_serial(), Serial(11));
    }

    #[test]
    fn unwritten_marker_survives_write() {
        // a delta committed after the write pass has file_num 0 until
        // the next write
        let dir = tempdir().unwrap();
        let zfile = dir.path().join("example.com.zone");
        let config = config(5, 0);

        let mut chain = ZoneIxfr::new();
        chain.add(mk_delta(10, 11));
        write_to_file(&mut chain, &config, &apex(), &zfile);
        chain.add(mk_delta(11, 12));
        assert_eq!(chain.find(Serial(11)).unwrap().file_num(), 0);
        write_to_file(&mut chain, &config, &apex(), &zfile);
        assert_eq!(chain.find(Serial(11)).unwrap().file_num(), 1);
        assert_eq!(chain.find(Serial(10)).unwrap().file_num(), 2);
    }
}
