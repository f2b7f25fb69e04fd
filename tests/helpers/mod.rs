//! Test helper utilities

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use sysdiagnose::{AppPaths, CaseRecord, CaseRegistry, Ingestor};

/// Top-level directory of the sample archive, as iOS names it.
pub const ROOT: &str = "sysdiagnose_2024.01.08_10-00-00+0000_iPhone-OS_iPhone_21C66";

pub const PS_TXT: &str = "\
USER UID PID PPID %CPU STARTED COMMAND
root 0 1 0 0.0 9:00AM /sbin/launchd
mobile 501 220 1 1.5 9:01AM /usr/libexec/locationd --daemon
mobile 501 301 1 0.2 9:02AM /usr/libexec/backboardd
";

pub const SYSDIAGNOSE_LOG: &str = "\
Mon Jan  8 10:00:00 2024 sysdiagnose: starting
Mon Jan  8 10:00:00 2024 sysdiagnose: iPhone OS 17.2.1 (21C66)
";

pub const SHUTDOWN_LOG: &str = "\
remaining client pid: 12 (/usr/libexec/a)
SIGTERM: [1690000000]
";

pub const ACTIVATION_LOG: &str = "\
Mon Jan  8 10:00:00 2024 [88] <Notice>: (0x16b) -[MobileActivationDaemon handle]: start
Mon Jan  8 10:00:01 2024 [88] <Error>: activation failed
";

pub const TCC_SQL: &str = "
CREATE TABLE access (service TEXT, client TEXT, auth_value INTEGER, last_modified INTEGER);
INSERT INTO access VALUES ('kTCCServiceAccessibility', 'com.example.helper', 2, 1704708000);
INSERT INTO access VALUES ('kTCCServiceAccessibility', 'com.example.reader', 0, 1704708100);
CREATE TABLE admin (key TEXT, value INTEGER);
INSERT INTO admin VALUES ('version', 15);
";

pub const APPSTORED_SQL: &str = "
CREATE TABLE app_updates (pid INTEGER, bundle_id TEXT, install_date REAL, receipt BLOB);
INSERT INTO app_updates VALUES (412, 'com.apple.Pages', 726480000.0, x'cafe');
INSERT INTO app_updates VALUES (413, 'com.apple.Numbers', NULL, NULL);
";

/// Raw bytes of a SQLite database built from `sql`.
pub fn sqlite_bytes(sql: &str) -> Vec<u8> {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("fixture.db");
    let conn = rusqlite::Connection::open(&path).expect("Failed to create database");
    conn.execute_batch(sql).expect("Failed to populate database");
    drop(conn);
    std::fs::read(&path).expect("Failed to read database")
}

/// Files of a small but realistic sysdiagnose tree, relative to [`ROOT`].
pub fn sample_entries() -> Vec<(String, Vec<u8>)> {
    let text = [
        ("sysdiagnose.log", SYSDIAGNOSE_LOG),
        ("ps.txt", PS_TXT),
        ("brctl/brctl-container-list.txt", ""),
        ("system_logs.logarchive/Extra/shutdown.log", SHUTDOWN_LOG),
        ("logs/MobileActivation/mobileactivationd.log", ACTIVATION_LOG),
        ("logs/MobileActivation/mobileactivationd.log.1", ACTIVATION_LOG),
    ]
    .into_iter()
    .map(|(path, contents)| (path, contents.as_bytes().to_vec()));
    let databases = [
        ("logs/Accessibility/TCC.db", sqlite_bytes(TCC_SQL)),
        (
            "logs/appinstallation/appstored.sqlitedb",
            sqlite_bytes(APPSTORED_SQL),
        ),
    ];

    text.chain(databases)
        .map(|(path, contents)| (format!("{}/{}", ROOT, path), contents))
        .collect()
}

/// Write a tar (optionally gzipped) holding `entries`.
pub fn write_tar(path: &Path, entries: &[(String, Vec<u8>)], gzip: bool) {
    let file = File::create(path).expect("Failed to create archive");
    if gzip {
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        append_all(&mut builder, entries);
        builder
            .into_inner()
            .expect("Failed to finish tar")
            .finish()
            .expect("Failed to finish gzip");
    } else {
        let mut builder = tar::Builder::new(file);
        append_all(&mut builder, entries);
        builder
            .into_inner()
            .expect("Failed to finish tar")
            .flush()
            .expect("Failed to flush archive");
    }
}

fn append_all<W: Write>(builder: &mut tar::Builder<W>, entries: &[(String, Vec<u8>)]) {
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, name, data.as_slice())
            .expect("Failed to append entry");
    }
}

/// The sample tree as `<dir>/<name>`.
pub fn sample_archive(dir: &Path, name: &str, gzip: bool) -> PathBuf {
    let path = dir.join(name);
    write_tar(&path, &sample_entries(), gzip);
    path
}

/// A tar whose only regular entry escapes the extraction root.
///
/// The name is written straight into the header since the builder refuses
/// `..` components.
pub fn traversal_archive(path: &Path) {
    let file = File::create(path).expect("Failed to create archive");
    let mut builder = tar::Builder::new(file);

    let data = b"escaped";
    let mut header = tar::Header::new_gnu();
    let name = b"../evil.txt";
    header.as_old_mut().name[..name.len()].copy_from_slice(name);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder
        .append(&header, &data[..])
        .expect("Failed to append entry");
    builder.finish().expect("Failed to finish tar");
}

/// A tar whose `ps.txt` link climbs out through a `d -> .` link.
///
/// Counted as text the link never rises above the archive root, since each
/// `d/` offsets one `../`. On disk every `d` is the top directory itself, so
/// the `../` run reaches `/` and the link lands on `target`.
pub fn chained_link_archive(path: &Path, target: &Path) {
    let file = File::create(path).expect("Failed to create archive");
    let mut builder = tar::Builder::new(file);

    let data = SYSDIAGNOSE_LOG.as_bytes();
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    builder
        .append_data(&mut header, format!("{}/sysdiagnose.log", ROOT), data)
        .expect("Failed to append entry");

    let absolute = target.to_string_lossy();
    let escape = format!(
        "{}{}{}",
        "d/".repeat(30),
        "../".repeat(31),
        absolute.trim_start_matches('/')
    );
    for (name, link) in [("d", "."), ("ps.txt", escape.as_str())] {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o777);
        header.set_entry_type(tar::EntryType::Symlink);
        builder
            .append_link(&mut header, format!("{}/{}", ROOT, name), link)
            .expect("Failed to append link");
    }
    builder.finish().expect("Failed to finish tar");
}

/// Storage root, registry and a scratch directory for archives.
pub struct Workspace {
    pub dir: TempDir,
    pub paths: AppPaths,
    pub registry: CaseRegistry,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let paths = AppPaths::new(dir.path().join("app"));
        paths.ensure().expect("Failed to create app directories");
        let registry = CaseRegistry::open(paths.cases_file()).expect("Failed to open registry");
        Self {
            dir,
            paths,
            registry,
        }
    }

    /// Ingest the gzipped sample archive.
    pub fn ingest_sample(&self) -> CaseRecord {
        let archive = sample_archive(self.dir.path(), "sample.tar.gz", true);
        Ingestor::new(&self.paths, &self.registry)
            .ingest(&archive, false)
            .expect("Failed to ingest sample archive")
    }
}
