//! Fixed table of logical artifact keys and where they live in an archive.
//!
//! Patterns are relative to the case directory; the leading `*` is the single
//! top-level directory every sysdiagnose archive extracts into.

/// Whether a key resolves to one path or to every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    List,
}

/// Kind of filesystem entry a key may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One row of the artifact table.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactSpec {
    pub key: &'static str,
    pub patterns: &'static [&'static str],
    pub cardinality: Cardinality,
    pub kind: EntryKind,
}

/// Key of the primary system log, scanned for the iOS version.
pub const SYSDIAGNOSE_LOG: &str = "sysdiagnose.log";

const fn file(key: &'static str, patterns: &'static [&'static str]) -> ArtifactSpec {
    ArtifactSpec {
        key,
        patterns,
        cardinality: Cardinality::Single,
        kind: EntryKind::File,
    }
}

const fn dir(key: &'static str, patterns: &'static [&'static str]) -> ArtifactSpec {
    ArtifactSpec {
        key,
        patterns,
        cardinality: Cardinality::Single,
        kind: EntryKind::Dir,
    }
}

const fn files(key: &'static str, patterns: &'static [&'static str]) -> ArtifactSpec {
    ArtifactSpec {
        key,
        patterns,
        cardinality: Cardinality::List,
        kind: EntryKind::File,
    }
}

pub const ARTIFACTS: &[ArtifactSpec] = &[
    file(SYSDIAGNOSE_LOG, &["*/sysdiagnose.log"]),
    file("ps", &["*/ps.txt"]),
    file("swcutil_show", &["*/swcutil_show.txt"]),
    file("ps_thread", &["*/ps_thread.txt"]),
    file("appupdate_db", &["*/logs/appinstallation/AppUpdates.sqlitedb"]),
    dir("brctl", &["*/brctl"]),
    file(
        "networkextensioncache",
        &["*/logs/Networking/com.apple.networkextension.cache.plist"],
    ),
    file(
        "networkextension",
        &["*/logs/Networking/com.apple.networkextension.plist"],
    ),
    file("powerlogs", &["*/logs/powerlogs/powerlog_*"]),
    file("systemversion", &["*/logs/SystemVersion/SystemVersion.plist"]),
    file(
        "UUIDToBinaryLocations",
        &["*/logs/tailspindb/UUIDToBinaryLocations"],
    ),
    dir("logarchive_folder", &["*/system_logs.logarchive"]),
    file(
        "shutdownlog",
        &["*/system_logs.logarchive/Extra/shutdown.log"],
    ),
    file("taskinfo", &["*/taskinfo.txt"]),
    file("spindump-nosymbols", &["*/spindump-nosymbols.txt"]),
    file("Accessibility-TCC", &["*/logs/Accessibility/TCC.db"]),
    file("appinstallation", &["*/logs/appinstallation/appstored.sqlitedb"]),
    file("itunesstore", &["*/logs/itunesstored/downloads.*.sqlitedb"]),
    file("wifisecurity", &["*/WiFi/security.txt"]),
    files(
        "wifi_data",
        &[
            "*/WiFi/*.plist",
            "*/WiFi/wifi_scan*.txt",
            "*/WiFi/com.apple.wifi.recent-networks.json",
        ],
    ),
    files("ips_files", &["*/crashes_and_spins/*.ips"]),
    files(
        "mobile_activation",
        &["*/logs/MobileActivation/mobileactivationd.log*"],
    ),
    files(
        "container_manager",
        &["*/logs/MobileContainerManager/containermanagerd.log*"],
    ),
    files(
        "mobile_installation",
        &["*/logs/MobileInstallation/mobile_installation.log*"],
    ),
];

/// Look up a key in the artifact table.
pub fn spec_for(key: &str) -> Option<&'static ArtifactSpec> {
    ARTIFACTS.iter().find(|spec| spec.key == key)
}

pub fn is_known_key(key: &str) -> bool {
    spec_for(key).is_some()
}
