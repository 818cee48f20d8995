//! Operating system detection for setup plans.
//!
//! Produces a short label such as `"Ubuntu Linux (apt)"` that tells the model
//! which package manager the generated commands should use.

use std::path::Path;

/// Release metadata file read on Linux hosts.
const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Known distribution families and their labels, checked in order.
const DISTRO_LABELS: &[(&str, &str)] = &[
    ("ubuntu", "Ubuntu Linux (apt)"),
    ("debian", "Debian Linux (apt)"),
    ("fedora", "Fedora Linux (dnf)"),
    ("centos", "CentOS/RHEL (yum/dnf)"),
    ("rhel", "CentOS/RHEL (yum/dnf)"),
    ("arch", "Arch Linux (pacman)"),
    ("alpine", "Alpine Linux (apk)"),
    ("opensuse", "openSUSE (zypper)"),
    ("suse", "openSUSE (zypper)"),
];

/// Detect the current platform label.
pub fn detect_platform() -> String {
    platform_label(std::env::consts::OS, Path::new(OS_RELEASE_PATH))
}

/// Resolve the label for `os`, consulting `os_release` on Linux.
pub fn platform_label(os: &str, os_release: &Path) -> String {
    match os {
        "windows" => "Windows".to_string(),
        "macos" => "macOS".to_string(),
        "linux" => std::fs::read_to_string(os_release)
            .ok()
            .and_then(|content| linux_distro_label(&content))
            .unwrap_or("Linux (generic)")
            .to_string(),
        other => format!("{} (generic)", other),
    }
}

/// Map `/etc/os-release` contents to a distribution label.
///
/// `ID` is checked before `ID_LIKE`, so derivatives (e.g. Linux Mint with
/// `ID_LIKE="ubuntu debian"`) resolve to their parent family. Falls back to
/// a substring match on `NAME` for files without usable ids.
pub fn linux_distro_label(os_release: &str) -> Option<&'static str> {
    let field = |key: &str| -> Option<String> {
        os_release.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k.trim() == key).then(|| v.trim().trim_matches('"').trim_matches('\'').to_lowercase())
        })
    };

    let mut ids: Vec<String> = Vec::new();
    if let Some(id) = field("ID") {
        ids.push(id);
    }
    if let Some(like) = field("ID_LIKE") {
        ids.extend(like.split_whitespace().map(str::to_string));
    }

    for id in &ids {
        if let Some((_, label)) = DISTRO_LABELS
            .iter()
            .find(|(key, _)| id == key || id.starts_with(&format!("{}-", key)))
        {
            return Some(label);
        }
    }

    let name = field("NAME").unwrap_or_default();
    DISTRO_LABELS
        .iter()
        .find(|(key, _)| name.contains(key))
        .map(|(_, label)| *label)
}
