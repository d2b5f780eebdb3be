//! Read-only probes of live host state, plus the two narrow file edits the
//! provisioning steps need (guarded line append and whole-file write).
//!
//! All paths handed to a probe are absolute host paths such as `/etc/fstab`.
//! [`LocalProbe`] resolves them below a configurable root so the same code can
//! run against a scratch directory.

use crate::accounts::{self, Account};
use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the passwd database
pub const PASSWD_PATH: &str = "/etc/passwd";
/// Path of the group database
pub const GROUP_PATH: &str = "/etc/group";

/// Queries and narrow edits of host state.
pub trait StateProbe: Send + Sync {
    /// Read a whole file.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Whether a file or directory exists.
    fn exists(&self, path: &Path) -> bool;

    /// Replace a file's contents and set its permission bits.
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()>;

    /// Download a document over HTTP(S).
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Read a file and return its content trimmed of surrounding whitespace.
    fn read_line(&self, path: &Path) -> Result<String> {
        Ok(self.read_to_string(path)?.trim().to_string())
    }

    /// Append `line` to a text file unless some existing line matches `guard`.
    ///
    /// Returns `true` when the file was changed. A missing file is created.
    fn append_line(&self, path: &Path, guard: &Regex, line: &str) -> Result<bool> {
        let content = match self.read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => String::new(),
            Err(e) => return Err(e),
        };

        if content.lines().any(|l| guard.is_match(l)) {
            log::debug!("{} already has a line matching {}", path.display(), guard);
            return Ok(false);
        }

        let mut lines: Vec<&str> = content.lines().collect();
        lines.push(line);
        let mut updated = lines.join("\n");
        updated.push('\n');

        self.write_file(path, updated.as_bytes(), 0o644)?;
        Ok(true)
    }

    /// Look up a local account by name.
    fn account(&self, name: &str) -> Result<Option<Account>> {
        let passwd_path = Path::new(PASSWD_PATH);
        let group_path = Path::new(GROUP_PATH);
        let passwd = accounts::parse_passwd(passwd_path, &self.read_to_string(passwd_path)?)?;
        let groups = accounts::parse_group(group_path, &self.read_to_string(group_path)?)?;
        Ok(accounts::resolve_account(name, &passwd, &groups))
    }

    /// Look up a group id by group name.
    fn group_id(&self, name: &str) -> Result<Option<u32>> {
        let group_path = Path::new(GROUP_PATH);
        let groups = accounts::parse_group(group_path, &self.read_to_string(group_path)?)?;
        Ok(groups.into_iter().find(|g| g.name == name).map(|g| g.gid))
    }
}

/// Probe backed by the local filesystem
#[derive(Debug, Clone)]
pub struct LocalProbe {
    root: PathBuf,
}

impl Default for LocalProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalProbe {
    /// Probe the real host (`/`).
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }

    /// Probe a directory tree that stands in for the host root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.root.join(relative)
    }
}

impl StateProbe for LocalProbe {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let resolved = self.resolve(path);
        log::debug!("reading {}", resolved.display());
        fs::read_to_string(&resolved).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<()> {
        let resolved = self.resolve(path);
        let write_err = |source| Error::Write {
            path: path.to_path_buf(),
            source,
        };

        fs::write(&resolved, contents).map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&resolved, fs::Permissions::from_mode(mode)).map_err(write_err)?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        log::debug!("wrote {}", resolved.display());
        Ok(())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        log::debug!("fetching {url}");
        let fetch_err = |e: ureq::Error| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };
        let mut response = ureq::get(url).call().map_err(fetch_err)?;
        response.body_mut().read_to_vec().map_err(fetch_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn probe_with(files: &[(&str, &str)]) -> (TempDir, LocalProbe) {
        let tmp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = tmp.path().join(path.trim_start_matches('/'));
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let probe = LocalProbe::with_root(tmp.path());
        (tmp, probe)
    }

    #[test]
    fn test_read_line_trims() {
        let (_tmp, probe) = probe_with(&[("/etc/timezone", "Europe/Berlin\n")]);
        assert_eq!(
            probe.read_line(Path::new("/etc/timezone")).unwrap(),
            "Europe/Berlin"
        );
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let (_tmp, probe) = probe_with(&[]);
        let err = probe.read_line(Path::new("/etc/hostname")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_exists_resolves_below_root() {
        let (tmp, probe) = probe_with(&[]);
        fs::create_dir_all(tmp.path().join("var/gd-tools/lost+found")).unwrap();
        assert!(probe.exists(Path::new("/var/gd-tools/lost+found")));
        assert!(!probe.exists(Path::new("/mnt/HC_Volume_1")));
    }

    #[test]
    fn test_append_line_is_idempotent() {
        let (tmp, probe) = probe_with(&[("/etc/fstab", "proc /proc proc defaults 0 0\n")]);
        let guard = Regex::new("1234-ABCD").unwrap();
        let line = "UUID=1234-ABCD /var/gd-tools ext4 defaults,nofail 0 0";

        assert!(probe.append_line(Path::new("/etc/fstab"), &guard, line).unwrap());
        assert!(!probe.append_line(Path::new("/etc/fstab"), &guard, line).unwrap());

        let content = fs::read_to_string(tmp.path().join("etc/fstab")).unwrap();
        assert_eq!(content.matches("1234-ABCD").count(), 1);
        assert!(content.starts_with("proc /proc"));
        assert!(content.ends_with("nofail 0 0\n"));
    }

    #[test]
    fn test_append_line_creates_missing_file() {
        let (tmp, probe) = probe_with(&[]);
        fs::create_dir_all(tmp.path().join("etc")).unwrap();
        let guard = Regex::new(r"^/swap\.img\s").unwrap();
        probe
            .append_line(Path::new("/etc/fstab"), &guard, "/swap.img none swap sw 0 0")
            .unwrap();
        let content = fs::read_to_string(tmp.path().join("etc/fstab")).unwrap();
        assert_eq!(content, "/swap.img none swap sw 0 0\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_file_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (tmp, probe) = probe_with(&[]);
        fs::create_dir_all(tmp.path().join("etc")).unwrap();
        probe
            .write_file(Path::new("/etc/gd-tools-env"), b"prod\n", 0o444)
            .unwrap();
        let meta = fs::metadata(tmp.path().join("etc/gd-tools-env")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o444);
    }

    #[test]
    fn test_account_lookup() {
        let (_tmp, probe) = probe_with(&[
            ("/etc/passwd", "gd-tools:x:998:998::/home/gd-tools:/bin/bash\n"),
            ("/etc/group", "gd-tools:x:998:\ndocker:x:999:gd-tools\n"),
        ]);
        let account = probe.account("gd-tools").unwrap().unwrap();
        assert_eq!(account.uid, 998);
        assert!(account.in_group("docker"));
        assert_eq!(probe.group_id("docker").unwrap(), Some(999));
        assert_eq!(probe.group_id("wheel").unwrap(), None);
        assert!(probe.account("root").unwrap().is_none());
    }
}
