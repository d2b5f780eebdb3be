//! In-memory host for tests.
//!
//! [`MockHost`] implements both [`CommandRunner`] and [`StateProbe`] over one
//! shared simulated machine. It understands the command lines the provisioning
//! steps emit well enough to update its state (a `timedatectl set-timezone`
//! rewrites `/etc/timezone`, `mount -a` mounts whatever fstab names, and so
//! on), so a second run against the same mock sees a converged host.
//!
//! Every executed command, preview echo, probe and file write is recorded.

use crate::error::{Error, Result};
use crate::probe::{GROUP_PATH, PASSWD_PATH, StateProbe};
use crate::runner::{CommandOutput, CommandRunner, split_command};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const FIRST_SYSTEM_UID: u32 = 998;

/// Simulated machine state
#[derive(Debug, Default)]
pub struct MockState {
    pub files: BTreeMap<PathBuf, String>,
    pub dirs: BTreeSet<PathBuf>,
    pub packages: BTreeSet<String>,
    pub active_services: BTreeSet<String>,
    pub firewall_active: bool,
    pub firewall_rules: Vec<String>,
    pub device_uuids: BTreeMap<String, String>,
    pub urls: BTreeMap<String, Vec<u8>>,
    pub failing: BTreeSet<String>,
    next_uid: u32,

    /// Commands that were actually run, in order
    pub executed: Vec<String>,
    /// Commands that were only echoed, in order
    pub previewed: Vec<String>,
    /// Read-only commands, in order
    pub probes: Vec<String>,
    /// Files written through the probe, in order
    pub writes: Vec<PathBuf>,
}

/// A simulated host
#[derive(Debug, Default)]
pub struct MockHost {
    state: Mutex<MockState>,
}

impl MockHost {
    /// A host with a root account and an empty fstab.
    pub fn new() -> Self {
        let host = Self::default();
        {
            let mut state = host.lock();
            state.next_uid = FIRST_SYSTEM_UID;
            state.files.insert(
                PathBuf::from(PASSWD_PATH),
                "root:x:0:0:root:/root:/bin/bash\n".to_string(),
            );
            state.files.insert(
                PathBuf::from(GROUP_PATH),
                "root:x:0:\ndocker:x:999:\n".to_string(),
            );
            state
                .files
                .insert(PathBuf::from("/etc/fstab"), String::new());
        }
        host
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.lock()
            .files
            .insert(PathBuf::from(path), content.to_string());
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.lock().dirs.insert(PathBuf::from(path));
        self
    }

    pub fn with_package(self, name: &str) -> Self {
        self.lock().packages.insert(name.to_string());
        self
    }

    pub fn with_active_service(self, name: &str) -> Self {
        self.lock().active_services.insert(name.to_string());
        self
    }

    pub fn with_firewall(self, active: bool, rules: &[&str]) -> Self {
        {
            let mut state = self.lock();
            state.firewall_active = active;
            state.firewall_rules = rules.iter().map(|r| (*r).to_string()).collect();
        }
        self
    }

    pub fn with_device_uuid(self, device: &str, uuid: &str) -> Self {
        self.lock()
            .device_uuids
            .insert(device.to_string(), uuid.to_string());
        self
    }

    pub fn with_url(self, url: &str, body: &[u8]) -> Self {
        self.lock().urls.insert(url.to_string(), body.to_vec());
        self
    }

    /// Make an exact command line fail when run.
    pub fn failing_on(self, command: &str) -> Self {
        self.lock().failing.insert(command.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    pub fn previewed(&self) -> Vec<String> {
        self.lock().previewed.clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.lock().probes.clone()
    }

    pub fn writes(&self) -> Vec<PathBuf> {
        self.lock().writes.clone()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.lock().files.get(Path::new(path)).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.lock().dirs.contains(Path::new(path))
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.lock().packages.contains(name)
    }

    /// Forget everything recorded so far, keeping the machine state.
    pub fn clear_records(&self) {
        let mut state = self.lock();
        state.executed.clear();
        state.previewed.clear();
        state.probes.clear();
        state.writes.clear();
    }
}

impl MockState {
    fn apply(&mut self, program: &str, args: &[&str]) -> Result<()> {
        match (program, args) {
            ("timedatectl", ["set-timezone", zone]) => {
                self.write("/etc/timezone", format!("{zone}\n"));
            }
            ("hostnamectl", ["set-hostname", name]) => {
                self.write("/etc/hostname", format!("{name}\n"));
            }
            ("fallocate", [.., path]) => self.write(path, String::new()),
            ("apt-get", ["install", "-y", packages @ ..]) => {
                self.packages
                    .extend(packages.iter().map(|p| (*p).to_string()));
            }
            ("systemctl", ["enable", "--now", service]) => {
                self.active_services.insert((*service).to_string());
            }
            ("mount", ["-a"]) => self.mount_all(),
            ("umount", [path]) => {
                let path = Path::new(path);
                self.dirs.retain(|d| d == path || !d.starts_with(path));
            }
            ("mkdir", ["-p", path]) => {
                self.dirs.insert(PathBuf::from(path));
            }
            ("rmdir", [path]) => {
                self.dirs.remove(Path::new(path));
            }
            ("sed", ["-i", "-e", expr, file]) => self.substitute(expr, file),
            ("ufw", ["allow", rule]) => self.firewall_rules.push((*rule).to_string()),
            ("ufw", ["enable"] | ["--force", "enable"]) => self.firewall_active = true,
            ("useradd", [.., name]) => self.add_user(name),
            ("usermod", ["-aG", group, name]) => self.add_member(group, name),
            ("install", args) => self.install(args)?,
            ("certbot", args) => {
                if let Some(pos) = args.iter().position(|a| *a == "-d") {
                    if let Some(domain) = args.get(pos + 1) {
                        self.write(
                            &format!("/etc/letsencrypt/live/{domain}/fullchain.pem"),
                            "certificate".to_string(),
                        );
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn write(&mut self, path: &str, content: String) {
        self.files.insert(PathBuf::from(path), content);
    }

    fn mount_all(&mut self) {
        let fstab = self
            .files
            .get(Path::new("/etc/fstab"))
            .cloned()
            .unwrap_or_default();
        for line in fstab.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if let [_, mountpoint, fs_type, ..] = fields.as_slice() {
                if *mountpoint != "none" && *fs_type != "swap" {
                    self.dirs.insert(Path::new(mountpoint).join("lost+found"));
                }
            }
        }
    }

    fn substitute(&mut self, expr: &str, file: &str) {
        let parts: Vec<&str> = expr.split('#').collect();
        if let ["s", from, to, ""] = parts.as_slice() {
            if let Some(content) = self.files.get_mut(Path::new(file)) {
                *content = content.replace(from, to);
            }
        }
    }

    fn add_user(&mut self, name: &str) {
        let uid = self.next_uid;
        self.next_uid = self.next_uid.saturating_sub(1);
        self.files
            .entry(PathBuf::from(PASSWD_PATH))
            .or_default()
            .push_str(&format!("{name}:x:{uid}:{uid}::/home/{name}:/bin/bash\n"));
        self.files
            .entry(PathBuf::from(GROUP_PATH))
            .or_default()
            .push_str(&format!("{name}:x:{uid}:\n"));
        self.dirs.insert(Path::new("/home").join(name));
    }

    fn add_member(&mut self, group: &str, name: &str) {
        let Some(content) = self.files.get_mut(Path::new(GROUP_PATH)) else {
            return;
        };
        let updated: Vec<String> = content
            .lines()
            .map(|line| {
                if line.split(':').next() == Some(group) {
                    if line.ends_with(':') {
                        format!("{line}{name}")
                    } else {
                        format!("{line},{name}")
                    }
                } else {
                    line.to_string()
                }
            })
            .collect();
        *content = updated.join("\n") + "\n";
    }

    fn install(&mut self, args: &[&str]) -> Result<()> {
        let directory = args.contains(&"-d");
        let paths: Vec<&str> = args
            .iter()
            .enumerate()
            .filter(|(i, a)| {
                !a.starts_with('-') && !matches!(args.get(i.wrapping_sub(1)), Some(&"-o" | &"-g" | &"-m"))
            })
            .map(|(_, a)| *a)
            .collect();

        if directory {
            for path in paths {
                self.dirs.insert(PathBuf::from(path));
            }
            return Ok(());
        }

        if let [source, target] = paths.as_slice() {
            let content = self
                .files
                .get(Path::new(source))
                .cloned()
                .ok_or_else(|| Error::CommandFailed {
                    command: format!("install {}", args.join(" ")),
                    status: "exit status: 1".to_string(),
                    stderr: format!("cannot stat '{source}'"),
                })?;
            let mut destination = PathBuf::from(target);
            if self.dirs.contains(&destination) {
                if let Some(name) = Path::new(source).file_name() {
                    destination = destination.join(name);
                }
            }
            self.files.insert(destination, content);
        }
        Ok(())
    }

    fn respond(&self, program: &str, args: &[&str]) -> CommandOutput {
        let ok = |stdout: String| CommandOutput {
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
            success: true,
        };
        let fail = CommandOutput {
            stdout: Vec::new(),
            stderr: b"not found".to_vec(),
            success: false,
        };

        match (program, args) {
            ("dpkg-query", [.., package]) => {
                if self.packages.contains(*package) {
                    ok("install ok installed".to_string())
                } else {
                    fail
                }
            }
            ("systemctl", ["is-active", service]) => {
                if self.active_services.contains(*service) {
                    ok("active\n".to_string())
                } else {
                    fail
                }
            }
            ("ufw", ["status"]) => {
                if self.firewall_active {
                    ok("Status: active\n".to_string())
                } else {
                    ok("Status: inactive\n".to_string())
                }
            }
            ("ufw", ["show", "added"]) => {
                let mut out =
                    "Added user rules (see 'ufw status' for running firewall):\n".to_string();
                for rule in &self.firewall_rules {
                    out.push_str(&format!("ufw allow {rule}\n"));
                }
                ok(out)
            }
            ("blkid", [.., device]) => self
                .device_uuids
                .get(*device)
                .map_or(fail, |uuid| ok(format!("{uuid}\n"))),
            _ => ok(String::new()),
        }
    }
}

impl CommandRunner for MockHost {
    fn run(&self, command: &str, preview: bool) -> Result<()> {
        let (program, args) = split_command(command)?;
        let mut state = self.lock();

        if preview {
            state.previewed.push(command.to_string());
            return Ok(());
        }

        state.executed.push(command.to_string());
        if state.failing.contains(command) {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                stderr: String::new(),
            });
        }
        state.apply(program, &args)
    }

    fn output(&self, command: &str) -> Result<CommandOutput> {
        let (program, args) = split_command(command)?;
        let mut state = self.lock();
        state.probes.push(command.to_string());
        Ok(state.respond(program, &args))
    }
}

impl StateProbe for MockHost {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Read {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8], _mode: u32) -> Result<()> {
        let mut state = self.lock();
        state.writes.push(path.to_path_buf());
        state.files.insert(
            path.to_path_buf(),
            String::from_utf8_lossy(contents).to_string(),
        );
        Ok(())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.lock()
            .urls
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Fetch {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_commands_update_state() {
        let host = MockHost::new();
        host.run("timedatectl set-timezone Europe/Berlin", false)
            .unwrap();
        host.run("apt-get install -y git", false).unwrap();

        assert_eq!(
            host.read_line(Path::new("/etc/timezone")).unwrap(),
            "Europe/Berlin"
        );
        assert!(host.succeeds("dpkg-query -W -f=${Status} git"));
        assert_eq!(
            host.executed(),
            vec![
                "timedatectl set-timezone Europe/Berlin",
                "apt-get install -y git"
            ]
        );
    }

    #[test]
    fn test_preview_is_recorded_but_not_applied() {
        let host = MockHost::new();
        host.run("hostnamectl set-hostname example.com", true)
            .unwrap();
        assert!(host.file("/etc/hostname").is_none());
        assert!(host.executed().is_empty());
        assert_eq!(host.previewed(), vec!["hostnamectl set-hostname example.com"]);
    }

    #[test]
    fn test_failing_command() {
        let host = MockHost::new().failing_on("apt-get install -y vim");
        assert!(host.run("apt-get install -y vim", false).is_err());
        assert!(!host.has_package("vim"));
    }

    #[test]
    fn test_mount_all_marks_fstab_entries() {
        let host = MockHost::new().with_file(
            "/etc/fstab",
            "UUID=1234 /var/gd-tools ext4 defaults,nofail 0 0\n/swap.img none swap sw 0 0\n",
        );
        host.run("mount -a", false).unwrap();
        assert!(host.exists(Path::new("/var/gd-tools/lost+found")));
        assert!(!host.exists(Path::new("none/lost+found")));
    }

    #[test]
    fn test_user_and_group_membership() {
        let host = MockHost::new();
        host.run("useradd -r -m -s /bin/bash gd-tools", false)
            .unwrap();
        host.run("usermod -aG docker gd-tools", false).unwrap();
        let account = host.account("gd-tools").unwrap().unwrap();
        assert_eq!(account.uid, 998);
        assert!(account.in_group("docker"));
        assert!(host.has_dir("/home/gd-tools"));
    }

    #[test]
    fn test_install_copies_into_directory() {
        let host = MockHost::new().with_file("/root/.ssh/authorized_keys", "ssh-ed25519 AAAA");
        host.run(
            "install -o gd-tools -g gd-tools -m 700 -d /home/gd-tools/.ssh",
            false,
        )
        .unwrap();
        host.run(
            "install -o gd-tools -g gd-tools -m 600 /root/.ssh/authorized_keys /home/gd-tools/.ssh",
            false,
        )
        .unwrap();
        assert_eq!(
            host.file("/home/gd-tools/.ssh/authorized_keys").as_deref(),
            Some("ssh-ed25519 AAAA")
        );
    }

    #[test]
    fn test_firewall_probes() {
        let host = MockHost::new().with_firewall(false, &["OpenSSH"]);
        let active = Regex::new("Status: active").unwrap();
        assert!(!host.matches("ufw status", &active).unwrap());
        let rule = Regex::new("(?m)^ufw allow OpenSSH$").unwrap();
        assert!(host.matches("ufw show added", &rule).unwrap());
    }
}
