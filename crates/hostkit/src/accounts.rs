//! Parsing of `/etc/passwd` and `/etc/group`.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// A local user account with its resolved group memberships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
    /// Names of the primary and all supplementary groups
    pub groups: Vec<String>,
}

impl Account {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
    pub shell: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

fn significant_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

fn parse_id(path: &Path, line: &str, field: Option<&str>) -> Result<u32> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| Error::Malformed {
            path: path.to_path_buf(),
            line: line.to_string(),
        })
}

/// Parse passwd(5) content. `path` is only used in error messages.
pub fn parse_passwd(path: &Path, content: &str) -> Result<Vec<PasswdEntry>> {
    significant_lines(content)
        .map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 7 {
                return Err(Error::Malformed {
                    path: path.to_path_buf(),
                    line: line.to_string(),
                });
            }
            Ok(PasswdEntry {
                name: fields[0].to_string(),
                uid: parse_id(path, line, fields.get(2).copied())?,
                gid: parse_id(path, line, fields.get(3).copied())?,
                home: PathBuf::from(fields[5]),
                shell: fields[6].to_string(),
            })
        })
        .collect()
}

/// Parse group(5) content. `path` is only used in error messages.
pub fn parse_group(path: &Path, content: &str) -> Result<Vec<GroupEntry>> {
    significant_lines(content)
        .map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 4 {
                return Err(Error::Malformed {
                    path: path.to_path_buf(),
                    line: line.to_string(),
                });
            }
            Ok(GroupEntry {
                name: fields[0].to_string(),
                gid: parse_id(path, line, fields.get(2).copied())?,
                members: fields[3]
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// Resolve an account and its group names from parsed databases.
pub fn resolve_account(
    name: &str,
    passwd: &[PasswdEntry],
    groups: &[GroupEntry],
) -> Option<Account> {
    let entry = passwd.iter().find(|p| p.name == name)?;

    let mut names: Vec<String> = Vec::new();
    if let Some(primary) = groups.iter().find(|g| g.gid == entry.gid) {
        names.push(primary.name.clone());
    }
    for group in groups.iter().filter(|g| g.members.iter().any(|m| m == name)) {
        if !names.contains(&group.name) {
            names.push(group.name.clone());
        }
    }

    Some(Account {
        name: entry.name.clone(),
        uid: entry.uid,
        gid: entry.gid,
        home: entry.home.clone(),
        groups: names,
    })
}
