//! Diff display for `gd-tools diff`

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState};

/// Section heading for a step type
fn type_heading(resource_type: &str) -> &str {
    match resource_type {
        "time_zone" => "Time zone",
        "host_name" => "Host name",
        "swap" => "Swap",
        "docker_repo" => "Docker repository",
        "packages" => "Packages and services",
        "mount" => "Volumes",
        "firewall" => "Firewall (ufw)",
        "user" => "Service account",
        "collect" => "Certificate and ids",
        other => other,
    }
}

/// One-line description of the change
fn state_text(current: &ResourceState, desired: &ResourceState) -> String {
    match (current, desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => format!(
            "(missing){}",
            details
                .as_ref()
                .map(|d| format!(" → {d}"))
                .unwrap_or_default()
        ),
        (ResourceState::Present { details: from }, ResourceState::Present { details: to }) => {
            format!(
                "{} → {}",
                from.as_deref().unwrap_or("current"),
                to.as_deref().unwrap_or("desired")
            )
        }
        (ResourceState::Modified { from, to }, _) => format!("{from} → {to}"),
        _ => String::new(),
    }
}

/// Print pending changes grouped by step type, in plan order
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} Host already matches the configuration", "✓".green());
        return;
    }

    let mut groups: Vec<(&str, Vec<&ResourceDiff>)> = Vec::new();
    for diff in diffs {
        match groups
            .iter_mut()
            .find(|(t, _)| *t == diff.resource_type.as_str())
        {
            Some((_, group)) => group.push(diff),
            None => groups.push((diff.resource_type.as_str(), vec![diff])),
        }
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Host Diff".bold()
    );
    println!("│");

    for (resource_type, group) in &groups {
        println!("│ {}", type_heading(resource_type).bold());
        for diff in group {
            let symbol = if diff.is_addition() {
                "+".green()
            } else if diff.is_modification() {
                "~".yellow()
            } else {
                "?".dimmed()
            };
            println!(
                "│   {} {:<30} {}",
                symbol,
                diff.resource_id,
                state_text(&diff.current, &diff.desired).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} new, {} modified)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_text() {
        assert_eq!(
            state_text(&ResourceState::Absent, &ResourceState::present_with("OpenSSH")),
            "(missing) → OpenSSH"
        );
        assert_eq!(
            state_text(
                &ResourceState::present_with("Etc/UTC"),
                &ResourceState::present_with("Europe/Berlin")
            ),
            "Etc/UTC → Europe/Berlin"
        );
        assert_eq!(
            state_text(
                &ResourceState::Modified {
                    from: "missing rsync".into(),
                    to: "all installed".into()
                },
                &ResourceState::present()
            ),
            "missing rsync → all installed"
        );
    }

    #[test]
    fn test_headings() {
        assert_eq!(type_heading("mount"), "Volumes");
        assert_eq!(type_heading("custom"), "custom");
    }
}
