use colored::Colorize;
use declarative::{ApplyResult, ExecuteSummary};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

/// Symbol and word for a finished step
pub fn result_label(result: &ApplyResult, preview: bool) -> (&'static str, String) {
    match result {
        ApplyResult::NoChange => ("✓", "ok".to_string()),
        ApplyResult::Created if preview => ("ℹ", "would create".to_string()),
        ApplyResult::Modified if preview => ("ℹ", "would change".to_string()),
        ApplyResult::Created => ("✓", "created".to_string()),
        ApplyResult::Modified => ("✓", "changed".to_string()),
        ApplyResult::Skipped { reason } => ("○", format!("skipped ({reason})")),
    }
}

/// One line per finished step
pub fn step_result(id: &str, result: &ApplyResult, preview: bool) {
    let (symbol, label) = result_label(result, preview);
    let symbol = match result {
        ApplyResult::NoChange => symbol.green(),
        ApplyResult::Skipped { .. } => symbol.dimmed(),
        _ if preview => symbol.blue(),
        _ => symbol.green(),
    };
    println!("  {symbol} {id}: {}", label.dimmed());
}

/// Final summary of a run
pub fn summary(summary: &ExecuteSummary, preview: bool) {
    println!();
    if summary.total_changes() == 0 {
        success("Host already matches the desired state");
    } else if preview {
        info(&format!(
            "Preview: {} steps would change the host",
            summary.total_changes()
        ));
    } else {
        success(&format!("{} steps changed the host", summary.total_changes()));
    }
    if summary.skipped > 0 {
        dim(&format!("{} steps skipped", summary.skipped));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_labels() {
        assert_eq!(result_label(&ApplyResult::NoChange, false).1, "ok");
        assert_eq!(result_label(&ApplyResult::Created, false).1, "created");
        assert_eq!(result_label(&ApplyResult::Created, true).1, "would create");
        assert_eq!(result_label(&ApplyResult::Modified, true).0, "ℹ");
        let skipped = ApplyResult::Skipped {
            reason: "swap disabled".into(),
        };
        assert_eq!(result_label(&skipped, true).1, "skipped (swap disabled)");
    }
}
