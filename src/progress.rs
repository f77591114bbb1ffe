//! Apply progress bar for chprov

use chdb::{ApplyResult, ProgressCallback};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar that also keeps every failure for the final report
pub struct ApplyProgress {
    bar: ProgressBar,
    quiet: bool,
    failures: Vec<(String, String)>,
}

impl ApplyProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet,
            failures: Vec::new(),
        }
    }

    /// `(database, error)` for every failed database, in apply order
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }
}

fn symbol(result: &ApplyResult) -> colored::ColoredString {
    match result {
        ApplyResult::NoChange => "○".dimmed(),
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓".green(),
        ApplyResult::Failed { .. } => "✗".red(),
        ApplyResult::Skipped { .. } => "⊘".yellow(),
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_pass_start(&mut self, changes: usize) {
        if self.quiet {
            return;
        }
        self.bar = ProgressBar::new(changes as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            self.bar.set_style(style.progress_chars("=>-"));
        }
        self.bar.set_message("Applying");
    }

    fn on_resource_complete(&mut self, name: &str, result: &ApplyResult) {
        if let ApplyResult::Failed { error } = result {
            self.failures.push((name.to_string(), error.clone()));
        }
        self.bar.set_message(format!("{} {name}", symbol(result)));
        self.bar.inc(1);
    }

    fn on_pass_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_failures() {
        let mut progress = ApplyProgress::new(true);
        progress.on_pass_start(2);
        progress.on_resource_complete("a", &ApplyResult::Created);
        progress.on_resource_complete(
            "b",
            &ApplyResult::Failed {
                error: "Code: 81. Database exists".into(),
            },
        );
        progress.on_pass_complete();

        assert_eq!(
            progress.failures(),
            [("b".to_string(), "Code: 81. Database exists".to_string())]
        );
    }
}
