use crate::Binding;
use jsonpath_mapper::{MapMetrics, RuleMetrics, RuleOutcome};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// Print the run report to stderr so stdout stays valid JSON.
pub fn print_run(bindings: &[Binding], metrics: &MapMetrics, color: bool) {
    let palette = ansi::Palette::new(color);
    let execution = &metrics.execution;
    eprintln!(
        "\n{}",
        palette.bold(palette.paint(format!("⚙  Mapping {} rules ({:?})", bindings.len(), execution.mode), ansi::CYAN))
    );

    eprintln!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    if execution.rules.is_empty() {
        eprintln!("{}", palette.dim("  No rules evaluated"));
    }
    for (binding, rule) in bindings.iter().zip(&execution.rules) {
        eprintln!("  {}", fmt_rule(binding, rule, &palette));
    }
    // Sequential runs stop at the first failure.
    for binding in bindings.iter().skip(execution.rules.len()) {
        eprintln!(
            "  {} {} {} {}",
            palette.bold(palette.paint(&binding.name, ansi::BLUE)),
            palette.dim("←"),
            palette.paint(&binding.path, ansi::CYAN),
            palette.dim("· not reached"),
        );
    }

    eprintln!("\n{}", palette.paint("━━━ Outcomes ━━━", ansi::GRAY));
    eprintln!(
        "  {} {}  {} {}  {} {}  {} {}",
        palette.dim("applied:"),
        palette.paint(execution.count(RuleOutcome::Applied).to_string(), ansi::GREEN),
        palette.dim("skipped:"),
        palette.paint(execution.count(RuleOutcome::Skipped).to_string(), ansi::YELLOW),
        palette.dim("failed:"),
        palette.paint(execution.count(RuleOutcome::Failed).to_string(), ansi::RED),
        palette.dim("discarded:"),
        palette.paint(execution.count(RuleOutcome::Discarded).to_string(), ansi::GRAY),
    );

    eprintln!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    eprintln!(
        "  Total: {}  │  Parse: {}  │  Evaluate: {}  │  Apply: {}",
        palette.paint(format!("{:?}", metrics.total), ansi::GREEN),
        palette.dim(format!("{:?}", metrics.parse)),
        palette.paint(format!("{:?}", execution.evaluate), ansi::CYAN),
        palette.dim(format!("{:?}", execution.apply)),
    );
    eprintln!();
}

fn fmt_rule(binding: &Binding, rule: &RuleMetrics, palette: &ansi::Palette) -> String {
    let outcome = match rule.outcome {
        RuleOutcome::Applied => palette.paint("✓ applied", ansi::GREEN),
        RuleOutcome::Skipped => palette.paint("○ skipped", ansi::YELLOW),
        RuleOutcome::Failed => palette.paint("✗ failed", ansi::RED),
        RuleOutcome::Discarded => palette.dim("- discarded"),
    };
    format!(
        "{} {} {} {}  {}",
        palette.bold(palette.paint(&binding.name, ansi::BLUE)),
        palette.dim("←"),
        palette.paint(&rule.path, ansi::CYAN),
        outcome,
        palette.dim(format!("{:?}", rule.duration)),
    )
}
