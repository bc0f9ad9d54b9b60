//! Sentinel extraction from captured sandbox stdout.

use regex::Regex;
use std::sync::OnceLock;

pub const NO_OUTPUT: &str = "No output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    pub visible: String,
    pub elapsed_ms: u64,
}

fn sentinel() -> &'static Regex {
    static SENTINEL: OnceLock<Regex> = OnceLock::new();
    SENTINEL.get_or_init(|| Regex::new(r"^TIME_MS=(\d+)$").expect("sentinel pattern is valid"))
}

/// Split off the `TIME_MS=<n>` line. The driver prints it last, so the last
/// match wins over anything the candidate printed. A missing or out-of-range
/// value reads as 0; an empty remainder becomes [`NO_OUTPUT`].
pub fn parse(raw_output: &str) -> ParsedOutput {
    let lines: Vec<&str> = raw_output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .collect();

    let sentinel_at = lines.iter().rposition(|line| sentinel().is_match(line));
    let elapsed_ms = sentinel_at
        .and_then(|idx| sentinel().captures(lines[idx]))
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .unwrap_or(0);

    let visible = lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != sentinel_at)
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n");
    let visible = if visible.trim().is_empty() {
        NO_OUTPUT.to_string()
    } else {
        visible
    };

    ParsedOutput {
        visible,
        elapsed_ms,
    }
}
