//! Parsers for `git branch` listings.
//!
//! Each listing line starts with a two-column marker (`* ` for the checked-out
//! branch, two spaces otherwise) followed by whitespace-separated fields.

use std::collections::BTreeMap;

use crate::executor::OutputLog;

/// Branch names from `git branch`, in listing order.
pub fn parse_branches(log: &OutputLog) -> Vec<String> {
    listing_fields(&log.joined())
        .filter_map(|mut fields| fields.next().map(str::to_owned))
        .collect()
}

/// Branch name to tip-commit short hash, from `git branch -v`.
///
/// Lines without a hash column are skipped; a repeated name keeps the later
/// entry.
pub fn parse_branches_with_tips(log: &OutputLog) -> BTreeMap<String, String> {
    listing_fields(&log.joined())
        .filter_map(|mut fields| {
            let name = fields.next()?;
            let tip = fields.next()?;
            Some((name.to_owned(), tip.to_owned()))
        })
        .collect()
}

/// Whitespace-split fields of every non-blank line, marker column removed.
fn listing_fields(text: &str) -> impl Iterator<Item = std::str::SplitWhitespace<'_>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| strip_marker(line).split_whitespace())
}

fn strip_marker(line: &str) -> &str {
    line.char_indices().nth(2).map_or("", |(idx, _)| &line[idx..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::OutputChunk;

    fn log(lines: &[&str]) -> OutputLog {
        lines.iter().map(|l| OutputChunk::stdout(*l)).collect()
    }

    #[test]
    fn branches_keep_listing_order_without_marker() {
        let log = log(&["* feature", "  main"]);
        assert_eq!(parse_branches(&log), ["feature", "main"]);
    }

    #[test]
    fn branches_skip_blank_lines() {
        let log = log(&["  main", "", "   ", "* topic/x"]);
        assert_eq!(parse_branches(&log), ["main", "topic/x"]);
    }

    #[test]
    fn branches_from_single_multiline_chunk() {
        let log = log(&["* dev\n  master\n"]);
        assert_eq!(parse_branches(&log), ["dev", "master"]);
    }

    #[test]
    fn empty_listing_yields_nothing() {
        assert!(parse_branches(&OutputLog::default()).is_empty());
        assert!(parse_branches_with_tips(&OutputLog::default()).is_empty());
    }

    #[test]
    fn tips_map_name_to_hash() {
        let log = log(&["* feature 1a2b3c msg", "  main    4d5e6f msg"]);
        let tips = parse_branches_with_tips(&log);
        assert_eq!(tips.len(), 2);
        assert_eq!(tips["feature"], "1a2b3c");
        assert_eq!(tips["main"], "4d5e6f");
    }

    #[test]
    fn tips_later_duplicate_wins() {
        let log = log(&["  main 111111 first", "  main 222222 second"]);
        assert_eq!(parse_branches_with_tips(&log)["main"], "222222");
    }

    #[test]
    fn tips_skip_lines_without_hash() {
        let log = log(&["* lonely", "  main 4d5e6f msg"]);
        let tips = parse_branches_with_tips(&log);
        assert_eq!(tips.len(), 1);
        assert!(!tips.contains_key("lonely"));
    }

    #[test]
    fn marker_strip_is_char_based() {
        assert_eq!(strip_marker("* été"), "été");
        assert_eq!(strip_marker("é"), "");
        assert_eq!(parse_branches(&log(&["  ветка abc"])), ["ветка"]);
    }
}
