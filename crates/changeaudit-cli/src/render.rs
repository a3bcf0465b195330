//! Plain-text report rendering

use changeaudit_core::AuditReport;
use std::io::{self, Write};

const DESCRIPTION_WIDTH: usize = 60;

/// Write the report as an aligned table followed by a summary line
pub fn write_table<W: Write>(report: &AuditReport, mut out: W) -> io::Result<()> {
    writeln!(
        out,
        "{:<4} {:<10} {:<9} {:>5}  {:<10} {}",
        "#", "Q", "KIND", "SIM", "CLASS", "DESCRIPTION"
    )?;

    for (index, entry) in report.entries.iter().enumerate() {
        let similarity = entry
            .pair
            .similarity
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:<4} {:<10} {:<9} {:>5}  {:<10} {}",
            index + 1,
            clip(&entry.verdict.refined_q_no, 10),
            entry.pair.kind.as_str(),
            similarity,
            clip(entry.verdict.classification.as_deref().unwrap_or("-"), 10),
            clip(&entry.verdict.description, DESCRIPTION_WIDTH)
        )?;
    }

    let summary = report.summary();
    writeln!(
        out,
        "\n{} modified, {} inserted, {} deleted, {} unchanged, {} failed",
        summary.modified, summary.inserted, summary.deleted, summary.unchanged, summary.errors
    )
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use changeaudit_core::{AlignedPair, PairKind, ReportEntry, Segment, Verdict};

    #[test]
    fn test_table_lists_entries_in_order() {
        let report = AuditReport::new(
            3,
            vec![
                ReportEntry {
                    pair: AlignedPair::both(
                        Segment::new("Q1", "limit is 5", 0),
                        Segment::new("Q1", "limit is 50", 0),
                        0.95,
                        PairKind::Modified,
                    ),
                    verdict: Verdict::new("Limit raised", "Q1").with_classification("numerical"),
                },
                ReportEntry {
                    pair: AlignedPair::inserted(Segment::new("Q2", "New question", 1)),
                    verdict: Verdict::sentinel("timed out"),
                },
            ],
        );

        let mut out = Vec::new();
        write_table(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[1].contains("Limit raised"));
        assert!(lines[1].contains("0.95"));
        assert!(lines[2].contains("inserted"));
        assert!(lines[2].contains(Verdict::ERROR_DESCRIPTION));
        assert!(text.contains("1 modified, 1 inserted, 0 deleted, 3 unchanged, 1 failed"));
    }

    #[test]
    fn test_clip_marks_truncation() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghijkl", 5), "abcd…");
    }
}
