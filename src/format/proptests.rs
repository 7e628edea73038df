//! Property-based tests for the reply formatting pipeline
//!
//! These verify the invariants the formatter promises its caller:
//! - It never panics, whatever text the endpoint produced
//! - It always yields at least one segment
//! - Every emitted table row matches the header width exactly
//! - Re-formatting its own paragraph output is a fixed point

use super::{format_reply, RenderSegment};
use proptest::prelude::*;

/// Free-form reply text: words, bars, dashes, tags, newlines.
fn arb_reply_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zA-Z0-9 ,.]{0,40}",
            2 => Just("| A | B | C |".to_string()),
            2 => Just("|---|---|---|".to_string()),
            1 => Just("| 1 | x | y |".to_string()),
            1 => Just("| 1 | 2 |".to_string()),
            1 => Just("<name>genie</name>".to_string()),
            1 => Just("<name>supervisor</name>".to_string()),
            1 => Just("EMPTY".to_string()),
            1 => Just(String::new()),
        ],
        0..12,
    )
    .prop_map(|lines| lines.join("\n"))
}

/// A syntactically well-formed pipe table.
fn arb_table_text() -> impl Strategy<Value = (String, usize, usize)> {
    (1usize..5, 1usize..6).prop_map(|(cols, data_rows)| {
        let header: Vec<String> = (0..cols).map(|c| format!("col{c}")).collect();
        let separator: Vec<&str> = (0..cols).map(|_| "---").collect();
        let mut lines = vec![
            format!("| {} |", header.join(" | ")),
            format!("|{}|", separator.join("|")),
        ];
        for r in 0..data_rows {
            let cells: Vec<String> = (0..cols).map(|c| format!("v{r}_{c}")).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }
        (lines.join("\n"), cols, data_rows)
    })
}

fn paragraph_texts(segments: &[RenderSegment]) -> Vec<String> {
    segments
        .iter()
        .filter_map(|s| match s {
            RenderSegment::Paragraph { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn formatter_never_panics_and_never_returns_empty(text in arb_reply_text()) {
        let segments = format_reply(&text);
        prop_assert!(!segments.is_empty());
    }

    #[test]
    fn emitted_rows_always_match_header_width(text in arb_reply_text()) {
        for segment in format_reply(&text) {
            if let RenderSegment::Table { header, rows } = segment {
                prop_assert!(!header.is_empty());
                prop_assert!(!rows.is_empty());
                for row in rows {
                    prop_assert_eq!(row.len(), header.len());
                }
            }
        }
    }

    #[test]
    fn at_most_one_table_is_emitted(text in arb_reply_text()) {
        let tables = format_reply(&text)
            .iter()
            .filter(|s| matches!(s, RenderSegment::Table { .. }))
            .count();
        prop_assert!(tables <= 1);
    }

    #[test]
    fn well_formed_table_round_trips((text, cols, data_rows) in arb_table_text()) {
        let segments = format_reply(&text);
        let table = segments.iter().find_map(|s| match s {
            RenderSegment::Table { header, rows } => Some((header, rows)),
            _ => None,
        });
        let (header, rows) = table.expect("well-formed table should be emitted");
        prop_assert_eq!(header.len(), cols);
        prop_assert!(rows.len() <= data_rows);
    }

    #[test]
    fn paragraph_output_is_a_fixed_point(text in arb_reply_text()) {
        let first = paragraph_texts(&format_reply(&text));
        if first.is_empty() {
            return Ok(());
        }
        let rejoined = first.join("\n\n");
        let second = paragraph_texts(&format_reply(&rejoined));
        prop_assert_eq!(first, second);
    }
}
