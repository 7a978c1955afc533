//! Report parsing: the engine's standard output → one [`DecodeResult`] per image block.
//!
//! ## Report grammar
//!
//! ```text
//! file: <path>                 block delimiter
//! format: <FORMAT>, ...        optional
//! Raw result:
//! <raw text, one or more lines>
//! Parsed result:
//! <parsed text, one or more lines>
//! Found <N> result points.
//!   Point 0: (<x>,<y>)
//!   ...
//! ```
//!
//! or a block reading `No barcode found`, either on the `file:` line itself
//! or on the first non-blank line after it.
//!
//! ## Block splitting
//!
//! Every line starting with `file:` opens a new block. Lines before the first
//! marker form a block of their own only when one of them is non-blank, so a
//! report with `k` markers yields `k` results and an empty report yields none.
//!
//! ## Section order
//!
//! Each block is a single forward pass through `Header → Raw → Parsed →
//! Points`. The current section is an explicit tag, never inferred from which
//! accumulator happens to be non-empty, so a truncated block (format line but
//! no `Raw result:`) simply ends in `Header` with empty text.

use crate::error::ReportError;
use crate::output::{Barcode, DecodeResult, ResultPoint};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const BLOCK_MARKER: &str = "file:";
const NOT_FOUND: &str = "No barcode found";
const RAW_HEADER: &str = "Raw result:";
const PARSED_HEADER: &str = "Parsed result:";

static RE_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"format:\s([^,]+)").unwrap());

static RE_POINTS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Found\s\d+\sresult\spoints").unwrap());

static RE_POINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Point\s(\d+):\s\((-?[\d.]+),(-?[\d.]+)\)").unwrap());

/// Where the parser is inside one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Raw,
    Parsed,
    Points,
}

/// Parse a complete engine report.
///
/// Results come back in the order the engine emitted its blocks. A point
/// line with unparseable coordinates fails the whole report.
pub fn parse_report(report: &str) -> Result<Vec<DecodeResult>, ReportError> {
    let blocks = split_blocks(report);
    debug!("Engine report: {} block(s)", blocks.len());

    blocks
        .iter()
        .enumerate()
        .map(|(index, lines)| parse_block(index, lines))
        .collect()
}

fn split_blocks(report: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in report.lines() {
        if line.starts_with(BLOCK_MARKER) && !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    let blank_preamble = blocks.first().is_some_and(|first| {
        !first[0].starts_with(BLOCK_MARKER) && first.iter().all(|l| l.trim().is_empty())
    });
    if blank_preamble {
        blocks.remove(0);
    }

    blocks
}

fn parse_block(index: usize, lines: &[&str]) -> Result<DecodeResult, ReportError> {
    if is_not_found(lines) {
        return Ok(DecodeResult::NotFound);
    }

    let mut section = Section::Header;
    let mut barcode = Barcode::default();

    for &line in lines {
        match section {
            Section::Header => {
                if line == RAW_HEADER {
                    section = Section::Raw;
                } else if let Some(caps) = RE_FORMAT.captures(line) {
                    barcode.format = caps[1].trim().to_string();
                }
            }
            Section::Raw => {
                if line == PARSED_HEADER {
                    section = Section::Parsed;
                } else {
                    push_line(&mut barcode.raw_text, line);
                }
            }
            Section::Parsed => {
                if RE_POINTS_HEADER.is_match(line) {
                    section = Section::Points;
                } else {
                    push_line(&mut barcode.parsed_text, line);
                }
            }
            Section::Points => {
                if let Some(caps) = RE_POINT.captures(line) {
                    let x = parse_coordinate(index, line, &caps[2])?;
                    let y = parse_coordinate(index, line, &caps[3])?;
                    barcode.points.push(ResultPoint { x, y });
                }
            }
        }
    }

    if section != Section::Points {
        debug!("Block {index} ended early in {section:?}");
    }

    Ok(DecodeResult::Decoded(barcode))
}

/// The phrase either trails the `file:` delimiter on the same line or opens
/// the block's content on the first non-blank line after it.
fn is_not_found(lines: &[&str]) -> bool {
    let mut rest = lines.iter();
    match rest.next() {
        Some(first) if first.contains(NOT_FOUND) => true,
        Some(first) if first.starts_with(BLOCK_MARKER) => rest
            .find(|l| !l.trim().is_empty())
            .is_some_and(|l| l.trim_start().starts_with(NOT_FOUND)),
        _ => false,
    }
}

fn push_line(acc: &mut String, line: &str) {
    acc.push_str(line);
    acc.push('\n');
}

fn parse_coordinate(block: usize, line: &str, text: &str) -> Result<f64, ReportError> {
    text.parse::<f64>()
        .map_err(|source| ReportError::MalformedPoint {
            block,
            line: line.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QR_BLOCK: &str = "file: a.png\n\
format: QR_CODE, raw bytes\n\
Raw result:\n\
HELLO\n\
Parsed result:\n\
HELLO\n\
Found 2 result points.\n  \
Point 0: (1.0,2.0)\n  \
Point 1: (3.5,4.25)\n";

    fn decoded(result: &DecodeResult) -> &Barcode {
        result.barcode().expect("expected a decoded block")
    }

    #[test]
    fn extracts_fields() {
        let results = parse_report(QR_BLOCK).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0],
            DecodeResult::Decoded(Barcode {
                format: "QR_CODE".into(),
                raw_text: "HELLO\n".into(),
                parsed_text: "HELLO\n".into(),
                points: vec![(1.0, 2.0).into(), (3.5, 4.25).into()],
            })
        );
    }

    #[test]
    fn block_count_matches_markers() {
        let report = format!(
            "{QR_BLOCK}file: b.png: No barcode found\n{QR_BLOCK}file: d.png\nNo barcode found\n"
        );
        let results = parse_report(&report).unwrap();
        assert_eq!(results.len(), 4);
        assert!(results[0].is_found());
        assert_eq!(results[1], DecodeResult::NotFound);
        assert!(results[2].is_found());
        assert_eq!(results[3], DecodeResult::NotFound);
    }

    #[test]
    fn not_found_on_line_after_delimiter() {
        let report = "file: a.png\n\
No barcode found\n\
file: b.png\n\
format: QR_CODE, x\n\
Raw result:\nX\nParsed result:\nX\nFound 0 result points.\n";
        let results = parse_report(report).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], DecodeResult::NotFound);
        assert_eq!(decoded(&results[1]).format, "QR_CODE");
    }

    #[test]
    fn not_found_phrase_inside_content_is_text() {
        let report = "file: c.png\nformat: QR_CODE, x\nRaw result:\nNo barcode found\nParsed result:\nNo barcode found\n";
        let results = parse_report(report).unwrap();
        assert_eq!(decoded(&results[0]).raw_text, "No barcode found\n");
    }

    #[test]
    fn empty_report_has_no_blocks() {
        assert!(parse_report("").unwrap().is_empty());
        assert!(parse_report("\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn content_before_first_marker_is_its_own_block() {
        let report = format!("No barcode found\n{QR_BLOCK}");
        let results = parse_report(&report).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], DecodeResult::NotFound);
        assert!(results[1].is_found());
    }

    #[test]
    fn blank_preamble_is_dropped() {
        let report = format!("\n\n{QR_BLOCK}");
        assert_eq!(parse_report(&report).unwrap().len(), 1);
    }

    #[test]
    fn not_found_is_detected_per_block() {
        let report = "file:///tmp/x.png: No barcode found\n";
        assert_eq!(parse_report(report).unwrap(), vec![DecodeResult::NotFound]);

        // A not-found block later on must not flip earlier blocks.
        let report = format!("{QR_BLOCK}file:///tmp/y.png: No barcode found\n");
        let results = parse_report(&report).unwrap();
        assert!(results[0].is_found());
        assert_eq!(results[1], DecodeResult::NotFound);
    }

    #[test]
    fn multi_line_content_is_preserved() {
        let report = "file: m.png\n\
format: QR_CODE, raw bytes\n\
Raw result:\n\
line one\n\
\n\
line three\n\
Parsed result:\n\
first\n\
second\n\
Found 0 result points.\n";
        let results = parse_report(report).unwrap();
        let b = decoded(&results[0]);
        assert_eq!(b.raw_text, "line one\n\nline three\n");
        assert_eq!(b.parsed_text, "first\nsecond\n");
        assert!(b.points.is_empty());
    }

    #[test]
    fn points_keep_encounter_order() {
        let report = "file: p.png\n\
Raw result:\nX\nParsed result:\nX\n\
Found 3 result points.\n  \
Point 2: (9.0,9.0)\n  \
Point 0: (1.0,1.0)\n  \
Point 1: (5.0,5.0)\n";
        let results = parse_report(report).unwrap();
        let xs: Vec<f64> = decoded(&results[0]).points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![9.0, 1.0, 5.0]);
    }

    #[test]
    fn non_point_lines_in_point_section_are_ignored() {
        let report = "file: p.png\n\
Raw result:\nX\nParsed result:\nX\n\
Found 1 result points.\n\
  some trailing noise\n  \
Point 0: (7.5,8.5)\n\
\n";
        let results = parse_report(report).unwrap();
        assert_eq!(decoded(&results[0]).points, vec![(7.5, 8.5).into()]);
    }

    #[test]
    fn many_points_header_is_recognised() {
        let mut report = String::from("file: p.png\nRaw result:\nX\nParsed result:\nX\nFound 12 result points.\n");
        for i in 0..12 {
            report.push_str(&format!("  Point {i}: ({i}.0,{i}.5)\n"));
        }
        let results = parse_report(&report).unwrap();
        let b = decoded(&results[0]);
        assert_eq!(b.parsed_text, "X\n");
        assert_eq!(b.points.len(), 12);
        assert_eq!(b.points[11], ResultPoint { x: 11.0, y: 11.5 });
    }

    #[test]
    fn truncated_block_is_decoded_with_empty_fields() {
        let report = "file: t.png\nformat: CODE_128, raw bytes\n";
        let results = parse_report(report).unwrap();
        assert_eq!(
            results[0],
            DecodeResult::Decoded(Barcode {
                format: "CODE_128".into(),
                ..Default::default()
            })
        );
    }

    #[test]
    fn format_read_from_inline_header() {
        let report = "file:///tmp/a.png (format: DATA_MATRIX, type: TEXT):\n\
Raw result:\nabc\nParsed result:\nabc\nFound 4 result points.\n  \
Point 0: (10.5,20.5)\n";
        let results = parse_report(report).unwrap();
        let b = decoded(&results[0]);
        assert_eq!(b.format, "DATA_MATRIX");
        assert_eq!(b.raw_text, "abc\n");
        assert_eq!(b.points.len(), 1);
    }

    #[test]
    fn format_like_text_in_raw_section_is_content() {
        let report = "file: f.png\nformat: QR_CODE, raw bytes\nRaw result:\nformat: EAN_8, fake\nParsed result:\nok\n";
        let results = parse_report(report).unwrap();
        let b = decoded(&results[0]);
        assert_eq!(b.format, "QR_CODE");
        assert_eq!(b.raw_text, "format: EAN_8, fake\n");
    }

    #[test]
    fn malformed_coordinate_aborts_the_report() {
        let report = "file: bad.png\nRaw result:\nX\nParsed result:\nX\nFound 1 result points.\n  Point 0: (1.2.3,4.0)\n";
        let err = parse_report(report).unwrap_err();
        match err {
            ReportError::MalformedPoint { block, line, .. } => {
                assert_eq!(block, 0);
                assert!(line.contains("1.2.3"));
            }
        }
    }

    #[test]
    fn negative_coordinates_parse() {
        let report = "file: n.png\nRaw result:\nX\nParsed result:\nX\nFound 1 result points.\n  Point 0: (-1.5,2.0)\n";
        let results = parse_report(report).unwrap();
        assert_eq!(decoded(&results[0]).points[0].x, -1.5);
    }

    #[test]
    fn crlf_reports_parse_like_lf() {
        let crlf = QR_BLOCK.replace('\n', "\r\n");
        assert_eq!(parse_report(&crlf).unwrap(), parse_report(QR_BLOCK).unwrap());
    }

    #[test]
    fn each_result_owns_its_points() {
        let report = format!("{QR_BLOCK}{QR_BLOCK}");
        let mut results = parse_report(&report).unwrap();
        if let DecodeResult::Decoded(b) = &mut results[0] {
            b.points.clear();
        }
        assert_eq!(decoded(&results[1]).points.len(), 2);
    }
}
