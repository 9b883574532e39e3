//! Registry feed parsing
//!
//! The IEEE listing interleaves several record shapes per assignment:
//!
//! ```text
//! AC-DE-48   (hex)        Private
//! ACDE48     (base 16)    Private
//!                         ...address lines...
//! ```
//!
//! Only the `(hex)` lines are needed. Every other line is ignored, and a
//! `(hex)` line that cannot be turned into an entry is skipped without
//! failing the whole feed.

use crate::errors::*;
use std::collections::HashMap;
use tracing::debug;

/// Marker separating the block identifier from the manufacturer name.
pub const HEX_MARKER: &str = "(hex)";

/// Mapping extracted from one feed download, not yet handed to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Uppercase prefix key → manufacturer name
    pub entries: HashMap<String, String>,
    /// Number of lines examined
    pub lines_scanned: usize,
    /// Marker lines that were dropped as malformed
    pub skipped: usize,
}

impl ParsedFeed {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scan a raw feed and collect every well-formed `(hex)` line.
///
/// Never fails; an empty result is reported by [`ingest`].
pub fn parse_feed(raw: &str) -> ParsedFeed {
    let mut parsed = ParsedFeed::default();

    for line in raw.lines() {
        parsed.lines_scanned += 1;

        // The name ends at a second marker if the line carries one.
        let mut fields = line.split(HEX_MARKER);
        let (Some(block), Some(name)) = (fields.next(), fields.next()) else {
            continue;
        };

        match parse_entry(block, name) {
            Some((key, vendor)) => {
                parsed.entries.insert(key, vendor);
            }
            None => {
                parsed.skipped += 1;
                debug!("Skipping malformed registry line: {:?}", line);
            }
        }
    }

    parsed
}

/// Parse a feed and reject it when it produced no entries at all, which
/// means the format changed or the transfer was truncated.
pub fn ingest(raw: &str) -> Result<ParsedFeed> {
    let parsed = parse_feed(raw);
    if parsed.is_empty() {
        return Err(RegistryError::IngestionParse {
            lines_scanned: parsed.lines_scanned,
            skipped: parsed.skipped,
        });
    }
    Ok(parsed)
}

fn parse_entry(block: &str, name: &str) -> Option<(String, String)> {
    let key: String = block
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let vendor = name.trim();
    if vendor.is_empty() {
        return None;
    }

    Some((key, vendor.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
OUI/MA-L                                                    Organization
company_id                                                  Organization
                                                            Address

AC-DE-48   (hex)\t\tExample Corp
ACDE48     (base 16)\t\tExample Corp
\t\t\t\t1 Example Way
\t\t\t\tSpringfield  IL  62701
\t\t\t\tUS

00-00-0c   (hex)\t\tCisco Systems, Inc\r
00000C     (base 16)\t\tCisco Systems, Inc\r
";

    #[test]
    fn extracts_hex_lines_only() {
        let parsed = parse_feed(SAMPLE);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.entries["ACDE48"], "Example Corp");
        assert_eq!(parsed.entries["00000C"], "Cisco Systems, Inc");
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn single_line_feed() {
        let parsed = ingest("AC-DE-48   (hex)   Example Corp").unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(
            parsed.entries.get("ACDE48").map(String::as_str),
            Some("Example Corp")
        );
    }

    #[test]
    fn malformed_marker_lines_are_skipped() {
        let raw = "\
   (hex)   Nameless Block
ZZ-ZZ-ZZ   (hex)   Not Hex
11-22-33   (hex)
44-55-66   (hex)   Survivor Inc
";
        let parsed = ingest(raw).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.entries["445566"], "Survivor Inc");
        assert_eq!(parsed.skipped, 3);
    }

    #[test]
    fn feed_without_markers_is_a_parse_failure() {
        let raw = "ACDE48     (base 16)    Example Corp\nnothing to see here\n";
        let err = ingest(raw).unwrap_err();

        assert!(err.is_parse_failure());
        assert!(matches!(
            err,
            RegistryError::IngestionParse {
                lines_scanned: 2,
                skipped: 0
            }
        ));
    }

    #[test]
    fn empty_feed_is_a_parse_failure() {
        assert!(ingest("").unwrap_err().is_parse_failure());
    }

    #[test]
    fn name_stops_at_repeated_marker() {
        let raw = "AA-BB-CC (hex) Vendor One (hex) trailing notes\n";
        let parsed = ingest(raw).unwrap();
        assert_eq!(parsed.entries["AABBCC"], "Vendor One");
    }

    #[test]
    fn later_duplicates_win() {
        let raw = "AA-BB-CC (hex) First\naa-bb-cc (hex) Second\n";
        let parsed = ingest(raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.entries["AABBCC"], "Second");
    }
}
