use mistidy_parser::RawGrid;
use tracing::{debug, warn};

use crate::labels::MetadataField;

/// Where the header row was found, and whether it was found at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLocation {
    pub index: usize,
    pub matched_labels: usize,
    pub fallback: bool,
}

/// Finds the row holding the real column labels.
///
/// Scans the first `scan_rows` rows and returns the first one that contains at least
/// `min_matches` of the nine known metadata labels. When nothing qualifies the first
/// row is assumed to be the header; that degraded mode is reported, never raised.
pub fn locate_header(grid: &RawGrid, scan_rows: usize, min_matches: usize) -> HeaderLocation {
    let limit = scan_rows.min(grid.row_count());

    for index in 0..limit {
        let row = grid.row(index).unwrap_or_default();
        let matched_labels = count_known_labels(row);
        debug!(row = index, matched_labels, "header candidate");
        if matched_labels >= min_matches {
            return HeaderLocation {
                index,
                matched_labels,
                fallback: false,
            };
        }
    }

    warn!(
        scanned = limit,
        min_matches, "no header row found; treating row 0 as the header"
    );
    HeaderLocation {
        index: 0,
        matched_labels: grid.row(0).map(count_known_labels).unwrap_or(0),
        fallback: true,
    }
}

fn count_known_labels(row: &[Option<String>]) -> usize {
    MetadataField::ALL
        .iter()
        .filter(|field| {
            row.iter()
                .any(|cell| cell.as_deref() == Some(field.raw_label()))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [&str; 11] = [
        "Store Name",
        "Parameter",
        "Cafe Codes",
        "Region",
        "Category",
        "FOR SSG",
        "Area",
        "Store Start Date",
        "Vintage",
        "Apr-21",
        "May-21",
    ];

    #[test]
    fn finds_header_below_title_rows() {
        let grid = RawGrid::from_strings(vec![
            vec!["MIS report"],
            vec!["Store Name", "Parameter"],
            HEADER.to_vec(),
            vec!["Store A", "Revenue"],
        ]);

        let location = locate_header(&grid, 10, 5);
        assert_eq!(location.index, 2);
        assert_eq!(location.matched_labels, 9);
        assert!(!location.fallback);
    }

    #[test]
    fn five_labels_are_enough() {
        let grid = RawGrid::from_strings(vec![
            vec!["x"],
            vec!["Store Name", "Parameter", "Region", "Area", "Vintage", "Apr-21"],
        ]);
        assert_eq!(locate_header(&grid, 10, 5).index, 1);
    }

    #[test]
    fn labels_are_counted_once_and_case_sensitively() {
        let grid = RawGrid::from_strings(vec![
            vec!["Store Name", "Store Name", "Store Name", "Store Name", "Store Name"],
            vec!["store name", "parameter", "region", "area", "vintage"],
        ]);
        let location = locate_header(&grid, 10, 5);
        assert!(location.fallback);
        assert_eq!(location.index, 0);
        assert_eq!(location.matched_labels, 1);
    }

    #[test]
    fn header_beyond_scan_window_falls_back_to_row_zero() {
        let mut rows: Vec<Vec<&str>> = (0..10).map(|_| vec!["filler"]).collect();
        rows.push(HEADER.to_vec());
        let grid = RawGrid::from_strings(rows);

        let location = locate_header(&grid, 10, 5);
        assert_eq!(location.index, 0);
        assert!(location.fallback);
    }

    #[test]
    fn empty_grid_falls_back() {
        let location = locate_header(&RawGrid::default(), 10, 5);
        assert_eq!(location.index, 0);
        assert_eq!(location.matched_labels, 0);
        assert!(location.fallback);
    }
}
