//! ESRI grid header parsing.
//!
//! Both the ASCII grid (`.asc`) and the float grid sidecar (`.hdr`)
//! share the same `key value` layout:
//!
//! ```text
//! ncols         4
//! nrows         3
//! xllcorner     500000.0
//! yllcorner     4200000.0
//! cellsize      10.0
//! NODATA_value  -9999
//! byteorder     LSBFIRST
//! ```
//!
//! `xllcenter`/`yllcenter` may replace the corner keys, and
//! `byteorder` is only meaningful for float grids.

use crate::{DemError, C};
use geo::geometry::Coord;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ByteOrder {
    Lsb,
    Msb,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Header {
    pub cols: usize,
    pub rows: usize,
    /// Lower-left corner of the lower-left cell.
    pub origin: Coord<C>,
    pub cell_size: C,
    pub nodata: Option<f32>,
    pub byte_order: ByteOrder,
}

/// Parses header lines from the front of `text`.
///
/// Returns the header and the byte offset where the header ends
/// (the start of sample data for ASCII grids).
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn parse<P: AsRef<Path>>(path: P, text: &str) -> Result<(Header, usize), DemError> {
    let mk_err = |reason: String| DemError::Header {
        path: path.as_ref().to_owned(),
        reason,
    };

    let mut cols = None;
    let mut rows = None;
    let mut x_corner = None;
    let mut y_corner = None;
    let mut x_center = None;
    let mut y_center = None;
    let mut cell_size = None;
    let mut nodata = None;
    let mut byte_order = ByteOrder::Lsb;

    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            offset += line.len();
            continue;
        };
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            break;
        }
        let value = tokens
            .next()
            .ok_or_else(|| mk_err(format!("missing value for '{key}'")))?;
        let as_f64 = || {
            value
                .parse::<C>()
                .map_err(|_| mk_err(format!("'{key}' is not a number: {value}")))
        };
        let as_usize = || {
            value
                .parse::<usize>()
                .map_err(|_| mk_err(format!("'{key}' is not a count: {value}")))
        };
        match key.to_ascii_lowercase().as_str() {
            "ncols" => cols = Some(as_usize()?),
            "nrows" => rows = Some(as_usize()?),
            "xllcorner" => x_corner = Some(as_f64()?),
            "yllcorner" => y_corner = Some(as_f64()?),
            "xllcenter" => x_center = Some(as_f64()?),
            "yllcenter" => y_center = Some(as_f64()?),
            "cellsize" => cell_size = Some(as_f64()?),
            "nodata_value" => nodata = Some(as_f64()? as f32),
            "byteorder" => {
                byte_order = match value.to_ascii_uppercase().as_str() {
                    "LSBFIRST" | "I" => ByteOrder::Lsb,
                    "MSBFIRST" | "M" => ByteOrder::Msb,
                    other => return Err(mk_err(format!("unknown byte order {other}"))),
                }
            }
            // Unknown keys (e.g. `nbits`, `layout`) are tolerated.
            _ => (),
        }
        offset += line.len();
    }

    let cols = cols.ok_or_else(|| mk_err("missing ncols".into()))?;
    let rows = rows.ok_or_else(|| mk_err("missing nrows".into()))?;
    let cell_size = cell_size.ok_or_else(|| mk_err("missing cellsize".into()))?;
    let half = cell_size / 2.0;
    let x = match (x_corner, x_center) {
        (Some(x), _) => x,
        (None, Some(x)) => x - half,
        (None, None) => return Err(mk_err("missing xllcorner/xllcenter".into())),
    };
    let y = match (y_corner, y_center) {
        (Some(y), _) => y,
        (None, Some(y)) => y - half,
        (None, None) => return Err(mk_err("missing yllcorner/yllcenter".into())),
    };

    Ok((
        Header {
            cols,
            rows,
            origin: Coord { x, y },
            cell_size,
            nodata,
            byte_order,
        },
        offset,
    ))
}

#[cfg(test)]
mod tests {
    use super::{parse, ByteOrder};
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_corner_header() {
        let text = "ncols 4\nnrows 3\nxllcorner 100\nyllcorner 200\ncellsize 10\nNODATA_value -9999\n1 2 3 4\n";
        let (header, offset) = parse("a.asc", text).unwrap();
        assert_eq!(header.cols, 4);
        assert_eq!(header.rows, 3);
        assert_relative_eq!(header.origin.x, 100.0);
        assert_relative_eq!(header.origin.y, 200.0);
        assert_eq!(header.nodata, Some(-9999.0));
        assert_eq!(header.byte_order, ByteOrder::Lsb);
        assert_eq!(&text[offset..], "1 2 3 4\n");
    }

    #[test]
    fn test_parse_center_header() {
        let text = "NCOLS 2\nNROWS 2\nXLLCENTER 5\nYLLCENTER 5\nCELLSIZE 10\nBYTEORDER MSBFIRST\n";
        let (header, _) = parse("a.hdr", text).unwrap();
        assert_relative_eq!(header.origin.x, 0.0);
        assert_relative_eq!(header.origin.y, 0.0);
        assert_eq!(header.nodata, None);
        assert_eq!(header.byte_order, ByteOrder::Msb);
    }

    #[test]
    fn test_missing_key() {
        assert!(parse("a.asc", "ncols 2\nnrows 2\ncellsize 1\n").is_err());
    }
}
