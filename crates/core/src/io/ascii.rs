//! ESRI ASCII grid reading/writing
//!
//! The format is a short `key value` header followed by whitespace
//! separated cell values, north row first:
//!
//! ```text
//! ncols        4
//! nrows        2
//! xllcorner    0.0
//! yllcorner    0.0
//! cellsize     100.0
//! NODATA_value -9999
//! 0 0 1 2
//! 2 2 1 -9999
//! ```

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Read an ASCII grid file into a Raster
pub fn read_ascii_grid<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let text = fs::read_to_string(path.as_ref())?;
    read_ascii_grid_from_str(&text)
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    x: Option<f64>,
    y: Option<f64>,
    centered: bool,
    cell_size: Option<f64>,
    nodata: Option<f64>,
}

/// Parse an ASCII grid held in memory
pub fn read_ascii_grid_from_str<T: RasterElement>(text: &str) -> Result<Raster<T>> {
    let mut header = Header::default();
    let mut values: Vec<T> = Vec::new();
    let mut in_header = true;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if in_header && trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let mut parts = trimmed.split_whitespace();
            let key = parts.next().unwrap_or_default().to_ascii_lowercase();
            let raw = parts.next().ok_or_else(|| Error::Parse {
                line: line_no,
                reason: format!("header key '{}' has no value", key),
            })?;
            let value: f64 = raw.parse().map_err(|_| Error::Parse {
                line: line_no,
                reason: format!("invalid number '{}' for '{}'", raw, key),
            })?;

            match key.as_str() {
                "ncols" => header.ncols = Some(header_count(value, line_no)?),
                "nrows" => header.nrows = Some(header_count(value, line_no)?),
                "xllcorner" => header.x = Some(value),
                "yllcorner" => header.y = Some(value),
                "xllcenter" => {
                    header.x = Some(value);
                    header.centered = true;
                }
                "yllcenter" => {
                    header.y = Some(value);
                    header.centered = true;
                }
                "cellsize" => header.cell_size = Some(value),
                "nodata_value" => header.nodata = Some(value),
                _ => {
                    return Err(Error::Parse {
                        line: line_no,
                        reason: format!("unknown header key '{}'", key),
                    })
                }
            }
            continue;
        }

        in_header = false;
        for token in trimmed.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| Error::Parse {
                line: line_no,
                reason: format!("invalid cell value '{}'", token),
            })?;
            let cell = T::from_f64(v).ok_or_else(|| Error::Parse {
                line: line_no,
                reason: format!("cell value {} does not fit the raster type", v),
            })?;
            values.push(cell);
        }
    }

    let cols = required(header.ncols, "ncols")?;
    let rows = required(header.nrows, "nrows")?;
    let cell_size = required(header.cell_size, "cellsize")?;
    let mut x = required(header.x, "xllcorner or xllcenter")?;
    let mut y = required(header.y, "yllcorner or yllcenter")?;
    if header.centered {
        x -= cell_size / 2.0;
        y -= cell_size / 2.0;
    }

    let expected = rows.checked_mul(cols).ok_or_else(|| Error::Parse {
        line: 0,
        reason: format!("grid of {} x {} cells is too large", rows, cols),
    })?;
    if values.len() != expected {
        return Err(Error::Parse {
            line: text.lines().count(),
            reason: format!("expected {} cell values, found {}", expected, values.len()),
        });
    }

    let mut raster = Raster::from_vec(values, rows, cols)?;
    raster.set_transform(GeoTransform::from_lower_left(x, y, cell_size, rows));
    raster.set_nodata(header.nodata.and_then(T::from_f64));
    Ok(raster)
}

fn header_count(value: f64, line: usize) -> Result<usize> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(Error::Parse {
            line,
            reason: format!("grid dimension must be a non-negative integer, got {}", value),
        });
    }
    Ok(value as usize)
}

fn required<V>(value: Option<V>, key: &str) -> Result<V> {
    value.ok_or_else(|| Error::Parse {
        line: 0,
        reason: format!("missing header key '{}'", key),
    })
}

/// Write a Raster as an ASCII grid file
pub fn write_ascii_grid<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    fs::write(path.as_ref(), write_ascii_grid_to_string(raster))?;
    Ok(())
}

/// Render a Raster in ASCII grid format
pub fn write_ascii_grid_to_string<T: RasterElement>(raster: &Raster<T>) -> String {
    let (rows, cols) = raster.shape();
    let (x_ll, y_ll) = raster.transform().lower_left(rows);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "ncols        {}", cols);
    let _ = writeln!(out, "nrows        {}", rows);
    let _ = writeln!(out, "xllcorner    {}", x_ll);
    let _ = writeln!(out, "yllcorner    {}", y_ll);
    let _ = writeln!(out, "cellsize     {}", raster.cell_size());
    if let Some(nd) = raster.nodata() {
        let _ = writeln!(out, "NODATA_value {}", nd);
    }

    for row in raster.data().rows() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }

    out
}
