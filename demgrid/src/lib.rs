//! Elevation grid surfaces.
//!
//! Loads regular elevation rasters in the two ESRI interchange
//! formats most DEM pipelines export:
//!
//! 1. ASCII grid (`.asc`): a text header followed by whitespace
//!    separated samples, north row first.
//! 1. Float grid (`.flt`): raw 32-bit samples, north row first, with
//!    the header in a sibling `.hdr` file.
//!
//! Coordinates are planar (projected, meters); the grid carries no
//! spatial reference of its own.

mod error;
mod header;

pub use crate::error::DemError;
use crate::header::{ByteOrder, Header};
use byteorder::{BigEndian as BE, ByteOrder as _, LittleEndian as LE, ReadBytesExt};
use geo::{
    geometry::{Coord, MultiPolygon, Polygon, Rect},
    BooleanOps,
};
use log::debug;
use memmap2::Mmap;
use std::{
    fs::File,
    io::{BufReader, Read},
    mem::size_of,
    path::{Path, PathBuf},
    sync::OnceLock,
};

/// Base floating point type used for all coordinates and calculations.
pub type C = f64;

pub struct Grid {
    /// Lower-left corner of the lower-left cell.
    origin: Coord<C>,

    /// Width and height of a (square) cell in map units.
    cell_size: C,

    /// Number of (columns, rows) in this grid.
    dimensions: (usize, usize),

    /// Sample value marking a cell without data.
    nodata: Option<f32>,

    /// Union of all valid cells, computed on first use.
    footprint: OnceLock<MultiPolygon<C>>,

    /// Elevation samples.
    samples: SampleStore,
}

enum SampleStore {
    InMem(Box<[f32]>),
    MemMap(Mmap, ByteOrder),
}

impl SampleStore {
    fn get_unchecked(&self, index: usize) -> f32 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw, order) => {
                let start = index * size_of::<f32>();
                let bytes = &raw[start..start + size_of::<f32>()];
                match order {
                    ByteOrder::Lsb => LE::read_f32(bytes),
                    ByteOrder::Msb => BE::read_f32(bytes),
                }
            }
        }
    }
}

impl Grid {
    /// Returns an in-memory grid built from `samples`, north row
    /// first.
    pub fn from_samples(
        origin: Coord<C>,
        cell_size: C,
        (cols, rows): (usize, usize),
        nodata: Option<f32>,
        samples: Vec<f32>,
    ) -> Result<Self, DemError> {
        if cols == 0 || rows == 0 || cell_size.is_nan() || cell_size <= 0.0 {
            return Err(DemError::Dimensions);
        }
        if samples.len() != cols * rows {
            return Err(DemError::SampleCount {
                expected: cols * rows,
                found: samples.len(),
            });
        }
        Ok(Self::new(
            origin,
            cell_size,
            (cols, rows),
            nodata,
            SampleStore::InMem(samples.into_boxed_slice()),
        ))
    }

    /// Returns a Grid read into memory from the file at `path`.
    ///
    /// The format is chosen by extension: `.asc` or `.flt`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DemError> {
        let path = path.as_ref();
        debug!("loading {path:?}");
        match extension(path).as_deref() {
            Some("asc") => Self::load_ascii(path),
            Some("flt") => Self::load_float(path),
            _ => Err(DemError::Format(path.to_owned())),
        }
    }

    /// Returns a Grid using the memory-mapped float grid at `path` as
    /// storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, DemError> {
        let path = path.as_ref();
        if extension(path).as_deref() != Some("flt") {
            return Err(DemError::Format(path.to_owned()));
        }
        let header = read_sidecar_header(path)?;
        let file = File::open(path)?;
        let expected_len = (header.cols * header.rows * size_of::<f32>()) as u64;
        let found_len = file.metadata()?.len();
        if found_len != expected_len {
            return Err(DemError::SampleCount {
                expected: header.cols * header.rows,
                found: usize::try_from(found_len).unwrap_or(usize::MAX) / size_of::<f32>(),
            });
        }
        // Safety: the map is read-only and the length was checked
        // above.
        let mmap = unsafe { Mmap::map(&file)? };
        debug!("memory mapped {path:?}");
        Ok(Self::from_header(
            &header,
            SampleStore::MemMap(mmap, header.byte_order),
        ))
    }

    /// Returns the number of samples in this grid.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let (cols, rows) = self.dimensions;
        cols * rows
    }

    /// Returns (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    pub fn cell_size(&self) -> C {
        self.cell_size
    }

    /// Returns the sample of the cell containing `coord`.
    ///
    /// `None` when `coord` is outside the grid or the cell holds
    /// NODATA.
    pub fn get(&self, coord: Coord<C>) -> Option<f32> {
        let (x, y) = self.coord_to_xy(coord)?;
        self.get_xy((x, y))
    }

    /// Returns the bilinearly interpolated elevation at `coord`.
    ///
    /// Interpolation runs between cell centers. Near the border, or
    /// when a neighbouring cell holds NODATA, the containing cell's
    /// value is used instead.
    pub fn interpolate(&self, coord: Coord<C>) -> Option<C> {
        let nearest = C::from(self.get(coord)?);
        let (cols, rows) = self.dimensions;

        let fx = (coord.x - self.origin.x) / self.cell_size - 0.5;
        let fy = (coord.y - self.origin.y) / self.cell_size - 0.5;
        let (x0, tx) = split_axis(fx, cols);
        let (y0, ty) = split_axis(fy, rows);
        let x1 = (x0 + 1).min(cols - 1);
        let y1 = (y0 + 1).min(rows - 1);

        let corners = (
            self.get_xy((x0, y0)),
            self.get_xy((x1, y0)),
            self.get_xy((x0, y1)),
            self.get_xy((x1, y1)),
        );
        match corners {
            (Some(sw), Some(se), Some(nw), Some(ne)) => {
                let (sw, se, nw, ne) = (C::from(sw), C::from(se), C::from(nw), C::from(ne));
                let south = sw + (se - sw) * tx;
                let north = nw + (ne - nw) * tx;
                Some(south + (north - south) * ty)
            }
            _ => Some(nearest),
        }
    }

    /// Returns the union of all cells holding valid data.
    pub fn footprint(&self) -> &MultiPolygon<C> {
        self.footprint.get_or_init(|| self.compute_footprint())
    }
}

/// Private API.
impl Grid {
    fn new(
        origin: Coord<C>,
        cell_size: C,
        dimensions: (usize, usize),
        nodata: Option<f32>,
        samples: SampleStore,
    ) -> Self {
        Self {
            origin,
            cell_size,
            dimensions,
            nodata,
            footprint: OnceLock::new(),
            samples,
        }
    }

    fn from_header(header: &Header, samples: SampleStore) -> Self {
        Self::new(
            header.origin,
            header.cell_size,
            (header.cols, header.rows),
            header.nodata,
            samples,
        )
    }

    fn load_ascii(path: &Path) -> Result<Self, DemError> {
        let mut text = String::new();
        BufReader::new(File::open(path)?).read_to_string(&mut text)?;
        let (header, offset) = header::parse(path, &text)?;
        let samples = text[offset..]
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f32>()
                    .map_err(|_| DemError::Sample(token.to_owned()))
            })
            .collect::<Result<Vec<f32>, DemError>>()?;
        Self::from_samples(
            header.origin,
            header.cell_size,
            (header.cols, header.rows),
            header.nodata,
            samples,
        )
    }

    fn load_float(path: &Path) -> Result<Self, DemError> {
        let header = read_sidecar_header(path)?;
        let count = header.cols * header.rows;
        let mut file = BufReader::new(File::open(path)?);
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            let sample = match header.byte_order {
                ByteOrder::Lsb => file.read_f32::<LE>()?,
                ByteOrder::Msb => file.read_f32::<BE>()?,
            };
            samples.push(sample);
        }
        Self::from_samples(
            header.origin,
            header.cell_size,
            (header.cols, header.rows),
            header.nodata,
            samples,
        )
    }

    fn is_nodata(&self, sample: f32) -> bool {
        sample.is_nan() || self.nodata.map_or(false, |nodata| sample == nodata)
    }

    /// `(x, y)` are (column from west, row from south).
    fn get_xy(&self, xy: (usize, usize)) -> Option<f32> {
        let sample = self.samples.get_unchecked(self.xy_to_linear_index(xy));
        (!self.is_nodata(sample)).then_some(sample)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn coord_to_xy(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        let (cols, rows) = self.dimensions;
        let fx = ((coord.x - self.origin.x) / self.cell_size).floor();
        let fy = ((coord.y - self.origin.y) / self.cell_size).floor();
        #[allow(clippy::cast_precision_loss)]
        let in_bounds = 0.0 <= fx && fx < cols as C && 0.0 <= fy && fy < rows as C;
        in_bounds.then_some((fx as usize, fy as usize))
    }

    fn xy_to_linear_index(&self, (x, y): (usize, usize)) -> usize {
        let (cols, rows) = self.dimensions;
        cols * (rows - y - 1) + x
    }

    /// Returns the rectangle covering columns `[x0, x1)` of rows
    /// `[y0, y1)`.
    #[allow(clippy::cast_precision_loss)]
    fn cells_to_polygon(&self, (x0, x1): (usize, usize), (y0, y1): (usize, usize)) -> Polygon<C> {
        let w = self.origin.x + x0 as C * self.cell_size;
        let e = self.origin.x + x1 as C * self.cell_size;
        let s = self.origin.y + y0 as C * self.cell_size;
        let n = self.origin.y + y1 as C * self.cell_size;
        Rect::new(Coord { x: w, y: s }, Coord { x: e, y: n }).to_polygon()
    }

    fn compute_footprint(&self) -> MultiPolygon<C> {
        let (cols, rows) = self.dimensions;

        // Runs of valid cells per row, merged with the identical run
        // of the row below so that fully valid grids collapse to a
        // single rectangle before any boolean ops happen.
        let mut open: Vec<((usize, usize), usize)> = Vec::new();
        let mut blocks: Vec<Polygon<C>> = Vec::new();
        for y in 0..rows {
            let mut runs = Vec::new();
            let mut start = None;
            for x in 0..=cols {
                let valid = x < cols && self.get_xy((x, y)).is_some();
                match (valid, start) {
                    (true, None) => start = Some(x),
                    (false, Some(x0)) => {
                        runs.push((x0, x));
                        start = None;
                    }
                    _ => (),
                }
            }
            let mut next_open = Vec::with_capacity(runs.len());
            for run in runs {
                match open.iter().position(|(r, _)| *r == run) {
                    Some(idx) => next_open.push(open.swap_remove(idx)),
                    None => next_open.push((run, y)),
                }
            }
            for (run, y0) in open.drain(..) {
                blocks.push(self.cells_to_polygon(run, (y0, y)));
            }
            open = next_open;
        }
        for (run, y0) in open {
            blocks.push(self.cells_to_polygon(run, (y0, rows)));
        }

        debug!("footprint; blocks: {}", blocks.len());
        blocks
            .into_iter()
            .fold(MultiPolygon::new(Vec::new()), |acc, block| {
                if acc.0.is_empty() {
                    MultiPolygon::new(vec![block])
                } else {
                    acc.union(&MultiPolygon::new(vec![block]))
                }
            })
    }
}

/// Splits a fractional cell-center coordinate into a lower cell index
/// and interpolation weight, clamped to the grid.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn split_axis(f: C, len: usize) -> (usize, C) {
    if f <= 0.0 || len == 1 {
        return (0, 0.0);
    }
    let lower = f.floor();
    #[allow(clippy::cast_precision_loss)]
    if lower >= (len - 1) as C {
        return (len - 1, 0.0);
    }
    (lower as usize, f - lower)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
}

fn read_sidecar_header(path: &Path) -> Result<Header, DemError> {
    let hdr_path: PathBuf = path.with_extension("hdr");
    let mut text = String::new();
    File::open(&hdr_path)?.read_to_string(&mut text)?;
    let (header, _) = header::parse(&hdr_path, &text)?;
    Ok(header)
}
