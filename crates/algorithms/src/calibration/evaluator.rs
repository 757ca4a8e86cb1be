//! Neighbourhood evaluation over two land-use maps
//!
//! Every cell inside the mask is visited once. For each ring of the
//! catalog the classes of the valid neighbours (read from the time-1
//! map) are counted, and the counts are recorded into:
//!
//! - `all_cells`, keyed by the cell's class at time 1;
//! - `no_cells` when the cell kept its class, and also `no_new_cells` when
//!   additionally no valid neighbour in the catalog changed class;
//! - the transition dictionary when the cell changed class.
//!
//! Rows are processed in fixed-height bands with private tables that are
//! summed afterwards, so the result does not depend on scheduling.

use ndarray::{Array2, Array3};

use crate::maybe_rayon::*;
use encal_core::raster::Raster;
use encal_core::{Error, Result};

use super::distances::DistanceCatalog;
use super::enrichment::enrichment_factors;
use super::tables::{NeighbourProfile, NeighbourTable, Transition, TransitionDictionary};

/// Rows per work unit
const BAND_ROWS: usize = 32;

/// Count tables produced by [`evaluate_neighbourhoods`]
#[derive(Debug, Clone, PartialEq)]
pub struct NeighbourhoodCounts {
    /// Every valid cell, keyed by class at time 1
    pub all_cells: NeighbourTable,
    /// Unchanged cells with no changed neighbour in the catalog
    pub no_new_cells: NeighbourTable,
    /// Every unchanged cell
    pub no_cells: NeighbourTable,
    /// Cells that changed class, per transition
    pub transitions: TransitionDictionary,
    /// Valid cells per class at time 1
    pub class_cells: Vec<u64>,
    rings: usize,
    max_count: usize,
}

impl NeighbourhoodCounts {
    fn empty(rings: usize, classes: usize, max_count: usize) -> Self {
        Self {
            all_cells: NeighbourTable::new(rings, classes, max_count),
            no_new_cells: NeighbourTable::new(rings, classes, max_count),
            no_cells: NeighbourTable::new(rings, classes, max_count),
            transitions: TransitionDictionary::new(),
            class_cells: vec![0; classes],
            rings,
            max_count,
        }
    }

    fn merge(&mut self, other: NeighbourhoodCounts) {
        self.all_cells.merge(&other.all_cells);
        self.no_new_cells.merge(&other.no_new_cells);
        self.no_cells.merge(&other.no_cells);
        for (transition, profile) in other.transitions {
            match self.transitions.get_mut(&transition) {
                Some(existing) => existing.merge(&profile),
                None => {
                    self.transitions.insert(transition, profile);
                }
            }
        }
        for (mine, theirs) in self.class_cells.iter_mut().zip(other.class_cells) {
            *mine += theirs;
        }
    }

    /// Number of land-use classes
    pub fn classes(&self) -> usize {
        self.class_cells.len()
    }

    /// Number of rings the tables were built for
    pub fn rings(&self) -> usize {
        self.rings
    }

    /// Number of valid cells
    pub fn valid_cells(&self) -> u64 {
        self.class_cells.iter().sum()
    }

    /// Areal proportion of each class among the valid cells at time 1;
    /// all zero when no cell is valid
    pub fn class_proportions(&self) -> Vec<f64> {
        let total = self.valid_cells();
        self.class_cells
            .iter()
            .map(|&n| if total == 0 { 0.0 } else { n as f64 / total as f64 })
            .collect()
    }

    /// Profiles of the cells that became each class, keyed by destination.
    ///
    /// Row `p` sums every transition `(o -> p)`.
    pub fn new_cells(&self) -> NeighbourTable {
        let mut table = NeighbourTable::new(self.rings, self.classes(), self.max_count);
        for (transition, profile) in &self.transitions {
            table.profile_mut(transition.to).merge(profile);
        }
        table
    }

    /// Enrichment of `table` against the areal proportions at time 1
    pub fn enrichment(&self, table: &NeighbourTable) -> Array3<f64> {
        enrichment_factors(table, &self.class_proportions())
    }

    /// Number of cells that underwent `transition`
    pub fn transition_cells(&self, transition: Transition) -> u64 {
        self.transitions
            .get(&transition)
            .map_or(0, NeighbourProfile::cells)
    }
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    from: usize,
    to: usize,
}

impl Cell {
    fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Build the neighbour count tables for a pair of land-use maps.
///
/// # Arguments
/// * `origin` - Land use at time 1 (class codes `0..classes`)
/// * `destination` - Land use at time 2
/// * `mask` - Cells with a value above zero are analysed
/// * `classes` - Number of land-use classes
/// * `catalog` - Rings to evaluate
///
/// # Errors
/// [`Error::SizeMismatch`] when the rasters differ in shape and
/// [`Error::ClassOutOfRange`] when an analysed cell holds an unknown class.
pub fn evaluate_neighbourhoods(
    origin: &Raster<i32>,
    destination: &Raster<i32>,
    mask: &Raster<i32>,
    classes: usize,
    catalog: &DistanceCatalog,
) -> Result<NeighbourhoodCounts> {
    origin.ensure_same_shape(destination)?;
    origin.ensure_same_shape(mask)?;

    let cells = classify_cells(origin, destination, mask, classes)?;
    let (rows, _) = cells.dim();
    let rings = catalog.len();
    let max_count = catalog.max_ring_size();

    let partials: Vec<NeighbourhoodCounts> = (0..rows.div_ceil(BAND_ROWS))
        .into_par_iter()
        .map(|band| {
            let start = band * BAND_ROWS;
            let end = (start + BAND_ROWS).min(rows);
            scan_band(&cells, start..end, classes, catalog)
        })
        .collect();

    let mut counts = NeighbourhoodCounts::empty(rings, classes, max_count);
    for partial in partials {
        counts.merge(partial);
    }
    Ok(counts)
}

/// Resolve each analysed cell to its pair of classes, `None` outside the mask
fn classify_cells(
    origin: &Raster<i32>,
    destination: &Raster<i32>,
    mask: &Raster<i32>,
    classes: usize,
) -> Result<Array2<Option<Cell>>> {
    let (rows, cols) = origin.shape();
    let mut cells = Array2::from_elem((rows, cols), None);

    for row in 0..rows {
        for col in 0..cols {
            let m = unsafe { mask.get_unchecked(row, col) };
            if m <= 0 {
                continue;
            }
            let from = class_index(unsafe { origin.get_unchecked(row, col) }, row, col, classes)?;
            let to = class_index(
                unsafe { destination.get_unchecked(row, col) },
                row,
                col,
                classes,
            )?;
            cells[(row, col)] = Some(Cell { from, to });
        }
    }

    Ok(cells)
}

fn class_index(value: i32, row: usize, col: usize, classes: usize) -> Result<usize> {
    match usize::try_from(value) {
        Ok(class) if class < classes => Ok(class),
        _ => Err(Error::ClassOutOfRange {
            row,
            col,
            value: i64::from(value),
            classes,
        }),
    }
}

fn scan_band(
    cells: &Array2<Option<Cell>>,
    band: std::ops::Range<usize>,
    classes: usize,
    catalog: &DistanceCatalog,
) -> NeighbourhoodCounts {
    let (rows, cols) = cells.dim();
    let rings = catalog.len();
    let max_count = catalog.max_ring_size();
    let mut counts = NeighbourhoodCounts::empty(rings, classes, max_count);
    let mut scratch: Array2<u32> = Array2::zeros((rings, classes));

    for row in band {
        for col in 0..cols {
            let Some(cell) = cells[(row, col)] else {
                continue;
            };

            scratch.fill(0);
            let mut change_nearby = false;

            for (ring_idx, ring) in catalog.rings().iter().enumerate() {
                for &(dr, dc) in &ring.offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                        continue;
                    }
                    if let Some(neighbour) = cells[(nr as usize, nc as usize)] {
                        scratch[(ring_idx, neighbour.from)] += 1;
                        change_nearby |= neighbour.changed();
                    }
                }
            }

            counts.class_cells[cell.from] += 1;
            counts.all_cells.profile_mut(cell.from).record(scratch.view());

            if cell.changed() {
                counts
                    .transitions
                    .entry(Transition::new(cell.from, cell.to))
                    .or_insert_with(|| NeighbourProfile::new(rings, classes, max_count))
                    .record(scratch.view());
            } else {
                counts.no_cells.profile_mut(cell.from).record(scratch.view());
                if !change_nearby {
                    counts.no_new_cells.profile_mut(cell.from).record(scratch.view());
                }
            }
        }
    }

    counts
}
