use crate::error::{SfdmError, SfdmResult};
use crate::grid::cell::Cell;
use nalgebra::DVector;

/// 1D cell-centered grid with `nb` ghost cells on each side.
///
/// Cell layout: `[left ghosts | interior | right ghosts]`, interior indices
/// running `[ilo, ihi]` inclusive. Interior cells sit at
/// `xmin + (k + 0.5) * dx`; ghost positions and values are recomputed by
/// boundary condition application and never persisted across unrelated
/// states.
#[derive(Debug, Clone)]
pub struct Domain {
    cells: Vec<Cell>,
    components: Vec<String>,
    nb: usize,
    xmin: f64,
    xmax: f64,
}

impl Domain {
    pub fn new(
        components: Vec<String>,
        nx: usize,
        nb: usize,
        xmin: f64,
        xmax: f64,
    ) -> SfdmResult<Domain> {
        if nx == 0 || nb == 0 {
            return Err(SfdmError::MalformedGrid(
                "domain needs at least one interior cell and one ghost cell per side".to_string(),
            ));
        }
        let nv = components.len();
        let dx = (xmax - xmin) / nx as f64;
        let mut cells = Vec::with_capacity(nx + 2 * nb);
        // ghost positions here are placeholders, apply_bc owns them
        for _ in 0..nb {
            cells.push(Cell::new(xmin, DVector::zeros(nv)));
        }
        for k in 0..nx {
            let x = xmin + (k as f64 + 0.5) * dx;
            cells.push(Cell::new(x, DVector::zeros(nv)));
        }
        for _ in 0..nb {
            cells.push(Cell::new(xmax, DVector::zeros(nv)));
        }
        Ok(Domain {
            cells,
            components,
            nb,
            xmin,
            xmax,
        })
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell_mut(&mut self, i: usize) -> &mut Cell {
        &mut self.cells[i]
    }

    pub fn interior(&self) -> &[Cell] {
        &self.cells[self.ilo()..=self.ihi()]
    }

    pub fn nb(&self) -> usize {
        self.nb
    }

    pub fn ilo(&self) -> usize {
        self.nb
    }

    pub fn ihi(&self) -> usize {
        self.cells.len() - self.nb - 1
    }

    /// number of interior points
    pub fn num_points(&self) -> usize {
        self.cells.len() - 2 * self.nb
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn component_names(&self) -> &[String] {
        &self.components
    }

    pub fn component_index(&self, name: &str) -> SfdmResult<usize> {
        self.components
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SfdmError::UnknownComponent(name.to_string()))
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    /// Flatten interior values into a vector.
    ///
    /// Unsplit layout: point-major blocks of `nv` values. Split layout:
    /// outer components (`[0, split_loc)`) of every point first, then inner
    /// components (`[split_loc, nv)`) of every point - same convention the
    /// split Newton solver expects.
    pub fn listify_interior(
        &self,
        split: bool,
        split_loc: Option<usize>,
    ) -> SfdmResult<DVector<f64>> {
        let nv = self.num_components();
        let interior = self.interior();
        let mut out = Vec::with_capacity(interior.len() * nv);
        if split {
            let loc = split_loc.ok_or(SfdmError::SplitLocationMissing)?;
            for cell in interior {
                for j in 0..loc {
                    out.push(cell.value(j));
                }
            }
            for cell in interior {
                for j in loc..nv {
                    out.push(cell.value(j));
                }
            }
        } else {
            for cell in interior {
                for j in 0..nv {
                    out.push(cell.value(j));
                }
            }
        }
        Ok(DVector::from_vec(out))
    }

    /// Explicit Euler update of interior values given a per-point residual
    /// block.
    pub fn update(&mut self, dt: f64, interior_residual_block: &[DVector<f64>]) {
        let ilo = self.ilo();
        for (k, res) in interior_residual_block.iter().enumerate() {
            let cell = &mut self.cells[ilo + k];
            let new_values = cell.values() + dt * res;
            cell.set_values(new_values);
        }
    }

    /// Replace the interior with a new set of cells (mesh refinement).
    /// Ghost bands are rebuilt empty; callers must reapply boundary
    /// conditions before the next residual evaluation.
    pub fn set_interior(&mut self, interior: Vec<Cell>) {
        let nv = self.num_components();
        let mut cells = Vec::with_capacity(interior.len() + 2 * self.nb);
        for _ in 0..self.nb {
            cells.push(Cell::new(self.xmin, DVector::zeros(nv)));
        }
        cells.extend(interior);
        for _ in 0..self.nb {
            cells.push(Cell::new(self.xmax, DVector::zeros(nv)));
        }
        self.cells = cells;
    }
}

///////////////////////////////////////////////////////////////////////////
//                                 TESTS
///////////////////////////////////////////////////////////////////////////

#[test]
fn test_domain_layout() {
    let d = Domain::new(vec!["u".to_string()], 5, 2, 0.0, 1.0).unwrap();
    assert_eq!(d.cells().len(), 9);
    assert_eq!(d.ilo(), 2);
    assert_eq!(d.ihi(), 6);
    assert_eq!(d.num_points(), 5);
    let x_first = d.cells()[d.ilo()].x();
    let x_last = d.cells()[d.ihi()].x();
    assert!((x_first - 0.1).abs() < 1e-12);
    assert!((x_last - 0.9).abs() < 1e-12);
}

#[test]
fn test_degenerate_domain_rejected() {
    assert!(matches!(
        Domain::new(vec!["u".to_string()], 0, 1, 0.0, 1.0),
        Err(SfdmError::MalformedGrid(_))
    ));
    assert!(matches!(
        Domain::new(vec!["u".to_string()], 4, 0, 0.0, 1.0),
        Err(SfdmError::MalformedGrid(_))
    ));
}

#[test]
fn test_component_index() {
    let d = Domain::new(vec!["u".to_string(), "v".to_string()], 4, 1, 0.0, 1.0).unwrap();
    assert_eq!(d.component_index("v").unwrap(), 1);
    assert_eq!(
        d.component_index("w"),
        Err(SfdmError::UnknownComponent("w".to_string()))
    );
}

#[test]
fn test_listify_split_layout() {
    let mut d = Domain::new(vec!["u".to_string(), "v".to_string()], 3, 1, 0.0, 1.0).unwrap();
    let ilo = d.ilo();
    for k in 0..3 {
        d.cell_mut(ilo + k)
            .set_values(DVector::from_vec(vec![k as f64, 10.0 + k as f64]));
    }
    let plain = d.listify_interior(false, None).unwrap();
    assert_eq!(
        plain.as_slice(),
        &[0.0, 10.0, 1.0, 11.0, 2.0, 12.0]
    );
    let split = d.listify_interior(true, Some(1)).unwrap();
    assert_eq!(
        split.as_slice(),
        &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]
    );
    assert_eq!(
        d.listify_interior(true, None),
        Err(SfdmError::SplitLocationMissing)
    );
}

#[test]
fn test_update_explicit_euler() {
    let mut d = Domain::new(vec!["u".to_string()], 2, 1, 0.0, 1.0).unwrap();
    let ilo = d.ilo();
    d.cell_mut(ilo).set_value(0, 1.0);
    d.cell_mut(ilo + 1).set_value(0, 2.0);
    let block = vec![
        DVector::from_vec(vec![-1.0]),
        DVector::from_vec(vec![0.5]),
    ];
    d.update(0.1, &block);
    assert!((d.cells()[ilo].value(0) - 0.9).abs() < 1e-14);
    assert!((d.cells()[ilo + 1].value(0) - 2.05).abs() < 1e-14);
}
