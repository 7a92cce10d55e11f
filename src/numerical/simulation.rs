//! # Simulation Driver
//!
//! ## Module Purpose
//! Owns a [`Domain`] and a residual-evaluating [`System`] and drives them
//! either through explicit time evolution or to steady state via the Newton /
//! split-Newton solvers.
//!
//! ## Key Responsibilities
//! - **Flat vector <-> grid conversion**: the nonlinear solvers see a 1D
//!   unknown vector; the grid stores per-cell component values. Two layouts
//!   are supported: unsplit (point-major blocks of `nv` values) and split
//!   (all outer components first, then all inner components - the split
//!   Newton convention).
//! - **Finite-difference Jacobian**: forward differences column by column,
//!   restricted to the coupling band of each point. Periodic variables widen
//!   the band with their wrap indices, because perturbing a far interior cell
//!   changes a boundary ghost that feeds back into a near-boundary residual.
//! - **Steady state**: builds residual/Jacobian closures over the current
//!   flat vector, extends user bounds to per-unknown pairs and delegates to
//!   [`newton`] or [`split_newton`], then writes the converged vector back
//!   into the grid.
//!
//! ## Perturbation Discipline
//! During Jacobian assembly the grid is repeatedly and transiently perturbed.
//! Every perturbation goes through [`with_perturbed`], which restores the
//! original value and the boundary state on every exit path, including the
//! error path - a failed Jacobian build never leaves the grid partially
//! perturbed.

use crate::error::{SfdmError, SfdmResult};
use crate::grid::domain::Domain;
use crate::grid::initialize::{InitialCondition, set_initial_condition};
use crate::grid::refine::Refiner;
use crate::numerical::bc::{BoundaryCondition, apply_bc, extend_band, periodic_components};
use crate::numerical::derivatives::{Scheme, stencil_halfwidth};
use crate::numerical::model::Model;
use crate::numerical::system::System;
use crate::solvers::newton::{NewtonParams, newton};
use crate::solvers::solver_utils::NonlinearSystem;
use crate::solvers::split_newton::split_newton;
use log::info;
use nalgebra::DVector;
use sprs::{CsMat, TriMat};

/// default forward-difference step for Jacobian assembly
pub const DEFAULT_EPSILON: f64 = 1e-8;

fn apply_bcs_all(d: &mut Domain, bcs: &[(String, BoundaryCondition)]) -> SfdmResult<()> {
    let (xmin, xmax) = (d.xmin(), d.xmax());
    for (component, bc) in bcs {
        apply_bc(d, component, bc, xmin, xmax)?;
    }
    Ok(())
}

/// Scoped single-cell perturbation: bump `(loc, var)` by `epsilon`, refresh
/// the boundary state when the cell can affect a ghost, run `eval`, then
/// restore the value and the boundary state before returning - on the error
/// path too.
fn with_perturbed<T>(
    d: &mut Domain,
    bcs: &[(String, BoundaryCondition)],
    loc: usize,
    var: usize,
    epsilon: f64,
    refresh_bcs: bool,
    eval: impl FnOnce(&Domain) -> SfdmResult<T>,
) -> SfdmResult<T> {
    let original = d.cells()[loc].value(var);
    d.cell_mut(loc).set_value(var, original + epsilon);
    if refresh_bcs {
        if let Err(e) = apply_bcs_all(d, bcs) {
            d.cell_mut(loc).set_value(var, original);
            return Err(e);
        }
    }
    let result = eval(&*d);
    d.cell_mut(loc).set_value(var, original);
    if refresh_bcs {
        apply_bcs_all(d, bcs)?;
    }
    result
}

pub struct Simulation {
    domain: Domain,
    system: System,
    refiner: Refiner,
    bcs: Vec<(String, BoundaryCondition)>,
}

impl Simulation {
    /// Construction validates the ghost band against the scheme's stencil,
    /// applies initial conditions, then boundary conditions.
    pub fn new(
        domain: Domain,
        model: Model,
        scheme: Scheme,
        ics: &[(String, InitialCondition)],
        bcs: Vec<(String, BoundaryCondition)>,
    ) -> SfdmResult<Simulation> {
        // residual stencils span 2*nb + 1 cells, which must be what the
        // scheme expects
        if domain.nb() != stencil_halfwidth(scheme) {
            return Err(SfdmError::ImproperStencil(2 * domain.nb() + 1));
        }
        let mut sim = Simulation {
            domain,
            system: System::new(model, scheme),
            refiner: Refiner::default(),
            bcs,
        };
        for (component, ic) in ics {
            set_initial_condition(&mut sim.domain, component, ic)?;
        }
        sim.apply_bcs()?;
        Ok(sim)
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn set_refiner(&mut self, refiner: Refiner) {
        self.refiner = refiner;
    }

    fn apply_bcs(&mut self) -> SfdmResult<()> {
        apply_bcs_all(&mut self.domain, &self.bcs)
    }

    /// One explicit step of size `dt`: reapply BCs, evaluate the residual
    /// block, advance the interior, optionally refine the mesh.
    pub fn evolve(&mut self, dt: f64, refinement: bool) -> SfdmResult<()> {
        self.apply_bcs()?;
        let interior_residual_block = self.system.residuals(&self.domain)?;
        self.domain.update(dt, &interior_residual_block);
        if refinement {
            self.refiner.refine(&mut self.domain);
        }
        Ok(())
    }

    ///////////////////////////////////////////////////////////////////////
    //               LIST (FLAT VECTOR) RELATED METHODS
    ///////////////////////////////////////////////////////////////////////

    /// `(num_points, nv)` shape of a flat vector; errors when the length is
    /// not a multiple of the component count.
    pub fn get_shape_from_list(&self, l: &DVector<f64>) -> SfdmResult<(usize, usize)> {
        let nv = self.domain.num_components();
        if l.len() % nv != 0 {
            return Err(SfdmError::ListShape { len: l.len(), nv });
        }
        Ok((l.len() / nv, nv))
    }

    /// Write a flat vector into the interior cells. Inverse of
    /// [`Domain::listify_interior`] for the same layout.
    pub fn initialize_from_list(
        &mut self,
        l: &DVector<f64>,
        split: bool,
        split_loc: Option<usize>,
    ) -> SfdmResult<()> {
        let (num_points, nv) = self.get_shape_from_list(l)?;
        let ilo = self.domain.ilo();
        if split {
            let loc = split_loc.ok_or(SfdmError::SplitLocationMissing)?;
            for p in 0..num_points {
                let mut values = DVector::zeros(nv);
                for j in 0..loc {
                    values[j] = l[p * loc + j];
                }
                for j in loc..nv {
                    values[j] = l[num_points * loc + p * (nv - loc) + (j - loc)];
                }
                self.domain.cell_mut(ilo + p).set_values(values);
            }
        } else {
            for p in 0..num_points {
                let values = DVector::from_iterator(nv, (0..nv).map(|j| l[p * nv + j]));
                self.domain.cell_mut(ilo + p).set_values(values);
            }
        }
        Ok(())
    }

    /// The residual function handed to the nonlinear solver: unflatten,
    /// reapply BCs, evaluate, reflatten in the same layout as the input.
    pub fn get_residuals_from_list(
        &mut self,
        l: &DVector<f64>,
        split: bool,
        split_loc: Option<usize>,
    ) -> SfdmResult<DVector<f64>> {
        self.initialize_from_list(l, split, split_loc)?;
        self.apply_bcs()?;
        let block = self.system.residuals(&self.domain)?;
        let nv = self.domain.num_components();
        let mut out = Vec::with_capacity(block.len() * nv);
        if split {
            let loc = split_loc.ok_or(SfdmError::SplitLocationMissing)?;
            for r in &block {
                for j in 0..loc {
                    out.push(r[j]);
                }
            }
            for r in &block {
                for j in loc..nv {
                    out.push(r[j]);
                }
            }
        } else {
            for r in &block {
                out.extend(r.iter());
            }
        }
        Ok(DVector::from_vec(out))
    }

    /// Extend per-variable `(lower, upper)` bound lists into per-unknown
    /// pairs honoring the chosen layout.
    pub fn extend_bounds(
        bounds: Option<&(Vec<f64>, Vec<f64>)>,
        num_points: usize,
        nv: usize,
        split: bool,
        split_loc: Option<usize>,
    ) -> SfdmResult<Option<Vec<(f64, f64)>>> {
        let (lower, upper) = match bounds {
            None => return Ok(None),
            Some(b) => (&b.0, &b.1),
        };
        if lower.len() != nv || upper.len() != nv {
            return Err(SfdmError::MalformedBounds(format!(
                "each bound list must have one entry per variable ({})",
                nv
            )));
        }
        let mut out = Vec::with_capacity(num_points * nv);
        if split {
            let loc = split_loc.ok_or(SfdmError::SplitLocationMissing)?;
            for _ in 0..num_points {
                for j in 0..loc {
                    out.push((lower[j], upper[j]));
                }
            }
            for _ in 0..num_points {
                for j in loc..nv {
                    out.push((lower[j], upper[j]));
                }
            }
        } else {
            for _ in 0..num_points {
                for j in 0..nv {
                    out.push((lower[j], upper[j]));
                }
            }
        }
        Ok(Some(out))
    }

    ///////////////////////////////////////////////////////////////////////
    //                        JACOBIAN ASSEMBLY
    ///////////////////////////////////////////////////////////////////////

    /// Finite-difference Jacobian over the flat unknown vector.
    ///
    /// For each interior point the coupling band is `[i-nb, i+nb]` clipped
    /// to the interior, extended with the periodic wrap indices for any
    /// periodic variable. Each band entry is perturbed by `+epsilon`, the
    /// point's stencil residual recomputed and the forward difference
    /// written as a block column: unsplit at
    /// `(row, col) = ((i-ilo)*nv .., (loc-ilo)*nv + j)`, split mode into two
    /// row blocks in the permuted outer-first layout with
    /// `block_offset = num_points * split_loc`.
    pub fn jacobian(
        &mut self,
        l: &DVector<f64>,
        split: bool,
        split_loc: Option<usize>,
        epsilon: f64,
    ) -> SfdmResult<CsMat<f64>> {
        let na = if split {
            Some(split_loc.ok_or(SfdmError::SplitLocationMissing)?)
        } else {
            None
        };
        self.initialize_from_list(l, split, split_loc)?;
        self.apply_bcs()?;

        let (num_points, nv) = self.get_shape_from_list(l)?;
        let n = num_points * nv;
        let periodic_vars = periodic_components(&self.bcs, &self.domain)?;

        let nb = self.domain.nb();
        let ilo = self.domain.ilo();
        let ihi = self.domain.ihi();
        let mut tri = TriMat::new((n, n));

        let Simulation {
            domain,
            system,
            bcs,
            ..
        } = self;

        for i in ilo..=ihi {
            // unperturbed stencil residual, once per point
            let base = system.residuals_at(&domain.cells()[i - nb..=i + nb])?;

            let band_core: Vec<usize> =
                ((i - nb).max(ilo)..=(i + nb).min(ihi)).collect();

            for j in 0..nv {
                let mut band = band_core.clone();
                if periodic_vars.contains(&j) {
                    extend_band(&mut band, i, domain);
                }

                for &loc in &band {
                    // only cells near a boundary can change a ghost value
                    let refresh = loc <= ilo + nb || loc + nb >= ihi;
                    let perturbed = with_perturbed(
                        domain,
                        bcs,
                        loc,
                        j,
                        epsilon,
                        refresh,
                        |d| system.residuals_at(&d.cells()[i - nb..=i + nb]),
                    )?;
                    let col = (perturbed - &base) / epsilon;

                    match na {
                        None => {
                            let row0 = (i - ilo) * nv;
                            let cidx = (loc - ilo) * nv + j;
                            for k in 0..nv {
                                if col[k] != 0.0 {
                                    tri.add_triplet(row0 + k, cidx, col[k]);
                                }
                            }
                        }
                        Some(na) => {
                            let nc = nv - na;
                            let block_offset = num_points * na;
                            let cidx = if j < na {
                                (loc - ilo) * na + j
                            } else {
                                block_offset + (loc - ilo) * nc + (j - na)
                            };
                            // outer rows
                            let row_a = (i - ilo) * na;
                            for k in 0..na {
                                if col[k] != 0.0 {
                                    tri.add_triplet(row_a + k, cidx, col[k]);
                                }
                            }
                            // inner rows, permuted below the outer block
                            let row_c = block_offset + (i - ilo) * nc;
                            for k in 0..nc {
                                if col[na + k] != 0.0 {
                                    tri.add_triplet(row_c + k, cidx, col[na + k]);
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(tri.to_csr())
    }

    ///////////////////////////////////////////////////////////////////////
    //                         STEADY STATE
    ///////////////////////////////////////////////////////////////////////

    /// Drive the grid to `F(u) = 0`. Delegates to [`newton`] (unsplit) or
    /// [`split_newton`] (split) and writes the converged vector back into
    /// the grid. Returns the solver's iteration count.
    #[allow(clippy::too_many_arguments)]
    pub fn steady_state(
        &mut self,
        split: bool,
        split_loc: Option<usize>,
        sparse: bool,
        dt0: f64,
        dtmax: f64,
        armijo: bool,
        bounds: Option<(Vec<f64>, Vec<f64>)>,
    ) -> SfdmResult<usize> {
        let x0 = self.domain.listify_interior(split, split_loc)?;
        let (num_points, nv) = self.get_shape_from_list(&x0)?;
        let ext_bounds = Self::extend_bounds(bounds.as_ref(), num_points, nv, split, split_loc)?;

        let params = NewtonParams {
            sparse,
            dt0,
            dtmax,
            armijo,
            bounds: ext_bounds,
            ..Default::default()
        };

        let mut problem = SteadyStateProblem {
            sim: self,
            split,
            split_loc,
            epsilon: DEFAULT_EPSILON,
        };
        let (xf, _, iter) = if split {
            let sl = split_loc.ok_or(SfdmError::SplitLocationMissing)?;
            let loc = num_points * sl;
            split_newton(&mut problem, x0, loc, &params)?
        } else {
            newton(&mut problem, x0, &params)?
        };

        self.initialize_from_list(&xf, split, split_loc)?;
        self.apply_bcs()?;
        info!("steady state reached in {} iterations", iter);
        Ok(iter)
    }
}

/// Adapter handing the driver's residual and Jacobian to the solvers over
/// one fixed layout choice.
struct SteadyStateProblem<'a> {
    sim: &'a mut Simulation,
    split: bool,
    split_loc: Option<usize>,
    epsilon: f64,
}

impl NonlinearSystem for SteadyStateProblem<'_> {
    fn residual(&mut self, x: &DVector<f64>) -> SfdmResult<DVector<f64>> {
        self.sim.get_residuals_from_list(x, self.split, self.split_loc)
    }

    fn jacobian(&mut self, x: &DVector<f64>) -> SfdmResult<CsMat<f64>> {
        self.sim.jacobian(x, self.split, self.split_loc, self.epsilon)
    }
}
