use crate::error::{SfdmError, SfdmResult};
use crate::grid::domain::Domain;

/// Boundary condition for one solved component. Closed set - `apply_bc`
/// matches exhaustively, there is no fallback branch.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryCondition {
    Periodic,
    Outflow,
    Dirichlet { left: f64, right: f64 },
    Neumann { left: f64, right: f64 },
}

impl BoundaryCondition {
    /// Parse the external spec form: a bare kind (`"periodic"`, `"outflow"`)
    /// or a parameterized kind (`"dirichlet"`/`"neumann"` with a
    /// `[left, right]` pair). Anything else is rejected.
    pub fn from_spec(kind: &str, values: Option<(f64, f64)>) -> SfdmResult<BoundaryCondition> {
        match (kind, values) {
            ("periodic", None) => Ok(BoundaryCondition::Periodic),
            ("outflow", None) => Ok(BoundaryCondition::Outflow),
            ("dirichlet", Some((left, right))) => Ok(BoundaryCondition::Dirichlet { left, right }),
            ("neumann", Some((left, right))) => Ok(BoundaryCondition::Neumann { left, right }),
            _ => Err(SfdmError::UnsupportedBoundary(kind.to_string())),
        }
    }
}

/// Fill every ghost cell's position and value on both sides of the grid for
/// one component. Ghost cells are indexed `0..nb-1` outward from the
/// interior boundary on each side: left ghost `i` lives at cell index
/// `ilo - 1 - i`, right ghost `i` at `ihi + 1 + i`.
///
/// Mutates the domain in place.
pub fn apply_bc(
    d: &mut Domain,
    component: &str,
    bc: &BoundaryCondition,
    xmin: f64,
    xmax: f64,
) -> SfdmResult<()> {
    let idx = d.component_index(component)?;
    let nb = d.nb();
    let ilo = d.ilo();
    let ihi = d.ihi();

    match bc {
        BoundaryCondition::Periodic => {
            // left ghost i mirrors the interior cell at ihi - i; its position
            // sits left of xmin by the distance that cell sits left of xmax
            for i in 0..nb {
                let mirror = ihi - i;
                let shift = xmax - d.cells()[mirror].x();
                let value = d.cells()[mirror].value(idx);
                let g = d.cell_mut(ilo - 1 - i);
                g.set_x(xmin - shift);
                g.set_value(idx, value);
            }
            // right ghost i mirrors ilo + i symmetrically beyond xmax
            for i in 0..nb {
                let mirror = ilo + i;
                let shift = d.cells()[mirror].x() - xmin;
                let value = d.cells()[mirror].value(idx);
                let g = d.cell_mut(ihi + 1 + i);
                g.set_x(xmax + shift);
                g.set_value(idx, value);
            }
        }
        BoundaryCondition::Outflow => {
            // left: zero-gradient, value copied from the leftmost interior;
            // ghost i sits left of xmin by the distance interior cell
            // ilo + i sits right of it
            for i in 0..nb {
                let shift = d.cells()[ilo + i].x() - xmin;
                let value = d.cells()[ilo].value(idx);
                let g = d.cell_mut(ilo - 1 - i);
                g.set_x(xmin - shift);
                g.set_value(idx, value);
            }
            // right: linear extrapolation from the two rightmost interior
            // cells, carried outward one ghost at a time
            let dy = d.cells()[ihi].value(idx) - d.cells()[ihi - 1].value(idx);
            let dxi = d.cells()[ihi].x() - d.cells()[ihi - 1].x();
            let slope = dy / dxi;
            for i in 0..nb {
                let shift = xmax - d.cells()[ihi - i].x();
                d.cell_mut(ihi + 1 + i).set_x(xmax + shift);
                let delta_x = d.cells()[ihi + 1 + i].x() - d.cells()[ihi + i].x();
                let value = d.cells()[ihi + i].value(idx) + slope * delta_x;
                d.cell_mut(ihi + 1 + i).set_value(idx, value);
            }
        }
        BoundaryCondition::Dirichlet { left, right } => {
            for i in 0..nb {
                let shift = d.cells()[ilo + i].x() - xmin;
                let g = d.cell_mut(ilo - 1 - i);
                g.set_x(xmin - shift);
                g.set_value(idx, *left);
            }
            for i in 0..nb {
                let shift = xmax - d.cells()[ihi - i].x();
                let g = d.cell_mut(ihi + 1 + i);
                g.set_x(xmax + shift);
                g.set_value(idx, *right);
            }
        }
        BoundaryCondition::Neumann { left, right } => {
            // cumulative fill keeps multiple ghost layers consistent with a
            // constant prescribed slope
            for i in 0..nb {
                let shift = d.cells()[ilo + i].x() - xmin;
                d.cell_mut(ilo - 1 - i).set_x(xmin - shift);
                let dx_local = d.cells()[ilo - i].x() - d.cells()[ilo - 1 - i].x();
                let value = d.cells()[ilo - i].value(idx) - left * dx_local;
                d.cell_mut(ilo - 1 - i).set_value(idx, value);
            }
            for i in 0..nb {
                let shift = xmax - d.cells()[ihi - i].x();
                d.cell_mut(ihi + 1 + i).set_x(xmax + shift);
                let dx_local = d.cells()[ihi + 1 + i].x() - d.cells()[ihi + i].x();
                let value = d.cells()[ihi + i].value(idx) + right * dx_local;
                d.cell_mut(ihi + 1 + i).set_value(idx, value);
            }
        }
    }
    Ok(())
}

/// Component indices carrying a periodic boundary condition. Periodic
/// variables couple boundary ghosts to distant interior cells, so their
/// Jacobian perturbation band must be widened with the wrap indices.
pub fn periodic_components(
    bcs: &[(String, BoundaryCondition)],
    d: &Domain,
) -> SfdmResult<Vec<usize>> {
    let mut out = Vec::new();
    for (name, bc) in bcs {
        if *bc == BoundaryCondition::Periodic {
            out.push(d.component_index(name)?);
        }
    }
    Ok(out)
}

/// Extend a coupling band with the periodic wrap indices for interior point
/// `i`: when the point's stencil reaches into a ghost band, the interior
/// cells mirrored by those ghosts join the band.
pub fn extend_band(band: &mut Vec<usize>, i: usize, d: &Domain) {
    let nb = d.nb();
    let ilo = d.ilo();
    let ihi = d.ihi();

    // left ghosts used by this stencil mirror ihi - g
    if i < ilo + nb {
        let overlap = ilo + nb - i;
        for g in 0..overlap {
            let wrap = ihi - g;
            if !band.contains(&wrap) {
                band.push(wrap);
            }
        }
    }
    // right ghosts mirror ilo + g
    if i + nb > ihi {
        let overlap = i + nb - ihi;
        for g in 0..overlap {
            let wrap = ilo + g;
            if !band.contains(&wrap) {
                band.push(wrap);
            }
        }
    }
}

///////////////////////////////////////////////////////////////////////////
//                                 TESTS
///////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_domain(nx: usize, nb: usize) -> Domain {
        let mut d = Domain::new(vec!["u".to_string()], nx, nb, 0.0, 1.0).unwrap();
        let ilo = d.ilo();
        for k in 0..nx {
            let x = d.cells()[ilo + k].x();
            d.cell_mut(ilo + k).set_value(0, x);
        }
        d
    }

    #[test]
    fn test_periodic_mirrors_and_is_idempotent() {
        let mut d = ramp_domain(5, 2);
        apply_bc(&mut d, "u", &BoundaryCondition::Periodic, 0.0, 1.0).unwrap();
        let (ilo, ihi) = (d.ilo(), d.ihi());
        for i in 0..2 {
            assert_eq!(d.cells()[ilo - 1 - i].value(0), d.cells()[ihi - i].value(0));
            assert_eq!(d.cells()[ihi + 1 + i].value(0), d.cells()[ilo + i].value(0));
        }
        // ghost spacing matches the mirrored interior spacing
        let dx = d.cells()[ilo].x() - d.cells()[ilo - 1].x();
        approx::assert_relative_eq!(dx, 0.2, epsilon = 1e-12);

        let snapshot: Vec<f64> = d.cells().iter().map(|c| c.value(0)).collect();
        apply_bc(&mut d, "u", &BoundaryCondition::Periodic, 0.0, 1.0).unwrap();
        let again: Vec<f64> = d.cells().iter().map(|c| c.value(0)).collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn test_dirichlet_constant_on_every_ghost() {
        let mut d = ramp_domain(5, 3);
        let bc = BoundaryCondition::Dirichlet {
            left: -2.0,
            right: 7.0,
        };
        apply_bc(&mut d, "u", &bc, 0.0, 1.0).unwrap();
        let (ilo, ihi) = (d.ilo(), d.ihi());
        for i in 0..3 {
            assert_eq!(d.cells()[ilo - 1 - i].value(0), -2.0);
            assert_eq!(d.cells()[ihi + 1 + i].value(0), 7.0);
        }
    }

    #[test]
    fn test_neumann_prescribed_gradient() {
        let mut d = ramp_domain(5, 2);
        let bc = BoundaryCondition::Neumann {
            left: 3.0,
            right: -1.5,
        };
        apply_bc(&mut d, "u", &bc, 0.0, 1.0).unwrap();
        let (ilo, ihi) = (d.ilo(), d.ihi());
        // ghost value minus adjacent filled value over the local width
        // equals the prescribed gradient, layer by layer
        for i in 0..2 {
            let w = d.cells()[ilo - i].x() - d.cells()[ilo - 1 - i].x();
            let g_left = (d.cells()[ilo - i].value(0) - d.cells()[ilo - 1 - i].value(0)) / w;
            approx::assert_relative_eq!(g_left, 3.0, epsilon = 1e-12);

            let w = d.cells()[ihi + 1 + i].x() - d.cells()[ihi + i].x();
            let g_right = (d.cells()[ihi + 1 + i].value(0) - d.cells()[ihi + i].value(0)) / w;
            approx::assert_relative_eq!(g_right, -1.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_outflow_copies_left_extrapolates_right() {
        let mut d = ramp_domain(5, 2);
        apply_bc(&mut d, "u", &BoundaryCondition::Outflow, 0.0, 1.0).unwrap();
        let (ilo, ihi) = (d.ilo(), d.ihi());
        for i in 0..2 {
            assert_eq!(d.cells()[ilo - 1 - i].value(0), d.cells()[ilo].value(0));
        }
        // ramp has unit slope, extrapolation continues it
        for i in 0..2 {
            let g = &d.cells()[ihi + 1 + i];
            approx::assert_relative_eq!(g.value(0), g.x(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ghost_positions_mirror_cell_centered_interior() {
        // 5 cells on [0,1]: interior at 0.1, 0.3, .., 0.9, so ghost i must
        // land at -(0.1 + 0.2*i) and 1 + 0.1 + 0.2*i on the two sides,
        // for every boundary kind
        let kinds = [
            BoundaryCondition::Outflow,
            BoundaryCondition::Dirichlet {
                left: 0.0,
                right: 1.0,
            },
            BoundaryCondition::Neumann {
                left: 0.0,
                right: 0.0,
            },
            BoundaryCondition::Periodic,
        ];
        for bc in &kinds {
            let mut d = ramp_domain(5, 2);
            apply_bc(&mut d, "u", bc, 0.0, 1.0).unwrap();
            let (ilo, ihi) = (d.ilo(), d.ihi());
            for i in 0..2 {
                let expected = 0.1 + 0.2 * i as f64;
                approx::assert_relative_eq!(
                    d.cells()[ilo - 1 - i].x(),
                    -expected,
                    epsilon = 1e-12
                );
                approx::assert_relative_eq!(
                    d.cells()[ihi + 1 + i].x(),
                    1.0 + expected,
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_from_spec_rejects_unknown() {
        assert_eq!(
            BoundaryCondition::from_spec("reflecting", None),
            Err(SfdmError::UnsupportedBoundary("reflecting".to_string()))
        );
        // parameterized kind without its pair is malformed
        assert_eq!(
            BoundaryCondition::from_spec("dirichlet", None),
            Err(SfdmError::UnsupportedBoundary("dirichlet".to_string()))
        );
        assert_eq!(
            BoundaryCondition::from_spec("periodic", None),
            Ok(BoundaryCondition::Periodic)
        );
    }

    #[test]
    fn test_extend_band_wraps_near_boundaries() {
        let d = Domain::new(vec!["u".to_string()], 6, 1, 0.0, 1.0).unwrap();
        let (ilo, ihi) = (d.ilo(), d.ihi());

        let mut band = vec![ilo, ilo + 1];
        extend_band(&mut band, ilo, &d);
        assert!(band.contains(&ihi));

        let mut band = vec![ihi - 1, ihi];
        extend_band(&mut band, ihi, &d);
        assert!(band.contains(&ilo));

        // interior point far from both boundaries: band unchanged
        let mut band = vec![ilo + 2, ilo + 3, ilo + 4];
        let before = band.clone();
        extend_band(&mut band, ilo + 3, &d);
        assert_eq!(band, before);
    }
}
