use crate::error::{SfdmError, SfdmResult};
use crate::solvers::newton::{NewtonParams, newton};
use crate::solvers::solver_utils::{NonlinearSystem, clip, csmat_to_dmatrix, solve_dense_lu, submatrix};
use log::info;
use nalgebra::DVector;
use sprs::CsMat;

/// Inner subsystem view: the outer part of the unknown vector is frozen and
/// the residual/Jacobian are restricted to rows and columns `loc..n`.
struct InnerSystem<'a, S: NonlinearSystem> {
    system: &'a mut S,
    xa: DVector<f64>,
    loc: usize,
}

impl<S: NonlinearSystem> InnerSystem<'_, S> {
    fn full_vector(&self, xb: &DVector<f64>) -> DVector<f64> {
        let mut full = DVector::zeros(self.loc + xb.len());
        full.rows_mut(0, self.loc).copy_from(&self.xa);
        full.rows_mut(self.loc, xb.len()).copy_from(xb);
        full
    }
}

impl<S: NonlinearSystem> NonlinearSystem for InnerSystem<'_, S> {
    fn residual(&mut self, xb: &DVector<f64>) -> SfdmResult<DVector<f64>> {
        let full = self.full_vector(xb);
        let f = self.system.residual(&full)?;
        Ok(f.rows(self.loc, xb.len()).into_owned())
    }

    fn jacobian(&mut self, xb: &DVector<f64>) -> SfdmResult<CsMat<f64>> {
        let full = self.full_vector(xb);
        let jac = self.system.jacobian(&full)?;
        let n = full.len();
        Ok(submatrix(&jac, self.loc, n, self.loc, n))
    }
}

/// Split Newton iteration: partition the unknowns at flat index `loc` into
/// an outer block `[0, loc)` and an inner block `[loc, n)`. Each outer
/// iteration first solves the inner subsystem to convergence with the outer
/// part frozen, then takes one (pseudo-transient damped) Newton step on the
/// outer block. Convergence is judged on the full residual norm.
///
/// The Jacobian handed in must be ordered outer rows/columns first, inner
/// second - the same permuted layout the split flat vector uses.
///
/// Returns `(x, F(x), outer iterations)`.
pub fn split_newton<S: NonlinearSystem>(
    system: &mut S,
    x0: DVector<f64>,
    loc: usize,
    params: &NewtonParams,
) -> SfdmResult<(DVector<f64>, DVector<f64>, usize)> {
    let n = x0.len();
    if loc == 0 || loc >= n {
        return Err(SfdmError::Solver(format!(
            "split location {} out of range for {} unknowns",
            loc, n
        )));
    }

    let (outer_bounds, inner_bounds) = match &params.bounds {
        None => (None, None),
        Some(b) => {
            if b.len() != n {
                return Err(SfdmError::MalformedBounds(format!(
                    "{} bound pairs for {} unknowns",
                    b.len(),
                    n
                )));
            }
            (Some(b[..loc].to_vec()), Some(b[loc..].to_vec()))
        }
    };
    // the inner solve runs plain Newton; continuation is the outer loop's job
    let inner_params = NewtonParams {
        bounds: inner_bounds,
        dt0: 0.0,
        ..params.clone()
    };

    let mut xa = x0.rows(0, loc).into_owned();
    let mut xb = x0.rows(loc, n - loc).into_owned();
    let mut dt = params.dt0;
    let mut iter: usize = 0;

    loop {
        // inner subsystem to convergence, outer frozen
        let mut inner = InnerSystem {
            system: &mut *system,
            xa: xa.clone(),
            loc,
        };
        let (xb_new, _, inner_iter) = newton(&mut inner, xb, &inner_params)?;
        xb = xb_new;
        info!("inner solve finished in {} iterations", inner_iter);

        let mut x = DVector::zeros(n);
        x.rows_mut(0, loc).copy_from(&xa);
        x.rows_mut(loc, n - loc).copy_from(&xb);
        let fx = system.residual(&x)?;
        if fx.norm() <= params.tolerance {
            return Ok((x, fx, iter));
        }
        if iter >= params.max_iterations {
            return Err(SfdmError::Solver(
                "maximum number of outer iterations reached".to_string(),
            ));
        }

        // one Newton step on the outer block
        let jac = system.jacobian(&x)?;
        let jaa = submatrix(&jac, 0, loc, 0, loc);
        let mut a = csmat_to_dmatrix(&jaa);
        if dt > 0.0 {
            for k in 0..loc {
                a[(k, k)] += 1.0 / dt;
            }
        }
        let fa = fx.rows(0, loc).into_owned();
        let step = solve_dense_lu(a, &fa)?;
        xa = clip(&(&xa - &step), &outer_bounds);

        if dt > 0.0 {
            dt = (2.0 * dt).min(params.dtmax);
        }
        iter += 1;
        info!(
            "outer iteration = {}, residual norm = {:e}",
            iter,
            fx.norm()
        );
    }
}

///////////////////////////////////////////////////////////////////////////
//                                 TESTS
///////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    // coupled 2-block system:
    //   f0 = x0 + x1 - 3
    //   f1 = x1^2 - 1        (inner, converges to x1 = 1 from positive guess)
    struct Coupled;
    impl NonlinearSystem for Coupled {
        fn residual(&mut self, x: &DVector<f64>) -> SfdmResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![
                x[0] + x[1] - 3.0,
                x[1] * x[1] - 1.0,
            ]))
        }
        fn jacobian(&mut self, x: &DVector<f64>) -> SfdmResult<CsMat<f64>> {
            let mut tri = TriMat::new((2, 2));
            tri.add_triplet(0, 0, 1.0);
            tri.add_triplet(0, 1, 1.0);
            tri.add_triplet(1, 1, 2.0 * x[1]);
            Ok(tri.to_csr())
        }
    }

    #[test]
    fn test_split_newton_coupled_system() {
        let x0 = DVector::from_vec(vec![0.0, 0.5]);
        let (x, fx, _) =
            split_newton(&mut Coupled, x0, 1, &NewtonParams::default()).unwrap();
        assert!(fx.norm() < 1e-8);
        approx::assert_relative_eq!(x[1], 1.0, epsilon = 1e-8);
        approx::assert_relative_eq!(x[0], 2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_split_newton_matches_newton() {
        let x0 = DVector::from_vec(vec![0.0, 0.5]);
        let (x_split, _, _) =
            split_newton(&mut Coupled, x0.clone(), 1, &NewtonParams::default()).unwrap();
        let (x_plain, _, _) = newton(&mut Coupled, x0, &NewtonParams::default()).unwrap();
        approx::assert_relative_eq!(x_split[0], x_plain[0], epsilon = 1e-7);
        approx::assert_relative_eq!(x_split[1], x_plain[1], epsilon = 1e-7);
    }

    #[test]
    fn test_split_location_out_of_range() {
        let x0 = DVector::from_vec(vec![0.0, 0.5]);
        assert!(matches!(
            split_newton(&mut Coupled, x0.clone(), 0, &NewtonParams::default()),
            Err(SfdmError::Solver(_))
        ));
        assert!(matches!(
            split_newton(&mut Coupled, x0, 2, &NewtonParams::default()),
            Err(SfdmError::Solver(_))
        ));
    }
}
