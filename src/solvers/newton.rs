use crate::error::{SfdmError, SfdmResult};
use crate::solvers::solver_utils::{NonlinearSystem, clip, csmat_to_dmatrix, solve_dense_lu};
use log::{info, warn};
use nalgebra::DVector;
use std::collections::HashMap;
use tabled::{builder::Builder, settings::Style};

/// Solver settings shared by [`newton`] and
/// [`split_newton`](crate::solvers::split_newton::split_newton).
#[derive(Debug, Clone)]
pub struct NewtonParams {
    pub tolerance: f64,
    pub max_iterations: usize,
    /// keep the Jacobian in sparse storage between assembly and the linear
    /// solve; the solve itself is a dense LU either way
    pub sparse: bool,
    /// initial pseudo-time step; 0 disables pseudo-transient continuation
    pub dt0: f64,
    /// pseudo-time step cap
    pub dtmax: f64,
    /// Armijo backtracking line search on the residual norm
    pub armijo: bool,
    /// per-unknown (lower, upper) bounds enforced by clipping
    pub bounds: Option<Vec<(f64, f64)>>,
}

impl Default for NewtonParams {
    fn default() -> NewtonParams {
        NewtonParams {
            tolerance: 1e-8,
            max_iterations: 100,
            sparse: true,
            dt0: 0.0,
            dtmax: 1.0,
            armijo: false,
            bounds: None,
        }
    }
}

/// Newton iteration on `F(x) = 0` with optional pseudo-transient
/// continuation, Armijo line search and bounds clipping.
///
/// Pseudo-transient continuation blends the Newton step with an implicit
/// Euler pseudo-time term: the linear system becomes `(J + I/dt) s = F`,
/// with `dt` doubled after every accepted step up to `dtmax`. Far from the
/// solution this damps the step; as `dt` grows the iteration turns back into
/// plain Newton.
///
/// Returns `(x, F(x), iterations)`.
pub fn newton<S: NonlinearSystem>(
    system: &mut S,
    x0: DVector<f64>,
    params: &NewtonParams,
) -> SfdmResult<(DVector<f64>, DVector<f64>, usize)> {
    let n = x0.len();
    let mut x = clip(&x0, &params.bounds);
    let mut fx = system.residual(&x)?;
    let mut dt = params.dt0;
    let mut iter: usize = 0;
    let mut linear_solves: usize = 0;

    while fx.norm() > params.tolerance {
        if iter >= params.max_iterations {
            warn!("Maximum number of iterations reached. No solution found.");
            return Err(SfdmError::Solver(
                "maximum number of iterations reached".to_string(),
            ));
        }

        // the linear solve is a dense LU regardless of params.sparse; the
        // flag only governs how callers assemble and hand over the Jacobian
        let jac = system.jacobian(&x)?;
        let mut a = csmat_to_dmatrix(&jac);
        if dt > 0.0 {
            for k in 0..n {
                a[(k, k)] += 1.0 / dt;
            }
        }
        let step = solve_dense_lu(a, &fx)?;
        linear_solves += 1;

        let mut lambda = 1.0;
        if params.armijo {
            // backtrack until sufficient decrease of the residual norm
            let f0 = fx.norm_squared();
            while lambda > 1e-4 {
                let trial = clip(&(&x - lambda * &step), &params.bounds);
                let f_trial = system.residual(&trial)?;
                if f_trial.norm_squared() <= (1.0 - 1e-4 * lambda) * f0 {
                    break;
                }
                lambda *= 0.5;
            }
            if lambda <= 1e-4 {
                warn!("Armijo line search exhausted, taking the smallest step");
            }
        }

        x = clip(&(&x - lambda * &step), &params.bounds);
        fx = system.residual(&x)?;

        if dt > 0.0 {
            dt = (2.0 * dt).min(params.dtmax);
        }
        iter += 1;
        info!(
            "iteration = {}, residual norm = {:e}, lambda = {}",
            iter,
            fx.norm(),
            lambda
        );
    }

    calc_statistics(n, iter, linear_solves);
    Ok((x, fx, iter))
}

fn calc_statistics(n: usize, iterations: usize, linear_solves: usize) {
    let stats = HashMap::from([
        ("length of x vector".to_string(), n),
        ("number of iterations".to_string(), iterations),
        ("number of linear solves".to_string(), linear_solves),
    ]);
    let mut table = Builder::from(stats).build();
    table.with(Style::modern_rounded());
    info!("\n \n CALC STATISTICS \n \n {}", table.to_string());
}

///////////////////////////////////////////////////////////////////////////
//                                 TESTS
///////////////////////////////////////////////////////////////////////////

#[cfg(test)]
pub(crate) struct QuadraticSystem;

// x^2 + y^2 - 10 = 0, x - y - 4 = 0
#[cfg(test)]
impl NonlinearSystem for QuadraticSystem {
    fn residual(&mut self, x: &DVector<f64>) -> SfdmResult<DVector<f64>> {
        Ok(DVector::from_vec(vec![
            x[0] * x[0] + x[1] * x[1] - 10.0,
            x[0] - x[1] - 4.0,
        ]))
    }
    fn jacobian(&mut self, x: &DVector<f64>) -> SfdmResult<sprs::CsMat<f64>> {
        let mut tri = sprs::TriMat::new((2, 2));
        tri.add_triplet(0, 0, 2.0 * x[0]);
        tri.add_triplet(0, 1, 2.0 * x[1]);
        tri.add_triplet(1, 0, 1.0);
        tri.add_triplet(1, 1, -1.0);
        Ok(tri.to_csr())
    }
}

#[test]
fn test_newton_quadratic_system() {
    let mut sys = QuadraticSystem;
    let x0 = DVector::from_vec(vec![2.0, 0.0]);
    let (x, fx, iter) = newton(&mut sys, x0, &NewtonParams::default()).unwrap();
    assert!(fx.norm() < 1e-8);
    assert!(iter > 0);
    approx::assert_relative_eq!(x[0] - x[1], 4.0, epsilon = 1e-8);
}

#[test]
fn test_newton_with_ptc_and_armijo() {
    let mut sys = QuadraticSystem;
    let x0 = DVector::from_vec(vec![10.0, -10.0]);
    let params = NewtonParams {
        dt0: 0.1,
        dtmax: 10.0,
        armijo: true,
        ..Default::default()
    };
    let (_, fx, _) = newton(&mut sys, x0, &params).unwrap();
    assert!(fx.norm() < 1e-8);
}

#[test]
fn test_newton_bounds_select_root() {
    // x^2 - 4 = 0 with x constrained positive: only the root at 2 is
    // reachable
    struct Scalar;
    impl NonlinearSystem for Scalar {
        fn residual(&mut self, x: &DVector<f64>) -> SfdmResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0] * x[0] - 4.0]))
        }
        fn jacobian(&mut self, x: &DVector<f64>) -> SfdmResult<sprs::CsMat<f64>> {
            let mut tri = sprs::TriMat::new((1, 1));
            tri.add_triplet(0, 0, 2.0 * x[0]);
            Ok(tri.to_csr())
        }
    }
    let params = NewtonParams {
        bounds: Some(vec![(0.5, 10.0)]),
        ..Default::default()
    };
    let (x, _, _) = newton(&mut Scalar, DVector::from_vec(vec![5.0]), &params).unwrap();
    approx::assert_relative_eq!(x[0], 2.0, epsilon = 1e-8);
}

#[test]
fn test_newton_iteration_cap() {
    // no real root: x^2 + 1 = 0 never converges
    struct NoRoot;
    impl NonlinearSystem for NoRoot {
        fn residual(&mut self, x: &DVector<f64>) -> SfdmResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0] * x[0] + 1.0]))
        }
        fn jacobian(&mut self, x: &DVector<f64>) -> SfdmResult<sprs::CsMat<f64>> {
            let mut tri = sprs::TriMat::new((1, 1));
            tri.add_triplet(0, 0, 2.0 * x[0] + 1e-3);
            Ok(tri.to_csr())
        }
    }
    let params = NewtonParams {
        max_iterations: 5,
        ..Default::default()
    };
    let res = newton(&mut NoRoot, DVector::from_vec(vec![1.0]), &params);
    assert!(matches!(res, Err(SfdmError::Solver(_))));
}

#[test]
fn test_newton_already_converged_takes_zero_iterations() {
    struct Linear;
    impl NonlinearSystem for Linear {
        fn residual(&mut self, x: &DVector<f64>) -> SfdmResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0] - 1.0]))
        }
        fn jacobian(&mut self, _x: &DVector<f64>) -> SfdmResult<sprs::CsMat<f64>> {
            let mut tri = sprs::TriMat::new((1, 1));
            tri.add_triplet(0, 0, 1.0);
            Ok(tri.to_csr())
        }
    }
    let (_, _, iter) = newton(
        &mut Linear,
        DVector::from_vec(vec![1.0]),
        &NewtonParams::default(),
    )
    .unwrap();
    assert_eq!(iter, 0);
}
