#[cfg(test)]
mod tests {
    use crate::error::{SfdmError, SfdmResult};
    use crate::grid::cell::Cell;
    use crate::grid::domain::Domain;
    use crate::grid::initialize::InitialCondition;
    use crate::numerical::bc::BoundaryCondition;
    use crate::numerical::derivatives::Scheme;
    use crate::numerical::model::{AdvectionDiffusion, Equation, Model};
    use crate::numerical::simulation::Simulation;
    use crate::solvers::solver_utils::csmat_to_dmatrix;
    use nalgebra::DVector;

    /// residual(u) = u at the stencil center, per component
    struct IdentityEq;
    impl Equation for IdentityEq {
        fn residuals(&self, cell_sub: &[Cell], _scheme: Scheme) -> SfdmResult<DVector<f64>> {
            Ok(cell_sub[cell_sub.len() / 2].values().clone())
        }
    }

    /// residual(u) = -u at the stencil center
    struct DecayEq;
    impl Equation for DecayEq {
        fn residuals(&self, cell_sub: &[Cell], _scheme: Scheme) -> SfdmResult<DVector<f64>> {
            Ok(-cell_sub[cell_sub.len() / 2].values().clone())
        }
    }

    fn diffusion_model() -> Model {
        Model::new(vec![Box::new(AdvectionDiffusion { c: 0.0, nu: 1.0 })])
    }

    fn single_component_sim(nx: usize, model: Model, bc: BoundaryCondition) -> Simulation {
        let d = Domain::new(vec!["u".to_string()], nx, 1, 0.0, 1.0).unwrap();
        Simulation::new(
            d,
            model,
            Scheme::Central,
            &[("u".to_string(), InitialCondition::Constant(0.0))],
            vec![("u".to_string(), bc)],
        )
        .unwrap()
    }

    fn two_component_sim(nx: usize) -> Simulation {
        let d = Domain::new(vec!["u".to_string(), "v".to_string()], nx, 1, 0.0, 1.0).unwrap();
        Simulation::new(
            d,
            diffusion_model(),
            Scheme::Central,
            &[
                ("u".to_string(), InitialCondition::Constant(0.5)),
                ("v".to_string(), InitialCondition::Constant(1.0)),
            ],
            vec![
                (
                    "u".to_string(),
                    BoundaryCondition::Dirichlet {
                        left: 0.0,
                        right: 1.0,
                    },
                ),
                (
                    "v".to_string(),
                    BoundaryCondition::Dirichlet {
                        left: 2.0,
                        right: 0.0,
                    },
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_flatten_unflatten_round_trip() {
        let mut sim = two_component_sim(4);
        let l = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

        sim.initialize_from_list(&l, false, None).unwrap();
        let back = sim.domain().listify_interior(false, None).unwrap();
        assert_eq!(back, l);

        sim.initialize_from_list(&l, true, Some(1)).unwrap();
        let back = sim.domain().listify_interior(true, Some(1)).unwrap();
        assert_eq!(back, l);
    }

    #[test]
    fn test_ghost_band_must_match_stencil() {
        let d = Domain::new(vec!["u".to_string()], 5, 2, 0.0, 1.0).unwrap();
        let res = Simulation::new(d, diffusion_model(), Scheme::Central, &[], vec![]);
        assert!(matches!(res, Err(SfdmError::ImproperStencil(5))));
    }

    #[test]
    fn test_get_shape_rejects_misaligned_list() {
        let d = Domain::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            4,
            1,
            0.0,
            1.0,
        )
        .unwrap();
        let sim = Simulation::new(
            d,
            Model::new(vec![Box::new(IdentityEq)]),
            Scheme::Central,
            &[],
            vec![],
        )
        .unwrap();
        let l = DVector::from_vec(vec![0.0; 7]);
        assert_eq!(
            sim.get_shape_from_list(&l),
            Err(SfdmError::ListShape { len: 7, nv: 3 })
        );
    }

    #[test]
    fn test_split_without_location_is_fatal() {
        let mut sim = two_component_sim(3);
        let l = sim.domain().listify_interior(false, None).unwrap();
        assert_eq!(
            sim.initialize_from_list(&l, true, None),
            Err(SfdmError::SplitLocationMissing)
        );
        assert!(matches!(
            sim.jacobian(&l, true, None, 1e-8),
            Err(SfdmError::SplitLocationMissing)
        ));
    }

    #[test]
    fn test_jacobian_of_identity_residual() {
        let mut sim = single_component_sim(
            5,
            Model::new(vec![Box::new(IdentityEq)]),
            BoundaryCondition::Dirichlet {
                left: 0.0,
                right: 0.0,
            },
        );
        let l = DVector::from_vec(vec![0.3, 0.1, 0.7, 0.2, 0.9]);
        let jac = sim.jacobian(&l, false, None, 1e-8).unwrap();
        let dense = csmat_to_dmatrix(&jac);
        for r in 0..5 {
            for c in 0..5 {
                let expected = if r == c { 1.0 } else { 0.0 };
                approx::assert_relative_eq!(dense[(r, c)], expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_jacobian_restores_grid_state() {
        let mut sim = single_component_sim(
            5,
            diffusion_model(),
            BoundaryCondition::Dirichlet {
                left: 0.0,
                right: 1.0,
            },
        );
        let l = DVector::from_vec(vec![0.3, 0.1, 0.7, 0.2, 0.9]);
        sim.jacobian(&l, false, None, 1e-8).unwrap();
        let after = sim.domain().listify_interior(false, None).unwrap();
        assert_eq!(after, l);
    }

    #[test]
    fn test_jacobian_periodic_long_range_coupling() {
        let mut sim = single_component_sim(6, diffusion_model(), BoundaryCondition::Periodic);
        let l = DVector::from_vec(vec![0.1, 0.4, 0.2, 0.8, 0.3, 0.6]);
        let jac = sim.jacobian(&l, false, None, 1e-8).unwrap();
        let dense = csmat_to_dmatrix(&jac);
        // residual at the first interior point sees the left ghost, which
        // mirrors the last interior point - and vice versa
        assert!(dense[(0, 5)].abs() > 1.0);
        assert!(dense[(5, 0)].abs() > 1.0);
    }

    #[test]
    fn test_split_jacobian_is_permutation_of_unsplit() {
        let mut sim = two_component_sim(3);
        let nv = 2;
        let num_points = 3;
        let sl = 1;
        let l_plain = DVector::from_vec(vec![0.3, 1.1, 0.5, 0.9, 0.8, 1.4]);
        let jac_plain = sim.jacobian(&l_plain, false, None, 1e-8).unwrap();

        // same state in the split layout
        sim.initialize_from_list(&l_plain, false, None).unwrap();
        let l_split = sim.domain().listify_interior(true, Some(sl)).unwrap();
        let jac_split = sim.jacobian(&l_split, true, Some(sl), 1e-8).unwrap();

        let dp = csmat_to_dmatrix(&jac_plain);
        let ds = csmat_to_dmatrix(&jac_split);
        // unsplit index (p, j) maps to p*sl + j (outer) or
        // num_points*sl + p*(nv-sl) + (j-sl) (inner)
        let perm = |idx: usize| -> usize {
            let (p, j) = (idx / nv, idx % nv);
            if j < sl {
                p * sl + j
            } else {
                num_points * sl + p * (nv - sl) + (j - sl)
            }
        };
        for r in 0..nv * num_points {
            for c in 0..nv * num_points {
                approx::assert_relative_eq!(
                    ds[(perm(r), perm(c))],
                    dp[(r, c)],
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_extend_bounds_layouts() {
        let bounds = (vec![0.0, -1.0], vec![1.0, 2.0]);
        let plain = Simulation::extend_bounds(Some(&bounds), 2, 2, false, None)
            .unwrap()
            .unwrap();
        assert_eq!(plain, vec![(0.0, 1.0), (-1.0, 2.0), (0.0, 1.0), (-1.0, 2.0)]);

        let split = Simulation::extend_bounds(Some(&bounds), 2, 2, true, Some(1))
            .unwrap()
            .unwrap();
        assert_eq!(split, vec![(0.0, 1.0), (0.0, 1.0), (-1.0, 2.0), (-1.0, 2.0)]);

        assert_eq!(Simulation::extend_bounds(None, 2, 2, false, None).unwrap(), None);
        let bad = (vec![0.0], vec![1.0]);
        assert!(matches!(
            Simulation::extend_bounds(Some(&bad), 2, 2, false, None),
            Err(SfdmError::MalformedBounds(_))
        ));
    }

    #[test]
    fn test_evolve_explicit_step() {
        let mut sim = single_component_sim(
            4,
            Model::new(vec![Box::new(DecayEq)]),
            BoundaryCondition::Outflow,
        );
        let ones = DVector::from_vec(vec![1.0; 4]);
        sim.initialize_from_list(&ones, false, None).unwrap();
        sim.evolve(0.1, false).unwrap();
        for cell in sim.domain().interior() {
            approx::assert_relative_eq!(cell.value(0), 0.9, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_steady_state_dirichlet_laplace() {
        // u'' = 0 with Dirichlet ghosts pinned at 0 (left) and 1 (right):
        // the discrete steady state is the linear ramp through the ghost
        // anchors at x = -0.1 and x = 1.1, i.e. u_k = (k+1)/6 on the
        // 5-point interior - the grid analogue of u(x) = x
        let mut sim = single_component_sim(
            5,
            diffusion_model(),
            BoundaryCondition::Dirichlet {
                left: 0.0,
                right: 1.0,
            },
        );
        let iter = sim
            .steady_state(false, None, true, 0.0, 1.0, false, None)
            .unwrap();
        assert!(iter > 0);
        let u = sim.domain().listify_interior(false, None).unwrap();
        for k in 0..5 {
            approx::assert_relative_eq!(u[k], (k as f64 + 1.0) / 6.0, epsilon = 1e-6);
        }
        // monotone ramp approximating u(x) = x
        for (cell, &uk) in sim.domain().interior().iter().zip(u.iter()) {
            assert!((uk - cell.x()).abs() < 0.1);
        }
    }

    #[test]
    fn test_steady_state_split_matches_unsplit() {
        let mut sim_plain = two_component_sim(5);
        sim_plain
            .steady_state(false, None, true, 0.0, 1.0, false, None)
            .unwrap();
        let u_plain = sim_plain.domain().listify_interior(false, None).unwrap();

        let mut sim_split = two_component_sim(5);
        sim_split
            .steady_state(true, Some(1), true, 0.0, 1.0, false, None)
            .unwrap();
        let u_split = sim_split.domain().listify_interior(false, None).unwrap();

        for k in 0..u_plain.len() {
            approx::assert_relative_eq!(u_split[k], u_plain[k], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_steady_state_with_ptc_and_bounds() {
        let mut sim = single_component_sim(
            5,
            diffusion_model(),
            BoundaryCondition::Dirichlet {
                left: 0.0,
                right: 1.0,
            },
        );
        let bounds = (vec![-10.0], vec![10.0]);
        sim.steady_state(false, None, true, 0.1, 100.0, true, Some(bounds))
            .unwrap();
        let u = sim.domain().listify_interior(false, None).unwrap();
        for k in 0..5 {
            approx::assert_relative_eq!(u[k], (k as f64 + 1.0) / 6.0, epsilon = 1e-6);
        }
    }
}
