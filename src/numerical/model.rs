use crate::error::SfdmResult;
use crate::grid::cell::Cell;
use crate::numerical::derivatives::{Scheme, d2x, dx};
use nalgebra::DVector;

/// One physical equation, able to evaluate its residual contribution over an
/// arbitrary stencil. An equation may govern several components at once;
/// the concatenated residuals of all model equations must yield exactly one
/// entry per solved component.
pub trait Equation {
    fn residuals(&self, cell_sub: &[Cell], scheme: Scheme) -> SfdmResult<DVector<f64>>;
}

/// Ordered collection of equations making up the physical model.
pub struct Model {
    equations: Vec<Box<dyn Equation>>,
}

impl Model {
    pub fn new(equations: Vec<Box<dyn Equation>>) -> Model {
        Model { equations }
    }

    pub fn equations(&self) -> &[Box<dyn Equation>] {
        &self.equations
    }
}

/// `du/dt = -c * du/dx + nu * d2u/dx2`, vectorized over all components.
pub struct AdvectionDiffusion {
    pub c: f64,
    pub nu: f64,
}

impl Equation for AdvectionDiffusion {
    fn residuals(&self, cell_sub: &[Cell], scheme: Scheme) -> SfdmResult<DVector<f64>> {
        let advection = dx(|u| u.clone(), cell_sub, scheme)?;
        let diffusion = d2x(|u| u.clone(), cell_sub, scheme)?;
        Ok(-self.c * advection + self.nu * diffusion)
    }
}

#[test]
fn test_advection_diffusion_on_linear_profile() {
    // u = x: advection term is -c, diffusion term vanishes
    let cells: Vec<Cell> = [0.0, 0.5, 1.0]
        .iter()
        .map(|&x| Cell::new(x, DVector::from_vec(vec![x])))
        .collect();
    let eq = AdvectionDiffusion { c: 2.0, nu: 1.0 };
    let r = eq.residuals(&cells, Scheme::Central).unwrap();
    approx::assert_relative_eq!(r[0], -2.0, epsilon = 1e-12);
}
