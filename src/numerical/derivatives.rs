use crate::error::{SfdmError, SfdmResult};
use crate::grid::cell::Cell;
use nalgebra::DVector;

/// Discretization scheme for the stencil operators. Single member today;
/// new schemes add variants without touching call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Central,
}

impl Scheme {
    /// Parse the external spec form of a scheme name.
    pub fn from_spec(kind: &str) -> SfdmResult<Scheme> {
        match kind {
            "central" => Ok(Scheme::Central),
            _ => Err(SfdmError::UnsupportedScheme(kind.to_string())),
        }
    }
}

/// stencil half-width for a given scheme; the domain must carry at least
/// this many ghost cells per side
pub fn stencil_halfwidth(scheme: Scheme) -> usize {
    match scheme {
        Scheme::Central => 1,
    }
}

fn check_stencil(cell_sub: &[Cell], scheme: Scheme) -> SfdmResult<()> {
    match scheme {
        Scheme::Central => {
            if cell_sub.len() != 3 {
                return Err(SfdmError::ImproperStencil(cell_sub.len()));
            }
            Ok(())
        }
    }
}

/// First derivative of `F(u)` over a 3-cell stencil ordered by increasing
/// position, evaluated from the two outer cells:
/// `(F(u_right) - F(u_left)) / (x_right - x_left)`.
pub fn dx<F>(f: F, cell_sub: &[Cell], scheme: Scheme) -> SfdmResult<DVector<f64>>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    check_stencil(cell_sub, scheme)?;
    let fl = f(cell_sub[0].values());
    let fr = f(cell_sub[2].values());
    dx_values(&fl, &fr, cell_sub, scheme)
}

/// Same as [`dx`] but with already-evaluated endpoint quantities, for
/// callers that have precomputed them.
pub fn dx_values(
    fl: &DVector<f64>,
    fr: &DVector<f64>,
    cell_sub: &[Cell],
    scheme: Scheme,
) -> SfdmResult<DVector<f64>> {
    check_stencil(cell_sub, scheme)?;
    let dx = cell_sub[2].x() - cell_sub[0].x();
    Ok((fr - fl) / dx)
}

/// Second derivative of `F(u)` over a 3-cell stencil.
///
/// One-sided face derivatives with the full half-width spacings
/// `dxw = x1 - x0`, `dxe = x2 - x1`:
///
/// `Dw = (F(u1) - F(u0)) / dxw`, `De = (F(u2) - F(u1)) / dxe`,
/// result `(De - Dw) / (0.5 * (dxw + dxe))`.
///
/// On a uniform grid this reduces to `(a - 2b + c) / h^2`; on a non-uniform
/// grid the face spacings weight the combination correctly.
pub fn d2x<F>(f: F, cell_sub: &[Cell], scheme: Scheme) -> SfdmResult<DVector<f64>>
where
    F: Fn(&DVector<f64>) -> DVector<f64>,
{
    check_stencil(cell_sub, scheme)?;

    let dxw = cell_sub[1].x() - cell_sub[0].x();
    let dxe = cell_sub[2].x() - cell_sub[1].x();

    let fl = f(cell_sub[0].values());
    let fc = f(cell_sub[1].values());
    let fr = f(cell_sub[2].values());

    let Dw = (&fc - &fl) / dxw;
    let De = (&fr - &fc) / dxe;

    let dx = 0.5 * (dxw + dxe);
    Ok((De - Dw) / dx)
}

///////////////////////////////////////////////////////////////////////////
//                                 TESTS
///////////////////////////////////////////////////////////////////////////

#[cfg(test)]
fn stencil_from(xs: &[f64], vals: &[f64]) -> Vec<Cell> {
    xs.iter()
        .zip(vals)
        .map(|(&x, &v)| Cell::new(x, DVector::from_vec(vec![v])))
        .collect()
}

#[test]
fn test_dx_uniform() {
    // values [a, b, c] at [x0, x0+h, x0+2h]: first derivative = (c - a)/(2h)
    let h = 0.25;
    let s = stencil_from(&[1.0, 1.0 + h, 1.0 + 2.0 * h], &[2.0, 5.0, 3.0]);
    let d = dx(|u| u.clone(), &s, Scheme::Central).unwrap();
    approx::assert_relative_eq!(d[0], (3.0 - 2.0) / (2.0 * h), epsilon = 1e-14);
}

#[test]
fn test_dx_values_overload_matches() {
    let s = stencil_from(&[0.0, 0.3, 0.7], &[1.0, 4.0, -2.0]);
    let a = dx(|u| 2.0 * u, &s, Scheme::Central).unwrap();
    let fl = DVector::from_vec(vec![2.0]);
    let fr = DVector::from_vec(vec![-4.0]);
    let b = dx_values(&fl, &fr, &s, Scheme::Central).unwrap();
    approx::assert_relative_eq!(a[0], b[0], epsilon = 1e-14);
}

#[test]
fn test_d2x_uniform() {
    // values [a, b, c] at uniform spacing h: second derivative = (c - 2b + a)/h^2
    let h = 0.1;
    let s = stencil_from(&[0.0, h, 2.0 * h], &[1.0, 2.5, 3.0]);
    let d = d2x(|u| u.clone(), &s, Scheme::Central).unwrap();
    approx::assert_relative_eq!(d[0], (3.0 - 2.0 * 2.5 + 1.0) / (h * h), epsilon = 1e-10);
}

#[test]
fn test_d2x_nonuniform_exact_for_quadratic() {
    // u = x^2 gives d2u/dx2 = 2 exactly with the half-width face weighting,
    // even on a non-uniform stencil
    let xs = [0.1, 0.35, 1.0];
    let vals: Vec<f64> = xs.iter().map(|x| x * x).collect();
    let s = stencil_from(&xs, &vals);
    let d = d2x(|u| u.clone(), &s, Scheme::Central).unwrap();
    approx::assert_relative_eq!(d[0], 2.0, epsilon = 1e-12);
}

#[test]
fn test_scheme_from_spec() {
    assert_eq!(Scheme::from_spec("central"), Ok(Scheme::Central));
    assert_eq!(
        Scheme::from_spec("upwind"),
        Err(SfdmError::UnsupportedScheme("upwind".to_string()))
    );
}

#[test]
fn test_improper_stencil_rejected() {
    let s = stencil_from(&[0.0, 0.5], &[1.0, 2.0]);
    assert_eq!(
        dx(|u| u.clone(), &s, Scheme::Central),
        Err(SfdmError::ImproperStencil(2))
    );
    assert_eq!(
        d2x(|u| u.clone(), &s, Scheme::Central),
        Err(SfdmError::ImproperStencil(2))
    );
}
