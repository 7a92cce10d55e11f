use crate::error::{SfdmError, SfdmResult};
use crate::grid::cell::Cell;
use crate::grid::domain::Domain;
use crate::numerical::derivatives::Scheme;
use crate::numerical::model::Model;
use nalgebra::DVector;

/// Wraps a [`Model`] and evaluates its residuals over a domain, one vector
/// of `nv` entries per interior point.
pub struct System {
    model: Model,
    scheme: Scheme,
}

impl System {
    pub fn new(model: Model, scheme: Scheme) -> System {
        System { model, scheme }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Concatenated residuals of all equations for a single stencil. Used
    /// directly by Jacobian assembly so a perturbation only pays for one
    /// stencil evaluation, not the whole grid.
    pub fn residuals_at(&self, cell_sub: &[Cell]) -> SfdmResult<DVector<f64>> {
        let mut entries: Vec<f64> = Vec::new();
        for eq in self.model.equations() {
            let r = eq.residuals(cell_sub, self.scheme)?;
            entries.extend(r.iter());
        }
        Ok(DVector::from_vec(entries))
    }

    /// Residual block over the whole interior: one `nv`-vector per point.
    pub fn residuals(&self, d: &Domain) -> SfdmResult<Vec<DVector<f64>>> {
        let nb = d.nb();
        let nv = d.num_components();
        let cells = d.cells();
        let mut block = Vec::with_capacity(d.num_points());
        for i in d.ilo()..=d.ihi() {
            let cell_sub = &cells[i - nb..=i + nb];
            let r = self.residuals_at(cell_sub)?;
            if r.len() != nv {
                return Err(SfdmError::ModelShape { got: r.len(), nv });
            }
            block.push(r);
        }
        Ok(block)
    }
}

///////////////////////////////////////////////////////////////////////////
//                                 TESTS
///////////////////////////////////////////////////////////////////////////

#[test]
fn test_residual_count_mismatch_is_an_error() {
    // one equation yielding two entries over a single-component domain
    struct TwoEntries;
    impl crate::numerical::model::Equation for TwoEntries {
        fn residuals(&self, _cell_sub: &[Cell], _scheme: Scheme) -> SfdmResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![0.0, 0.0]))
        }
    }
    let d = Domain::new(vec!["u".to_string()], 3, 1, 0.0, 1.0).unwrap();
    let sys = System::new(Model::new(vec![Box::new(TwoEntries)]), Scheme::Central);
    assert_eq!(
        sys.residuals(&d),
        Err(SfdmError::ModelShape { got: 2, nv: 1 })
    );
}
