use crate::error::SfdmResult;
use crate::grid::domain::Domain;

/// Initial condition profiles for a single component.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialCondition {
    Constant(f64),
    /// unit-amplitude gaussian centered at the domain midpoint,
    /// width (xmax - xmin)/10
    Gaussian,
    /// 1 -> 2 step at the domain midpoint
    Rarefaction,
}

pub fn set_initial_condition(
    d: &mut Domain,
    component: &str,
    ic: &InitialCondition,
) -> SfdmResult<()> {
    let idx = d.component_index(component)?;
    let xmid = 0.5 * (d.xmin() + d.xmax());
    let sigma = (d.xmax() - d.xmin()) / 10.0;

    let ilo = d.ilo();
    let ihi = d.ihi();
    for i in ilo..=ihi {
        let x = d.cells()[i].x();
        let value = match ic {
            InitialCondition::Constant(v) => *v,
            InitialCondition::Gaussian => (-(x - xmid).powi(2) / (2.0 * sigma * sigma)).exp(),
            InitialCondition::Rarefaction => {
                if x <= xmid {
                    1.0
                } else {
                    2.0
                }
            }
        };
        d.cell_mut(i).set_value(idx, value);
    }
    Ok(())
}

#[test]
fn test_constant_ic() {
    let mut d = Domain::new(vec!["u".to_string()], 4, 1, 0.0, 1.0).unwrap();
    set_initial_condition(&mut d, "u", &InitialCondition::Constant(3.5)).unwrap();
    for cell in d.interior() {
        assert_eq!(cell.value(0), 3.5);
    }
}

#[test]
fn test_gaussian_ic_peaks_at_center() {
    let mut d = Domain::new(vec!["u".to_string()], 21, 1, 0.0, 1.0).unwrap();
    set_initial_condition(&mut d, "u", &InitialCondition::Gaussian).unwrap();
    let values: Vec<f64> = d.interior().iter().map(|c| c.value(0)).collect();
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    // middle cell of 21 sits exactly at x = 0.5
    assert!((values[10] - 1.0).abs() < 1e-12);
    assert_eq!(values[10], max);
}

#[test]
fn test_rarefaction_ic() {
    let mut d = Domain::new(vec!["u".to_string()], 10, 1, 0.0, 1.0).unwrap();
    set_initial_condition(&mut d, "u", &InitialCondition::Rarefaction).unwrap();
    let interior = d.interior();
    assert_eq!(interior[0].value(0), 1.0);
    assert_eq!(interior[9].value(0), 2.0);
}
