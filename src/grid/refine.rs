use crate::grid::cell::Cell;
use crate::grid::domain::Domain;
use itertools::Itertools;
use nalgebra::DVector;

/// Gradient-marked midpoint refinement.
///
/// An interval is marked when any component's jump across it exceeds
/// `tolerance * (max - min)` for that component over the whole interior.
/// Marked intervals get one midpoint cell with linearly interpolated values.
/// Intervals below threshold are left untouched, so repeated refinement
/// concentrates cells where the solution actually varies.
#[derive(Debug, Clone)]
pub struct Refiner {
    pub tolerance: f64,
}

impl Default for Refiner {
    fn default() -> Refiner {
        Refiner { tolerance: 0.2 }
    }
}

impl Refiner {
    pub fn new(tolerance: f64) -> Refiner {
        Refiner { tolerance }
    }

    pub fn refine(&self, d: &mut Domain) {
        let nv = d.num_components();
        let interior: Vec<Cell> = d.interior().to_vec();
        if interior.len() < 2 {
            return;
        }

        // per-component jump threshold over the current interior
        let mut delta = vec![0.0f64; nv];
        for j in 0..nv {
            let mut vmin = f64::MAX;
            let mut vmax = f64::MIN;
            for cell in &interior {
                vmin = vmin.min(cell.value(j));
                vmax = vmax.max(cell.value(j));
            }
            delta[j] = self.tolerance * (vmax - vmin);
        }

        let mut new_interior: Vec<Cell> = Vec::with_capacity(interior.len());
        let mut inserted = 0usize;
        for (left, right) in interior.iter().tuple_windows() {
            new_interior.push(left.clone());
            let marked = (0..nv).any(|j| {
                delta[j] > 0.0 && (right.value(j) - left.value(j)).abs() > delta[j]
            });
            if marked {
                let x_new = 0.5 * (left.x() + right.x());
                let values: DVector<f64> = 0.5 * (left.values() + right.values());
                new_interior.push(Cell::new(x_new, values));
                inserted += 1;
            }
        }
        new_interior.push(interior.last().unwrap().clone());

        if inserted > 0 {
            log::info!(
                "mesh refinement: {} -> {} interior points",
                interior.len(),
                new_interior.len()
            );
            d.set_interior(new_interior);
        }
    }
}

#[test]
fn test_refine_marks_steep_interval() {
    let mut d = Domain::new(vec!["u".to_string()], 5, 1, 0.0, 1.0).unwrap();
    let ilo = d.ilo();
    // flat everywhere except one steep jump between cells 2 and 3
    let profile = [0.0, 0.0, 0.0, 1.0, 1.0];
    for (k, v) in profile.iter().enumerate() {
        d.cell_mut(ilo + k).set_value(0, *v);
    }
    Refiner::default().refine(&mut d);
    assert_eq!(d.num_points(), 6);
    // midpoint between x=0.5 and x=0.7, interpolated value 0.5
    let inserted = &d.interior()[3];
    assert!((inserted.x() - 0.6).abs() < 1e-12);
    assert!((inserted.value(0) - 0.5).abs() < 1e-12);
}

#[test]
fn test_refine_leaves_flat_profile_alone() {
    let mut d = Domain::new(vec!["u".to_string()], 5, 1, 0.0, 1.0).unwrap();
    let ilo = d.ilo();
    for k in 0..5 {
        d.cell_mut(ilo + k).set_value(0, 2.0);
    }
    Refiner::default().refine(&mut d);
    assert_eq!(d.num_points(), 5);
}
