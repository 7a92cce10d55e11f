use nalgebra::DVector;

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    x: f64,
    values: DVector<f64>,
}

impl Cell {
    pub fn new(x: f64, values: DVector<f64>) -> Cell {
        Cell { x, values }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    pub fn value(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    pub fn set_value(&mut self, idx: usize, value: f64) {
        self.values[idx] = value;
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn set_values(&mut self, values: DVector<f64>) {
        self.values = values;
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }
}
