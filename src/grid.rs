/// single grid point: position + one value per solved component
pub mod cell;
/// 1D cell storage: left ghost band, interior band, right ghost band
pub mod domain;
/// canned initial condition profiles
pub mod initialize;
/// gradient-marked midpoint mesh refinement
pub mod refine;
