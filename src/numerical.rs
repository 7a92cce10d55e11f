/// stencil-level first and second derivative operators
pub mod derivatives;
/// ghost-cell boundary condition filler + periodic wrap adjacency
pub mod bc;
/// Equation trait, Model container and builtin equations
pub mod model;
/// per-point residual assembly over the whole interior
pub mod system;
/// the simulation driver: flat vector <-> grid conversion, finite-difference
/// Jacobian assembly, evolution step and steady-state solve
pub mod simulation;
#[cfg(test)]
pub mod simulation_tests;
