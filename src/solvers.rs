/// NonlinearSystem seam + small linear-algebra helpers
pub mod solver_utils;
/// damped Newton with pseudo-transient continuation, Armijo line search and
/// bounds clipping
pub mod newton;
/// outer/inner partitioned Newton for stiff variable splits
pub mod split_newton;
