use thiserror::Error;

/// The single domain error of the crate. Every failure is fatal to the
/// enclosing call - no retries, no partial results.
#[derive(Debug, Error, PartialEq)]
pub enum SfdmError {
    #[error("Improper stencil size for central difference scheme: got {0} cells")]
    ImproperStencil(usize),

    #[error("Unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Unsupported boundary condition '{0}'")]
    UnsupportedBoundary(String),

    #[error("Unknown component '{0}'")]
    UnknownComponent(String),

    #[error("Malformed grid: {0}")]
    MalformedGrid(String),

    #[error("List length not aligned with interior size: {len} values for {nv} components")]
    ListShape { len: usize, nv: usize },

    #[error("Model produced {got} residual entries for {nv} components")]
    ModelShape { got: usize, nv: usize },

    #[error("Split location must be specified in this case")]
    SplitLocationMissing,

    #[error("Malformed bounds: {0}")]
    MalformedBounds(String),

    #[error("Solver error: {0}")]
    Solver(String),
}

pub type SfdmResult<T> = Result<T, SfdmError>;
