use std::fmt;

/// Rejections raised before (or instead of) a computation.
///
/// Numeric non-convergence and incomplete factorization are not errors; they
/// are reported through flags on the result types.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectraError {
    NotTwoDimensional,
    NotSquare { rows: usize, row: usize, len: usize },
    InvalidEntry { row: usize, col: usize, value: String },
    NotSymmetric,
    WrongKind { expected: &'static str },
    VertexOutOfRange { vertex: usize, n: usize },
    SelfLoop { vertex: usize },
    InexactTrace { k: usize },
    TooLarge { n: usize, max: usize },
    Cancelled,
}

impl fmt::Display for SpectraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectraError::NotTwoDimensional => {
                write!(f, "matrix must be a two-dimensional array of rows")
            }
            SpectraError::NotSquare { rows, row, len } => {
                write!(f, "matrix is not square: {rows} rows but row {row} has {len} entries")
            }
            SpectraError::InvalidEntry { row, col, value } => {
                write!(f, "invalid entry {value} at ({row}, {col}): expected -1, 0 or 1")
            }
            SpectraError::NotSymmetric => {
                write!(f, "matrix is neither a symmetric 0/1 adjacency nor antisymmetric")
            }
            SpectraError::WrongKind { expected } => write!(f, "expected a {expected} matrix"),
            SpectraError::VertexOutOfRange { vertex, n } => {
                write!(f, "vertex {vertex} out of range for {n} vertices")
            }
            SpectraError::SelfLoop { vertex } => write!(f, "self-loop at vertex {vertex}"),
            SpectraError::InexactTrace { k } => {
                write!(f, "trace not divisible by {k} in Faddeev-LeVerrier step")
            }
            SpectraError::TooLarge { n, max } => {
                write!(f, "{n} vertices exceeds the supported maximum of {max}")
            }
            SpectraError::Cancelled => write!(f, "computation cancelled"),
        }
    }
}

impl std::error::Error for SpectraError {}

pub type Result<T> = std::result::Result<T, SpectraError>;
