use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("capacity must be non-zero")]
    InvalidCapacity,
    #[error("load factor `{0}` outside (0, 1]")]
    InvalidLoadFactor(f64),
    #[error("no free slot in the addressed bucket")]
    Saturated,
    #[error("tiny pointer `{0}` does not address a slot")]
    PointerOutOfRange(u32),
    #[error("slot does not hold the presented key")]
    KeyMismatch,
    #[error("geometry does not fit the tiny pointer encoding")]
    GeometryOverflow,
    #[error("resize is only supported by the simple variant")]
    ResizeUnsupported,
}

pub type Result<T> = std::result::Result<T, TableError>;
