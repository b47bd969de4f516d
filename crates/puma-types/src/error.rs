use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    #[error("Invalid material table: {0}")]
    InvalidMaterialTable(String),

    #[error("Invalid orientation field: {0}")]
    InvalidOrientationField(String),

    #[error("Invalid boundary condition '{0}': expected \"symmetric\" or \"periodic\"")]
    InvalidBoundaryCondition(String),

    #[error("Invalid boundary matrix: {0}")]
    InvalidBoundaryMatrix(String),

    #[error("Invalid method '{0}': expected \"mpfa\" or \"empfa\"")]
    InvalidMethod(String),

    #[error("Invalid solver '{0}': expected \"cg\" or \"bicgstab\"")]
    InvalidSolver(String),

    #[error("Invalid direction '{0}': expected \"x\", \"y\" or \"z\"")]
    InvalidDirection(String),

    #[error("Degenerate domain: {0}")]
    DegenerateDomain(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
