use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Flight loop registration failed: {0}")]
    FlightLoop(#[from] bridge_traits::BridgeError),

    #[error("Request server failed: {0}")]
    Server(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
