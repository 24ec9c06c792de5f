use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid graph payload: {0}")]
    InvalidGraph(#[from] serde_json::Error),
}
