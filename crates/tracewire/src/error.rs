use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TraceError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid traceparent header: {0}")]
    Propagation(String),
}
