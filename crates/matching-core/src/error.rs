use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Stream protocol error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
