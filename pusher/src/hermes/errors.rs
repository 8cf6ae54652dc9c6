use thiserror::Error;

#[derive(Error, Debug)]
pub enum HermesError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from price service: {0}")]
    InvalidResponse(String),

    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("numeric parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
}
