use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("At least one keyword is required")]
    NoKeywords,

    #[error("City is required")]
    BlankCity,

    #[error("Max results must be greater than zero")]
    InvalidMaxResults,
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Overpass API error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Overpass API returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed Overpass payload: {0}")]
    Payload(String),
}

#[derive(Error, Debug)]
pub enum ArtifactWriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
