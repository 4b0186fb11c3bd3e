pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid settings JSON: {message}")]
    InvalidSettingsJson { message: String },

    #[error("Unknown security level: {value} (expected loose, strict or sandbox)")]
    UnknownSecurityLevel { value: String },

    #[error("Invalid data view JSON: {message}")]
    InvalidDataViewJson { message: String },
}
