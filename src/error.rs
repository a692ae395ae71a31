use thiserror::Error;

/// Errors that are shown to the user who triggered them.
#[derive(Error, Debug)]
pub enum ParrotError {
    #[error("No data available for user with ID {0}.")]
    NoData(u64),

    #[error("Message with ID {0} did not exist in the first place.")]
    MessageNotFound(u64),

    #[error("{0} is not registered. To register, run `/register`.")]
    NotRegistered(String),

    #[error("{0}")]
    AlreadyScanning(String),

    #[error("{0}")]
    UserPermission(String),

    #[error("You're doing that too fast. Try again in {0:.1}s.")]
    Cooldown(f64),
}

impl ParrotError {
    /// Pull a user-facing error out of an `anyhow` chain, if there is one.
    pub fn from_anyhow(err: &anyhow::Error) -> Option<&ParrotError> {
        err.chain().find_map(|cause| cause.downcast_ref::<ParrotError>())
    }
}
