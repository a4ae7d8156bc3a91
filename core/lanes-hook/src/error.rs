use lanes_core::LanesError;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error(transparent)]
    Core(#[from] LanesError),

    #[error("Failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("Failed to parse hook input: {0}")]
    Payload(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HookError>;
