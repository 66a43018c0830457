use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitpinError {
    #[error("Remote unreachable: {0}")]
    Network(String),

    #[error("Update failed: {0}")]
    Update(String),

    #[error("Local and remote have diverged ({ahead} ahead, {behind} behind); refusing to pull")]
    Diverged { ahead: usize, behind: usize },

    #[error("Malformed dependency section in {file}: {message}")]
    ManifestParse { file: String, message: String },

    #[error("Install failed: {0}")]
    Install(String),

    #[error("Git operation failed: {0}")]
    GitOperation(String),

    #[error("Repository validation failed: {0}")]
    RepositoryValidation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GitpinError {
    /// Name of the error kind as reported to the user.
    pub fn kind(&self) -> &'static str {
        match self {
            GitpinError::Network(_) => "NetworkError",
            GitpinError::Update(_) => "UpdateError",
            GitpinError::Diverged { .. } => "DivergedError",
            GitpinError::ManifestParse { .. } => "ManifestParseError",
            GitpinError::Install(_) => "InstallError",
            GitpinError::GitOperation(_) => "GitError",
            GitpinError::RepositoryValidation(_) => "RepositoryError",
            GitpinError::Config(_) | GitpinError::Toml(_) => "ConfigError",
            GitpinError::Io(_) => "IoError",
        }
    }

    /// Re-classifies a collaborator failure as an update failure, keeping
    /// divergence distinct so the user sees why a pull was refused.
    pub fn into_update(self) -> Self {
        match self {
            GitpinError::Update(_) | GitpinError::Diverged { .. } => self,
            other => GitpinError::Update(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GitpinError>;
