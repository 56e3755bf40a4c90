#[derive(Debug, thiserror::Error)]
pub enum LinkError {
  #[error("invalid configuration: {0}")]
  Config(String),
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}
