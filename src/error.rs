use std::path::PathBuf;

pub type ChoraleResult<T> = Result<T, ChoraleError>;

#[derive(thiserror::Error, Debug)]
pub enum ChoraleError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("probe error: {0}")]
    Probe(String),

    #[error("media engine error: {0}")]
    Engine(String),

    #[error("missing input: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChoraleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    pub fn missing_input(path: impl Into<PathBuf>) -> Self {
        Self::MissingInput(path.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ChoraleError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(ChoraleError::layout("x").to_string().contains("layout error:"));
        assert!(ChoraleError::probe("x").to_string().contains("probe error:"));
        assert!(
            ChoraleError::engine("x")
                .to_string()
                .contains("media engine error:")
        );
        assert!(ChoraleError::serde("x").to_string().contains("serialization error:"));
    }

    #[test]
    fn missing_input_names_the_path() {
        let err = ChoraleError::missing_input("videos/1/2.webm");
        assert!(err.to_string().contains("videos/1/2.webm"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ChoraleError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
