use thiserror::Error;

#[derive(Debug, Error)]
pub enum LineBotError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("signature result not ready")]
    NotReady,
    #[error("recipient limit exceeded: {count} recipients, limit is {limit}")]
    RecipientLimit { count: usize, limit: usize },
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LineBotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_error_display() {
        let err = LineBotError::Config("x".to_string());
        assert!(format!("{err}").contains("configuration error"));
        let err = LineBotError::RecipientLimit {
            count: 151,
            limit: 150,
        };
        assert!(format!("{err}").contains("151"));
        assert!(format!("{err}").contains("150"));
    }
}
