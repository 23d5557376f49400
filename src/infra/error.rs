use thiserror::Error;

/// Failures raised below the application layer: sockets, the database
/// pool, tracing installation, deployment configuration.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("database unavailable: {0}")]
    Database(String),
    #[error("tracing setup failed: {0}")]
    Telemetry(String),
    #[error("invalid deployment configuration: {0}")]
    Configuration(String),
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_subsystem() {
        let err = InfraError::database("pool exhausted");
        assert_eq!(err.to_string(), "database unavailable: pool exhausted");

        let err = InfraError::configuration("database url is not configured");
        assert_eq!(
            err.to_string(),
            "invalid deployment configuration: database url is not configured"
        );
    }
}
