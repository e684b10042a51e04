use thiserror::Error;

/// Failures raised below the application layer: sockets, the connection
/// pool, and subscriber installation.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("database unavailable: {message}")]
    Database { message: String },
    #[error("configuration rejected: {message}")]
    Configuration { message: String },
    #[error("telemetry setup failed: {message}")]
    Telemetry { message: String },
}

impl InfraError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry {
            message: message.into(),
        }
    }
}
