use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CasebotError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },

    #[error("{operation} hook of {component} reported failure")]
    HookFailed {
        component: String,
        operation: &'static str,
    },

    #[error("{operation} hook of {component} timed out after {timeout:?}")]
    HookTimeout {
        component: String,
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Component {component} failed to initialize")]
    InitializationFailed { component: String },

    #[error("Component {component} failed to shut down: {source}")]
    ShutdownFailed {
        component: String,
        #[source]
        source: Arc<CasebotError>,
    },

    #[error("Component {name} not found")]
    ComponentNotFound { name: String },

    #[error("Component {component} is not available")]
    ComponentUnavailable { component: String },
}

impl CasebotError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn unavailable<S: Into<String>>(component: S) -> Self {
        Self::ComponentUnavailable {
            component: component.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CasebotError>;
