//! Error types
//!
//! Every failure in the crate ends up as a `ZjaxError`. Values are `Clone`
//! so a debounced burst can hand the same outcome to each waiter.

use zjax_dom::DomError;

/// zjax error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZjaxError {
    /// Malformed trigger, modifier or swap-spec syntax
    #[error("{0}")]
    Grammar(String),

    /// A swap's target or response node could not be found
    #[error("{0}")]
    Resolution(String),

    /// Non-2xx response that no error handler took
    #[error("{status} {reason} for {endpoint}")]
    Network {
        status: u16,
        reason: String,
        endpoint: String,
    },

    /// Unknown named action or uncompilable inline handler
    #[error("{0}")]
    ActionResolution(String),

    /// The transport itself failed
    #[error("Fetch failed for {endpoint}: {message}")]
    Fetch { endpoint: String, message: String },

    /// An action handler reported failure
    #[error("{0}")]
    Action(String),

    /// Invalid configuration call
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl ZjaxError {
    pub fn grammar(message: impl Into<String>) -> Self {
        ZjaxError::Grammar(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        ZjaxError::Resolution(message.into())
    }

    pub fn action(message: impl Into<String>) -> Self {
        ZjaxError::Action(message.into())
    }
}

/// Result type for zjax operations
pub type Result<T> = std::result::Result<T, ZjaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_message() {
        let err = ZjaxError::Network {
            status: 404,
            reason: "Not Found".into(),
            endpoint: "http://localhost/x".into(),
        };
        assert_eq!(err.to_string(), "404 Not Found for http://localhost/x");
    }

    #[test]
    fn test_dom_error_converts() {
        let err: ZjaxError = DomError::HierarchyRequest.into();
        assert!(matches!(err, ZjaxError::Dom(_)));
    }
}
