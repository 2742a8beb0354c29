//! Resource client errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport, authentication or any other API failure
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The object does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// An object with the same name already exists (HTTP 409)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The API server accepted a create but returned no object name
    #[error("Missing name in response for {0}")]
    MissingName(String),
}

impl ClientError {
    /// Map a kube error onto the not-found / already-exists cases the
    /// operations care about. `what` names the object for the message.
    pub fn from_kube(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => ClientError::NotFound(what.to_string()),
            kube::Error::Api(ae) if ae.code == 409 => ClientError::AlreadyExists(what.to_string()),
            other => ClientError::Kube(other),
        }
    }

    /// True for a 404 from the API server.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// True for a 409 from the API server.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::AlreadyExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} test", reason),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_from_kube_not_found() {
        let err = ClientError::from_kube(api_error(404, "NotFound"), "Cluster demo/op-test");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("demo/op-test"));
    }

    #[test]
    fn test_from_kube_conflict() {
        let err = ClientError::from_kube(api_error(409, "AlreadyExists"), "Cluster demo/op-test");
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_from_kube_other_errors_pass_through() {
        let err = ClientError::from_kube(api_error(500, "InternalError"), "Cluster demo/op-test");
        assert!(matches!(err, ClientError::Kube(_)));
        assert!(!err.is_not_found());
    }
}
