use satellite_core::error::RemoteCallError;

/// Errors from the orchestrator HTTP client layer.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The orchestrator answered with a status other than the expected one.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl RpcError {
    /// Attach the attempted operation, producing the collaborator error the
    /// plugin traits expose.
    pub fn during(self, operation: impl Into<String>) -> RemoteCallError {
        match self {
            RpcError::Request(e) => RemoteCallError {
                operation: operation.into(),
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            RpcError::UnexpectedStatus { status, body } => RemoteCallError {
                operation: operation.into(),
                status: Some(status),
                message: body,
            },
        }
    }
}

/// Fail unless the response carries exactly `expected`.
pub(crate) async fn expect_status(
    response: reqwest::Response,
    expected: reqwest::StatusCode,
) -> Result<reqwest::Response, RpcError> {
    let status = response.status();
    if status != expected {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(RpcError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Check the status, then decode the JSON body.
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    expected: reqwest::StatusCode,
) -> Result<T, RpcError> {
    let response = expect_status(response, expected).await?;
    Ok(response.json::<T>().await?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
