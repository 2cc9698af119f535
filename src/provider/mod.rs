mod gateway;
mod maps;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tripweave_shared::ServiceError;

pub use gateway::GatewayClient;
pub use maps::MapsClient;

pub(crate) fn http_client(timeout: Duration) -> Result<Client, ServiceError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tripweave/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ServiceError::Network(e.to_string()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Network("request timed out".to_owned())
    } else if err.is_decode() {
        ServiceError::Malformed(err.to_string())
    } else {
        ServiceError::Network(err.to_string())
    }
}

/// Maps a non-success HTTP status to the service error taxonomy.
pub(crate) async fn error_for_status(res: Response) -> ServiceError {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();

    match status {
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited,
        StatusCode::NOT_FOUND => ServiceError::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::InvalidRequest(body)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ServiceError::Unavailable("credentials were rejected".to_owned())
        }
        s => ServiceError::Unavailable(format!("http {}: {body}", s.as_u16())),
    }
}
