use std::time::Duration;

use deepguard_domain::ports::BoxFuture;
use deepguard_domain::ports::media::{FetchError, ResourceFetcher};

/// Largest body accepted for a single image.
const MAX_RESOURCE_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct HttpResourceFetcher {
    http: reqwest::Client,
}

impl HttpResourceFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl ResourceFetcher for HttpResourceFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self.http.get(&url).send().await.map_err(map_reqwest_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            if response
                .content_length()
                .is_some_and(|length| length as usize > MAX_RESOURCE_BYTES)
            {
                return Err(FetchError::Transport("resource too large".into()));
            }
            let body = response.bytes().await.map_err(map_reqwest_error)?;
            if body.len() > MAX_RESOURCE_BYTES {
                return Err(FetchError::Transport("resource too large".into()));
            }
            Ok(body.to_vec())
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.to_string())
    }
}
