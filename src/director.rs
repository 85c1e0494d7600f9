//! BOSH director client.

use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const CLOUD_CONFIGS_PATH: &str = "/cloud_configs";

// Directors created by bbl present self-signed certificates.
static HTTP_CLIENT: LazyLock<Result<reqwest::Client, String>> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|err| err.to_string())
});

fn checked_client<'c>(
    built: &'c Result<reqwest::Client, String>,
    address: &str,
) -> Result<&'c reqwest::Client, DirectorError> {
    built.as_ref().map_err(|message| DirectorError::Transport {
        address: address.to_owned(),
        message: format!("failed to build http client: {message}"),
    })
}

/// Convenience alias for boxed director futures.
pub type DirectorFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Operations bbl performs against a BOSH director.
pub trait DirectorClient {
    /// Error type returned by the client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Replaces the director's cloud configuration with `yaml`.
    fn update_cloud_config<'a>(&'a self, yaml: &'a [u8]) -> DirectorFuture<'a, (), Self::Error>;
}

/// Builds director clients from stored credentials.
pub trait DirectorClientProvider {
    /// Client type handed out by the provider.
    type Client: DirectorClient;

    /// Returns a client for the director at `address`.
    fn client(&self, address: &str, username: &str, password: &str) -> Self::Client;
}

/// Errors raised while talking to the director.
#[derive(Debug, Error)]
pub enum DirectorError {
    /// Raised when the request cannot be sent or the body cannot be read.
    #[error("failed to reach bosh director at {address}: {message}")]
    Transport {
        /// Director address.
        address: String,
        /// Transport error message.
        message: String,
    },
    /// Raised when the director rejects the request.
    #[error("bosh director responded with {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

/// Hands out [`BoshDirectorClient`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoshClientProvider;

impl DirectorClientProvider for BoshClientProvider {
    type Client = BoshDirectorClient;

    fn client(&self, address: &str, username: &str, password: &str) -> Self::Client {
        BoshDirectorClient {
            address: address.trim_end_matches('/').to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }
}

/// Director client speaking the BOSH HTTP API with basic auth.
#[derive(Clone, Debug)]
pub struct BoshDirectorClient {
    address: String,
    username: String,
    password: String,
}

impl BoshDirectorClient {
    fn address(&self) -> &str {
        &self.address
    }

    fn transport_error(&self, err: &reqwest::Error) -> DirectorError {
        DirectorError::Transport {
            address: self.address.clone(),
            message: err.to_string(),
        }
    }
}

impl DirectorClient for BoshDirectorClient {
    type Error = DirectorError;

    fn update_cloud_config<'a>(&'a self, yaml: &'a [u8]) -> DirectorFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let http = checked_client(&HTTP_CLIENT, self.address())?;
            let url = format!("{}{CLOUD_CONFIGS_PATH}", self.address());
            debug!(%url, bytes = yaml.len(), "uploading cloud config");
            let response = http
                .post(&url)
                .basic_auth(&self.username, Some(&self.password))
                .header(reqwest::header::CONTENT_TYPE, "text/yaml")
                .body(yaml.to_vec())
                .send()
                .await
                .map_err(|err| self.transport_error(&err))?;

            let status = response.status();
            if status.is_success() {
                info!(address = %self.address(), "cloud config updated");
                return Ok(());
            }

            let body = response
                .text()
                .await
                .map_err(|err| self.transport_error(&err))?;
            Err(DirectorError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_owned(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://10.0.0.6:25555", "https://10.0.0.6:25555")]
    #[case("https://10.0.0.6:25555/", "https://10.0.0.6:25555")]
    fn provider_normalises_address(#[case] address: &str, #[case] expected: &str) {
        let client = BoshClientProvider.client(address, "admin", "secret");
        assert_eq!(client.address(), expected);
    }

    #[rstest]
    fn client_build_failure_is_a_transport_error() {
        let built = Err(String::from("no tls backend"));

        let err = checked_client(&built, "https://10.0.0.6:25555").expect_err("build failure");

        assert_eq!(
            err.to_string(),
            "failed to reach bosh director at https://10.0.0.6:25555: \
             failed to build http client: no tls backend"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_director_is_a_transport_error() {
        let client = BoshClientProvider.client("http://127.0.0.1:1", "admin", "secret");

        let err = client
            .update_cloud_config(b"azs: []\n")
            .await
            .expect_err("connection refused");

        assert!(matches!(
            err,
            DirectorError::Transport { ref address, .. } if address == "http://127.0.0.1:1"
        ));
    }
}
