//! Test doubles for the BOSH director.

use std::sync::{Arc, Mutex, MutexGuard};

use bbl::director::{DirectorClient, DirectorClientProvider, DirectorFuture};
use thiserror::Error;

/// Error returned by [`RecordingClient`] when a failure is queued.
#[derive(Clone, Debug, Error)]
#[error("{0}")]
pub struct DirectorUnavailable(String);

/// A cloud config accepted by the fake director.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Upload {
    /// Director address the client was built for.
    pub address: String,
    /// Uploaded YAML document.
    pub yaml: String,
}

#[derive(Debug, Default)]
struct DirectorLog {
    uploads: Vec<Upload>,
    pending_failure: Option<String>,
}

/// Director provider that records uploads instead of sending them.
#[derive(Clone, Debug, Default)]
pub struct RecordingDirector {
    log: Arc<Mutex<DirectorLog>>,
}

impl RecordingDirector {
    fn lock(&self) -> MutexGuard<'_, DirectorLog> {
        self.log
            .lock()
            .unwrap_or_else(|err| panic!("director log poisoned: {err}"))
    }

    /// Makes the next upload fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.lock().pending_failure = Some(message.to_owned());
    }

    /// Returns the uploads accepted so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<Upload> {
        self.lock().uploads.clone()
    }
}

/// Client handed out by [`RecordingDirector`].
#[derive(Clone, Debug)]
pub struct RecordingClient {
    director: RecordingDirector,
    address: String,
}

impl DirectorClientProvider for RecordingDirector {
    type Client = RecordingClient;

    fn client(&self, address: &str, _username: &str, _password: &str) -> Self::Client {
        RecordingClient {
            director: self.clone(),
            address: address.to_owned(),
        }
    }
}

impl DirectorClient for RecordingClient {
    type Error = DirectorUnavailable;

    fn update_cloud_config<'a>(&'a self, yaml: &'a [u8]) -> DirectorFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut log = self.director.lock();
            if let Some(message) = log.pending_failure.take() {
                return Err(DirectorUnavailable(message));
            }
            log.uploads.push(Upload {
                address: self.address.clone(),
                yaml: String::from_utf8_lossy(yaml).into_owned(),
            });
            Ok(())
        })
    }
}
