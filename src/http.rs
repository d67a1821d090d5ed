use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::GeoMapError;
use crate::events::{EventSink, FetchEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One blocking GET, no retries.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, GeoMapError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, GeoMapError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("geo-pubmap/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GeoMapError::HttpClient(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GeoMapError::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, GeoMapError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| GeoMapError::Http(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|err| GeoMapError::Http(err.to_string()))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Fixed attempt count and fixed wait; every failure is treated the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub wait: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_WAIT_MS: u64 = 1000;

    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self { max_attempts, wait }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            wait: Duration::from_millis(Self::DEFAULT_WAIT_MS),
        }
    }
}

pub struct RetryingFetcher<T: Transport, S: Sleeper = ThreadSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingFetcher<T, ThreadSleeper> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, ThreadSleeper, policy)
    }
}

impl<T: Transport, S: Sleeper> RetryingFetcher<T, S> {
    pub fn with_sleeper(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the body of the first successful response, or `None` once
    /// `max_attempts` tries have failed. Waits after every failed try.
    pub fn fetch(&self, url: &str, sink: &dyn EventSink) -> Option<Vec<u8>> {
        for attempt in 1..=self.policy.max_attempts {
            let status = match self.transport.get(url) {
                Ok(response) if response.is_success() => return Some(response.body),
                Ok(response) => Some(response.status),
                Err(_) => None,
            };
            sink.event(FetchEvent::AttemptFailed {
                url: url.to_string(),
                attempt,
                status,
            });
            self.sleeper.sleep(self.policy.wait);
        }
        sink.event(FetchEvent::RetriesExhausted {
            url: url.to_string(),
            attempts: self.policy.max_attempts,
        });
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::events::MemorySink;

    struct Scripted {
        replies: Mutex<VecDeque<Result<HttpResponse, GeoMapError>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<HttpResponse, GeoMapError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    impl Transport for Scripted {
        fn get(&self, _url: &str) -> Result<HttpResponse, GeoMapError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GeoMapError::Http("script exhausted".to_string())))
        }
    }

    #[derive(Default)]
    struct CountingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl Sleeper for &CountingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn status(code: u16) -> Result<HttpResponse, GeoMapError> {
        Ok(HttpResponse {
            status: code,
            body: b"body".to_vec(),
        })
    }

    #[test]
    fn retries_until_success() {
        let sleeper = CountingSleeper::default();
        let transport = Scripted::new(vec![
            status(503),
            Err(GeoMapError::Http("reset".to_string())),
            status(200),
        ]);
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let fetcher = RetryingFetcher::with_sleeper(transport, &sleeper, policy);
        let sink = MemorySink::new();

        let body = fetcher.fetch("http://example/x", &sink);

        assert_eq!(body.as_deref(), Some(&b"body"[..]));
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let sleeper = CountingSleeper::default();
        let transport = Scripted::new(vec![status(404), status(404), status(404), status(200)]);
        let policy = RetryPolicy::new(3, Duration::from_millis(250));
        let fetcher = RetryingFetcher::with_sleeper(transport, &sleeper, policy);
        let sink = MemorySink::new();

        assert!(fetcher.fetch("http://example/y", &sink).is_none());
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_millis(250); 3]
        );
        assert_eq!(
            sink.warnings(),
            vec![FetchEvent::RetriesExhausted {
                url: "http://example/y".to_string(),
                attempts: 3,
            }]
        );
    }

    #[test]
    fn zero_attempts_never_requests() {
        let sleeper = CountingSleeper::default();
        let transport = Scripted::new(vec![status(200)]);
        let fetcher =
            RetryingFetcher::with_sleeper(transport, &sleeper, RetryPolicy::new(0, Duration::ZERO));
        assert!(fetcher.fetch("http://example/z", &MemorySink::new()).is_none());
        assert_eq!(fetcher.transport().replies.lock().unwrap().len(), 1);
    }
}
