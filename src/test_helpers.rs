//! Common test helpers shared across test modules.
//!
//! Builders for canned GitHub responses plus scripted mocks for the
//! transport and clock seams, so retry and store tests stay short.
use reqwest::{
    Method, StatusCode, Url,
    header::{HeaderName, HeaderValue},
};
use secrecy::SecretString;
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::{
    config::StoreConfig,
    store::{
        client::{RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER},
        clock::MockClock,
        transport::{ApiRequest, ApiResponse, MockTransport, TransportError},
    },
};

/// Fixed "now" reported by [`recording_clock`].
pub const TEST_NOW: i64 = 1_700_000_000;

/// Number of requests a scripted mock has served.
#[derive(Debug, Clone, Default)]
pub struct CallCount(Arc<AtomicUsize>);

impl CallCount {
    pub fn load(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn test_token() -> SecretString {
    SecretString::from("test-token".to_string())
}

/// Fully configured settings for `octo/blog` on `main`.
pub fn test_config() -> StoreConfig {
    StoreConfig::new("octo", "blog", "main", Some(test_token()))
}

pub fn test_request() -> ApiRequest {
    let url = Url::parse("https://api.github.com/rate_limit").unwrap();
    ApiRequest::new(Method::GET, url, &test_token()).unwrap()
}

pub fn json_response(status: u16, body: &str) -> ApiResponse {
    ApiResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: Default::default(),
        body: body.to_string(),
    }
}

pub fn set_header(response: &mut ApiResponse, name: &'static str, value: &str) {
    response.headers.insert(
        HeaderName::from_static(name),
        HeaderValue::from_str(value).unwrap(),
    );
}

/// A primary rate limit rejection that resets at `reset` (epoch seconds).
pub fn rate_limited_response(reset: i64) -> ApiResponse {
    let mut response = json_response(
        403,
        r#"{"message": "API rate limit exceeded for user ID 1."}"#,
    );
    set_header(&mut response, RATE_LIMIT_REMAINING_HEADER, "0");
    set_header(&mut response, RATE_LIMIT_RESET_HEADER, &reset.to_string());
    response
}

pub fn rate_limit_body(remaining: u64, limit: u64) -> String {
    serde_json::json!({
        "resources": {
            "core": {"remaining": remaining, "limit": limit, "reset": TEST_NOW + 3600},
        },
        "rate": {"remaining": remaining, "limit": limit, "reset": TEST_NOW + 3600},
    })
    .to_string()
}

pub fn repo_body(push: bool) -> String {
    serde_json::json!({
        "full_name": "octo/blog",
        "default_branch": "main",
        "permissions": {"admin": false, "push": push, "pull": true},
    })
    .to_string()
}

/// Transport that serves `responses` in order and expects exactly that many
/// requests.
pub fn scripted_transport(
    responses: Vec<Result<ApiResponse, TransportError>>,
) -> (MockTransport, CallCount) {
    let count = CallCount::default();
    let served = count.clone();
    let expected = responses.len();
    let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(expected)
        .returning(move |_| {
            served.bump();
            queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("request beyond scripted responses")
        });

    (transport, count)
}

/// Route `times` requests matching `method` and `path` to `response`.
pub fn expect_route(
    transport: &mut MockTransport,
    method: Method,
    path: &str,
    times: usize,
    response: ApiResponse,
) {
    let path = path.to_string();
    transport
        .expect_send()
        .withf(move |req| req.method == method && req.url.path() == path)
        .times(times)
        .returning(move |_| Ok(response.clone()));
}

/// Clock frozen at [`TEST_NOW`] that records every sleep instead of waiting.
pub fn recording_clock() -> (MockClock, Arc<Mutex<Vec<Duration>>>) {
    let sleeps = Arc::new(Mutex::new(vec![]));
    let recorded = Arc::clone(&sleeps);

    let mut clock = MockClock::new();
    clock.expect_now_epoch_secs().return_const(TEST_NOW);
    clock
        .expect_sleep()
        .returning(move |d| recorded.lock().unwrap().push(d));

    (clock, sleeps)
}
