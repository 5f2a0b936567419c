//! Rate limiting middleware, shaped like `stellarroute-api`'s
//! `RateLimitLayer`/`RateLimitService`: a `tower::Layer` wrapping an
//! in-process sliding-window counter per client IP.

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tower::{Layer, Service};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 60, window: Duration::from_secs(60) }
    }
}

#[derive(Clone)]
struct RateLimiterState {
    requests: HashMap<IpAddr, Vec<Instant>>,
}

impl RateLimiterState {
    fn new() -> Self {
        Self { requests: HashMap::new() }
    }

    fn check_rate_limit(&mut self, ip: IpAddr, config: &RateLimitConfig) -> bool {
        let now = Instant::now();
        let cutoff = now.checked_sub(config.window).unwrap_or(now);

        let requests = self.requests.entry(ip).or_default();
        requests.retain(|&time| time > cutoff);

        if requests.len() < config.max_requests {
            requests.push(now);
            true
        } else {
            false
        }
    }
}

#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<Mutex<RateLimiterState>>,
    config: RateLimitConfig,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { state: Arc::new(Mutex::new(RateLimiterState::new())), config }
    }
}

impl Default for RateLimitLayer {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService { inner, state: self.state.clone(), config: self.config.clone() }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<Mutex<RateLimiterState>>,
    config: RateLimitConfig,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let state = self.state.clone();
        let config = self.config.clone();

        let ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::from([127, 0, 0, 1]));

        Box::pin(async move {
            let mut state = state.lock().await;
            let allowed = state.check_rate_limit(ip, &config);
            drop(state);

            if !allowed {
                return Ok((StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded, try again later").into_response());
            }

            inner.call(req).await
        })
    }
}
