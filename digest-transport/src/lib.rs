//! HTTP Digest authentication (RFC 2617) for outbound camera requests
//!
//! [`DigestTransport`] wraps a `reqwest::Client`. Each request is first sent
//! without credentials; a `401` carrying a `Digest` challenge is answered with
//! exactly one authenticated retry. Challenges are cached per destination URL
//! and swept after a fixed TTL.

mod challenge;
mod error;

pub use challenge::Challenge;
pub use error::DigestError;

use parking_lot::Mutex;
use rand::RngCore;
use reqwest::header::{HeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Request, Response, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How often the challenge cache is swept.
pub const CHALLENGE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Age after which a cached challenge is discarded.
pub const CHALLENGE_TTL: Duration = Duration::from_secs(300);

/// Digest-authenticating wrapper around a `reqwest::Client`.
#[derive(Debug)]
pub struct DigestTransport {
    client: Client,
    username: String,
    password: String,
    challenges: Mutex<HashMap<String, Challenge>>,
    nc: AtomicU32,
    shutdown: CancellationToken,
}

impl DigestTransport {
    pub fn new(client: Client, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client,
            username: username.into(),
            password: password.into(),
            challenges: Mutex::new(HashMap::new()),
            nc: AtomicU32::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    /// The wrapped client, for building requests.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request, answering a Digest challenge if the server issues one.
    ///
    /// The body must be replayable (`Request::try_clone` must succeed). If the
    /// authenticated retry is also rejected, that `401` response is returned
    /// as-is; there is no second retry.
    pub async fn execute(&self, request: Request) -> Result<Response, DigestError> {
        let mut retry = request.try_clone().ok_or(DigestError::BodyNotReplayable)?;
        let key = request.url().to_string();

        let response = self.client.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let header = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .ok_or(DigestError::MissingChallenge)?
            .to_str()
            .map_err(|e| DigestError::InvalidChallenge(e.to_string()))?
            .to_string();
        drop(response);

        let challenge = Challenge::parse(&header)?;
        self.challenges.lock().insert(key.clone(), challenge.clone());
        tracing::debug!(url = %key, realm = %challenge.realm, "Answering digest challenge");

        let authorization = self.authorization(&retry, &challenge);
        let value = HeaderValue::from_str(&authorization)
            .map_err(|e| DigestError::InvalidChallenge(e.to_string()))?;
        retry.headers_mut().insert(AUTHORIZATION, value);

        let response = self.client.execute(retry).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %key, "Digest credentials rejected");
        }
        Ok(response)
    }

    /// Build the `Authorization` header value for a request.
    fn authorization(&self, request: &Request, challenge: &Challenge) -> String {
        let url = request.url();
        let uri = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let (nc, cnonce) = if challenge.qop.is_empty() {
            (String::new(), String::new())
        } else {
            let count = self.nc.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
            (format!("{:08x}", count), generate_cnonce())
        };

        let response = challenge.response(
            &self.username,
            &self.password,
            request.method().as_str(),
            &uri,
            &nc,
            &cnonce,
        );

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}""#,
            self.username, challenge.realm, challenge.nonce, uri, response
        );
        if !challenge.opaque.is_empty() {
            header.push_str(&format!(r#", opaque="{}""#, challenge.opaque));
        }
        if !challenge.algorithm.is_empty() && challenge.algorithm != "MD5" {
            header.push_str(&format!(r#", algorithm="{}""#, challenge.algorithm));
        }
        if !challenge.qop.is_empty() {
            header.push_str(&format!(
                r#", qop={}, nc={}, cnonce="{}""#,
                challenge.qop, nc, cnonce
            ));
        }
        header
    }

    /// Number of cached challenges.
    pub fn cached_challenges(&self) -> usize {
        self.challenges.lock().len()
    }

    /// Drop challenges older than `ttl`.
    pub fn sweep(&self, ttl: Duration) {
        self.challenges
            .lock()
            .retain(|_, challenge| challenge.received_at.elapsed() <= ttl);
    }

    /// Start the periodic challenge sweep. Runs until [`DigestTransport::shutdown`].
    pub fn start_sweep(self: &Arc<Self>, interval: Duration, ttl: Duration) -> JoinHandle<()> {
        let transport = Arc::clone(self);
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => transport.sweep(ttl),
                }
            }
        })
    }

    /// Stop the challenge sweep.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

fn generate_cnonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::post;
    use axum::Router;
    use std::net::SocketAddr;

    const REALM: &str = "camera";
    const NONCE: &str = "abc123";

    #[derive(Clone, Default)]
    struct Seen {
        authorizations: Arc<Mutex<Vec<String>>>,
        bodies: Arc<Mutex<Vec<String>>>,
    }

    fn auth_params(header: &str) -> HashMap<String, String> {
        let params = header.strip_prefix("Digest ").unwrap();
        challenge::split_params(params)
            .into_iter()
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().trim_matches('"').to_string()))
            .collect()
    }

    fn valid(auth: &str, qop: &str) -> bool {
        let params = auth_params(auth);
        let challenge = Challenge {
            realm: REALM.into(),
            nonce: NONCE.into(),
            opaque: String::new(),
            algorithm: "MD5".into(),
            qop: qop.into(),
            received_at: std::time::Instant::now(),
        };
        let expected = challenge.response(
            "admin",
            "secret",
            "POST",
            &params["uri"],
            params.get("nc").map(String::as_str).unwrap_or(""),
            params.get("cnonce").map(String::as_str).unwrap_or(""),
        );
        params["response"] == expected
    }

    async fn protected(
        State((seen, qop)): State<(Seen, &'static str)>,
        headers: HeaderMap,
        body: String,
    ) -> AxumResponse {
        seen.bodies.lock().push(body);
        match headers.get(header::AUTHORIZATION) {
            Some(value) => {
                let auth = value.to_str().unwrap().to_string();
                seen.authorizations.lock().push(auth.clone());
                if valid(&auth, qop) {
                    (AxumStatus::OK, "ok").into_response()
                } else {
                    AxumStatus::UNAUTHORIZED.into_response()
                }
            }
            None => {
                let challenge = if qop.is_empty() {
                    format!(r#"Digest realm="{}", nonce="{}""#, REALM, NONCE)
                } else {
                    format!(r#"Digest realm="{}", qop="{}", nonce="{}""#, REALM, qop, NONCE)
                };
                (AxumStatus::UNAUTHORIZED, [(header::WWW_AUTHENTICATE, challenge)]).into_response()
            }
        }
    }

    async fn spawn_camera(qop: &'static str) -> (SocketAddr, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .route("/cgi-bin/cmd.cgi", post(protected))
            .route("/bare", post(|| async { AxumStatus::UNAUTHORIZED }))
            .with_state((seen.clone(), qop));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, seen)
    }

    fn post_request(transport: &DigestTransport, url: &str) -> Request {
        transport
            .client()
            .post(url)
            .body(r#"{"exec":"move 0 0 0"}"#)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_challenge_answered_with_qop() {
        let (addr, seen) = spawn_camera("auth").await;
        let transport = DigestTransport::new(Client::new(), "admin", "secret");
        let url = format!("http://{}/cgi-bin/cmd.cgi?port=socket", addr);

        let first = transport.execute(post_request(&transport, &url)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = transport.execute(post_request(&transport, &url)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        let auths = seen.authorizations.lock().clone();
        assert_eq!(auths.len(), 2);
        let a = auth_params(&auths[0]);
        let b = auth_params(&auths[1]);
        assert_eq!(a["uri"], "/cgi-bin/cmd.cgi?port=socket");
        assert_eq!(a["nc"], "00000001");
        assert_eq!(b["nc"], "00000002");
        assert_ne!(a["cnonce"], b["cnonce"]);

        // Body is replayed on the authenticated attempt
        let bodies = seen.bodies.lock().clone();
        assert!(bodies.iter().all(|b| b == r#"{"exec":"move 0 0 0"}"#));
        assert_eq!(transport.cached_challenges(), 1);
    }

    #[tokio::test]
    async fn test_challenge_without_qop_has_no_nc() {
        let (addr, seen) = spawn_camera("").await;
        let transport = DigestTransport::new(Client::new(), "admin", "secret");
        let url = format!("http://{}/cgi-bin/cmd.cgi?port=socket", addr);

        let response = transport.execute(post_request(&transport, &url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let auths = seen.authorizations.lock().clone();
        let params = auth_params(&auths[0]);
        assert!(!params.contains_key("nc"));
        assert!(!params.contains_key("cnonce"));
        assert_eq!(transport.nc.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_password_single_retry() {
        let (addr, seen) = spawn_camera("auth").await;
        let transport = DigestTransport::new(Client::new(), "admin", "wrong");
        let url = format!("http://{}/cgi-bin/cmd.cgi?port=socket", addr);

        let response = transport.execute(post_request(&transport, &url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(seen.bodies.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_401_without_challenge() {
        let (addr, _) = spawn_camera("auth").await;
        let transport = DigestTransport::new(Client::new(), "admin", "secret");
        let url = format!("http://{}/bare", addr);

        let result = transport.execute(post_request(&transport, &url)).await;
        assert!(matches!(result, Err(DigestError::MissingChallenge)));
    }

    #[tokio::test]
    async fn test_sweep_and_shutdown() {
        let (addr, _) = spawn_camera("auth").await;
        let transport = Arc::new(DigestTransport::new(Client::new(), "admin", "secret"));
        let url = format!("http://{}/cgi-bin/cmd.cgi?port=socket", addr);
        transport.execute(post_request(&transport, &url)).await.unwrap();
        assert_eq!(transport.cached_challenges(), 1);

        let handle = transport.start_sweep(Duration::from_millis(10), Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.cached_challenges(), 0);

        transport.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep did not stop")
            .unwrap();
    }
}
