use crate::ScrapeError;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post(Vec<(String, String)>),
}

/// One page request as an adapter wants it sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub method: Method,
    pub cookie: Option<String>,
    /// Off unless an adapter asks for it.
    pub verify_tls: bool,
}

impl PageRequest {
    pub fn get<S: Into<String>>(url: S) -> PageRequest {
        PageRequest {
            url: url.into(),
            method: Method::Get,
            cookie: None,
            verify_tls: false,
        }
    }

    pub fn post<S: Into<String>>(url: S, form: &[(&str, &str)]) -> PageRequest {
        let form = form
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PageRequest {
            method: Method::Post(form),
            ..PageRequest::get(url)
        }
    }

    pub fn with_cookie<S: Into<String>>(mut self, cookie: S) -> PageRequest {
        self.cookie = Some(cookie.into());
        self
    }
}

#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    /// Returns the page body, or an empty string when the request failed for any reason.
    async fn fetch(&self, request: PageRequest) -> String;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct Fetcher {
    verifying: Client,
    lenient: Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Fetcher, ScrapeError> {
        Ok(Fetcher {
            verifying: Client::builder().build()?,
            lenient: Client::builder()
                .danger_accept_invalid_certs(true)
                .build()?,
            timeout: config.timeout,
        })
    }

    fn client(&self, verify_tls: bool) -> &Client {
        if verify_tls {
            &self.verifying
        } else {
            &self.lenient
        }
    }

    async fn send(&self, request: &PageRequest) -> Result<String, reqwest::Error> {
        let client = self.client(request.verify_tls);
        let builder = match &request.method {
            Method::Get => client.get(&request.url),
            Method::Post(form) => client.post(&request.url).form(form),
        };
        let builder = match &request.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        };

        builder
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait::async_trait]
impl Fetch for Fetcher {
    async fn fetch(&self, request: PageRequest) -> String {
        debug!("Visit {}", request.url);
        match self.send(&request).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Error fetching {}: {}", request.url, e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers the first connection with `response`, or never answers when it is `None`.
    async fn serve_once(response: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            match response {
                Some(response) => socket.write_all(response.as_bytes()).await.unwrap(),
                None => tokio::time::sleep(Duration::from_secs(60)).await,
            }
        });
        format!("http://{}/", addr)
    }

    fn fetcher(timeout: Duration) -> Fetcher {
        Fetcher::new(FetchConfig { timeout }).unwrap()
    }

    #[test]
    fn post_request_keeps_repeated_form_keys() {
        let form = [("DEPT", "CS"), ("DEPT", "ECE")];
        let request =
            PageRequest::post("https://example.edu/search", &form).with_cookie("jsenabled=1");

        assert_eq!(
            request.method,
            Method::Post(vec![
                ("DEPT".to_string(), "CS".to_string()),
                ("DEPT".to_string(), "ECE".to_string()),
            ])
        );
        assert_eq!(request.cookie.as_deref(), Some("jsenabled=1"));
        assert!(!request.verify_tls);
    }

    #[tokio::test]
    async fn successful_response_returns_the_body() {
        let url = serve_once(Some(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        ))
        .await;

        let html = fetcher(DEFAULT_TIMEOUT).fetch(PageRequest::get(url)).await;
        assert_eq!(html, "hello");
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_empty_page() {
        let html = fetcher(Duration::from_secs(2))
            .fetch(PageRequest::get("http://127.0.0.1:9/"))
            .await;
        assert_eq!(html, "");
    }

    #[tokio::test]
    async fn error_status_degrades_to_empty_page() {
        let url = serve_once(Some(concat!(
            "HTTP/1.1 500 Internal Server Error\r\n",
            "Content-Length: 4\r\nConnection: close\r\n\r\noops",
        )))
        .await;

        let html = fetcher(DEFAULT_TIMEOUT).fetch(PageRequest::get(url)).await;
        assert_eq!(html, "");
    }

    #[tokio::test]
    async fn timeout_degrades_to_empty_page() {
        let url = serve_once(None).await;

        let html = fetcher(Duration::from_millis(200))
            .fetch(PageRequest::get(url))
            .await;
        assert_eq!(html, "");
    }
}
