//! Thumbnail fallback for articles whose feed entry carries no image.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::html::extract_meta_image;
use super::http::{build_client, validate_url};
use super::ImageFetcher;
use crate::config::ImagesConfig;
use crate::{NewswireError, Result};

/// Maximum article page size read while looking for a thumbnail (2MB).
const MAX_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// Maximum redirects followed for article pages.
const MAX_REDIRECTS: usize = 5;

/// Scrapes an article page for its advertised thumbnail.
pub struct HtmlImageFetcher {
    client: Client,
    timeout: Duration,
}

impl HtmlImageFetcher {
    /// Create a new fetcher from configuration.
    pub fn new(config: &ImagesConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = build_client(timeout, timeout, MAX_REDIRECTS)?;
        Ok(Self { client, timeout })
    }

    async fn scrape(&self, url: &str) -> Result<String> {
        validate_url(url)?;

        let (page_url, html) = self.read_page(url).await?;
        let image = extract_meta_image(&html)
            .ok_or_else(|| NewswireError::NotFound("thumbnail".to_string()))?;
        Ok(resolve_image_url(&page_url, &image))
    }

    /// Fetch at most `MAX_PAGE_SIZE` bytes of a page.
    ///
    /// Pages announcing a larger body are rejected without reading it. The
    /// meta tags live in the head, so a truncated body is still usable.
    async fn read_page(&self, url: &str) -> Result<(url::Url, String)> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NewswireError::Fetch(format!("failed to fetch page: {}", e)))?;

        if !response.status().is_success() {
            return Err(NewswireError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_PAGE_SIZE as u64 {
                return Err(NewswireError::Fetch(format!(
                    "page too large: {} bytes (max {} bytes)",
                    content_length, MAX_PAGE_SIZE
                )));
            }
        }

        let page_url = response.url().clone();
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| NewswireError::Fetch(format!("failed to read page: {}", e)))?
        {
            let remaining = MAX_PAGE_SIZE - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            if body.len() >= MAX_PAGE_SIZE {
                break;
            }
        }

        Ok((page_url, String::from_utf8_lossy(&body).into_owned()))
    }
}

#[async_trait]
impl ImageFetcher for HtmlImageFetcher {
    async fn fetch_image(&self, url: &str) -> String {
        match tokio::time::timeout(self.timeout, self.scrape(url)).await {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => {
                debug!("No thumbnail for {}: {}", url, e);
                String::new()
            }
            Err(_) => {
                debug!("Thumbnail lookup for {} timed out", url);
                String::new()
            }
        }
    }
}

/// Resolve a possibly relative image reference against the page URL.
fn resolve_image_url(page_url: &url::Url, image: &str) -> String {
    page_url
        .join(image)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| image.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_image_url() {
        let page = url::Url::parse("https://news.example.com/world/story.html").unwrap();
        assert_eq!(
            resolve_image_url(&page, "/img/lead.jpg"),
            "https://news.example.com/img/lead.jpg"
        );
        assert_eq!(
            resolve_image_url(&page, "thumb.png"),
            "https://news.example.com/world/thumb.png"
        );
        assert_eq!(
            resolve_image_url(&page, "https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
    }

    /// Serve one raw HTTP response on a local port.
    async fn serve_once(head: String, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/story", addr)
    }

    fn local_fetcher() -> HtmlImageFetcher {
        HtmlImageFetcher {
            client: Client::builder().no_proxy().build().unwrap(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_read_page_caps_unannounced_body() {
        let mut body = br#"<meta property="og:image" content="/lead.jpg">"#.to_vec();
        body.resize(MAX_PAGE_SIZE + 512 * 1024, b' ');
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n";
        let url = serve_once(head.to_string(), body).await;

        let (page_url, html) = local_fetcher().read_page(&url).await.unwrap();
        assert_eq!(html.len(), MAX_PAGE_SIZE);
        assert_eq!(extract_meta_image(&html).as_deref(), Some("/lead.jpg"));
        assert_eq!(page_url.as_str(), url);
    }

    #[tokio::test]
    async fn test_read_page_rejects_announced_oversize() {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            MAX_PAGE_SIZE + 1
        );
        let url = serve_once(head, Vec::new()).await;

        let result = local_fetcher().read_page(&url).await;
        assert!(matches!(result, Err(NewswireError::Fetch(msg)) if msg.contains("too large")));
    }

    #[tokio::test]
    async fn test_fetch_image_never_fails() {
        let fetcher = HtmlImageFetcher::new(&ImagesConfig::default()).unwrap();
        assert_eq!(fetcher.fetch_image("not a url").await, "");
        assert_eq!(fetcher.fetch_image("http://127.0.0.1/story").await, "");
        assert_eq!(fetcher.fetch_image("file:///etc/passwd").await, "");
    }
}
