//! HTTP client for the LaTeX-to-SVG renderer microservice (spec §6).

use serde::Serialize;

use tutor_domain::error::{Error, Result};

use crate::util::from_reqwest;

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    latex: &'a str,
    display: bool,
}

pub struct LatexClient {
    base_url: String,
    client: reqwest::Client,
}

impl LatexClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(from_reqwest)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// POST `/mathjax`, returning the raw `image/svg+xml` body.
    pub async fn render(&self, latex: &str, display: bool) -> Result<String> {
        let url = format!("{}/mathjax", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&RenderRequest { latex, display })
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(Error::Provider {
                provider: "latex".into(),
                message: format!("HTTP {} - {}", status.as_u16(), text),
            });
        }
        Ok(text)
    }

    /// GET `/health`.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await.map_err(from_reqwest)?;
        Ok(resp.status().is_success())
    }
}

/// Extract every `<path d="...">` attribute from a rendered SVG document, in
/// document order, for sampling into stroke polylines. A small hand-rolled
/// scan rather than a full XML parser: the renderer's output is
/// well-formed and we only need one attribute off one element type.
pub fn extract_path_data(svg: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = svg;
    while let Some(path_start) = rest.find("<path") {
        let tag_region = &rest[path_start..];
        let Some(tag_end) = tag_region.find('>') else {
            break;
        };
        let tag = &tag_region[..tag_end];
        if let Some(d_start) = tag.find("d=\"") {
            let after = &tag[d_start + 3..];
            if let Some(d_end) = after.find('"') {
                out.push(after[..d_end].to_string());
            }
        }
        rest = &tag_region[tag_end + 1..];
    }
    out
}
