//! Diagram compilation via a Kroki server.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use ureq::Agent;

use crate::engine::{DiagramEngine, DiagramError, DiagramErrorKind, DiagramRequest};

/// Default HTTP timeout for Kroki requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create HTTP agent with the specified timeout.
///
/// HTTP error statuses are returned as responses so their bodies can be
/// reported.
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Engine that POSTs diagram source to `{server}/{language}/svg`.
///
/// Requests are blocking and run on tokio's blocking pool.
#[derive(Clone, Debug)]
pub struct KrokiEngine {
    agent: Agent,
    server_url: String,
}

impl KrokiEngine {
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_owned();
        Self {
            agent: create_agent(timeout),
            server_url,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, request: &DiagramRequest) -> String {
        format!("{}/{}/svg", self.server_url, request.language.name())
    }
}

impl DiagramEngine for KrokiEngine {
    fn name(&self) -> &str {
        "kroki"
    }

    fn compile<'a>(&'a self, request: &'a DiagramRequest) -> BoxFuture<'a, Result<String, DiagramError>> {
        let agent = self.agent.clone();
        let url = self.endpoint(request);
        let owned = request.clone();
        async move {
            tokio::task::spawn_blocking(move || send_diagram_request(&agent, &url, &owned))
                .await
                .map_err(|e| DiagramError::new(request.index, DiagramErrorKind::Engine(e.to_string())))?
        }
        .boxed()
    }
}

/// Send a diagram to Kroki and return the SVG body.
fn send_diagram_request(agent: &Agent, url: &str, request: &DiagramRequest) -> Result<String, DiagramError> {
    let error = |kind| DiagramError::new(request.index, kind);

    let response = agent
        .post(url)
        .header("Content-Type", "text/plain")
        .send(request.source.as_bytes())
        .map_err(|e| error(DiagramErrorKind::Network(e.to_string())))?;

    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let body = body
            .read_to_string()
            .unwrap_or_else(|_| String::from("(unable to read error body)"));
        return Err(error(DiagramErrorKind::Http {
            status,
            body: body.trim().to_owned(),
        }));
    }

    let bytes = body
        .read_to_vec()
        .map_err(|e| error(DiagramErrorKind::Network(e.to_string())))?;
    String::from_utf8(bytes).map_err(|_| error(DiagramErrorKind::InvalidUtf8))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::language::DiagramLanguage;

    #[test]
    fn test_server_url_trailing_slash() {
        let engine = KrokiEngine::new("https://kroki.io/", DEFAULT_TIMEOUT);
        assert_eq!(engine.server_url(), "https://kroki.io");
    }

    #[test]
    fn test_endpoint_per_language() {
        let engine = KrokiEngine::new("http://localhost:8000", DEFAULT_TIMEOUT);
        let request = DiagramRequest::new(0, DiagramLanguage::GraphViz, "digraph { a -> b }");
        assert_eq!(engine.endpoint(&request), "http://localhost:8000/graphviz/svg");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let engine = KrokiEngine::new("http://127.0.0.1:9", Duration::from_secs(2));
        let request = DiagramRequest::new(3, DiagramLanguage::Mermaid, "graph TD; A-->B");

        let error = engine.compile(&request).await.unwrap_err();

        assert_eq!(error.index, 3);
        assert!(matches!(error.kind, DiagramErrorKind::Network(_)), "{error}");
    }
}
