//! IDS document download from the BIM portal.

/// Portal endpoint serving the IDS document of a project.
#[must_use]
pub fn ids_url(host: &str, project_guid: &str) -> String {
    format!(
        "{}/aia/api/v1/public/aiaProject/{project_guid}/IDS",
        host.trim_end_matches('/')
    )
}

pub struct PortalClient {
    host: String,
    bearer: Option<String>,
    http: reqwest::Client,
}

impl PortalClient {
    #[must_use]
    pub fn new(host: &str, bearer: Option<String>) -> Self {
        Self {
            host: host.to_string(),
            bearer,
            http: reqwest::Client::new(),
        }
    }

    /// Fetches the IDS text of `project_guid`.
    ///
    /// Any failure (transport error, status >= 300, unreadable body) is
    /// logged and yields `None`, which callers treat as "no specifications".
    pub async fn fetch_ids(&self, project_guid: &str) -> Option<String> {
        let url = ids_url(&self.host, project_guid);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(error) => {
                tracing::warn!(%url, %error, "IDS request failed");
                return None;
            }
        };

        let status = resp.status();
        if status.as_u16() >= 300 {
            tracing::warn!(%url, %status, "IDS request rejected");
            return None;
        }

        match resp.text().await {
            Ok(text) => {
                tracing::info!(%url, bytes = text.len(), "Fetched IDS document");
                Some(text)
            }
            Err(error) => {
                tracing::warn!(%url, %error, "IDS response unreadable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_project_ids_url() {
        assert_eq!(
            ids_url("https://via.bund.de/bim/", "abc-123"),
            "https://via.bund.de/bim/aia/api/v1/public/aiaProject/abc-123/IDS"
        );
    }

    #[tokio::test]
    async fn unreachable_portal_yields_none() {
        let client = PortalClient::new("http://127.0.0.1:9", None);
        assert_eq!(client.fetch_ids("abc").await, None);
    }
}
