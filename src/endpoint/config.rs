//! Serving endpoint configuration

/// Configuration for the model-serving endpoint.
#[derive(Debug, Clone, Default)]
pub struct ServingConfig {
    /// Base URL of the serving API, e.g.
    /// `https://workspace.example.net/serving-endpoints`
    pub base_url: Option<String>,
    /// Name of the serving endpoint (the `model` field of each request)
    pub endpoint: Option<String>,
    /// Personal access token, when one is configured directly
    pub token: Option<String>,
    /// OAuth client-credentials settings, used when no token is configured
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: Option<String>,
}

impl ServingConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SERVING_BASE_URL").ok(),
            endpoint: std::env::var("SERVING_ENDPOINT").ok(),
            token: std::env::var("SERVING_TOKEN")
                .or_else(|_| std::env::var("DATABRICKS_TOKEN"))
                .ok(),
            client_id: std::env::var("SERVING_CLIENT_ID").ok(),
            client_secret: std::env::var("SERVING_CLIENT_SECRET").ok(),
            token_url: std::env::var("SERVING_TOKEN_URL").ok(),
        }
    }

    /// Resolve the configured token strategy, preferring a direct token over
    /// an OAuth client-credentials exchange. None means every request must
    /// carry a forwarded access token.
    pub fn token_source(&self) -> Option<TokenSource> {
        if let Some(token) = &self.token {
            if !token.is_empty() {
                return Some(TokenSource::Static {
                    token: token.clone(),
                });
            }
        }

        match (&self.client_id, &self.client_secret, &self.token_url) {
            (Some(client_id), Some(client_secret), Some(token_url)) => {
                Some(TokenSource::OAuthClientCredentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    token_url: token_url.clone(),
                })
            }
            _ => None,
        }
    }
}

/// How the serving client obtains its bearer token.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// A fixed token from the environment
    Static { token: String },
    /// Exchange client credentials for a short-lived token
    OAuthClientCredentials {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
}
