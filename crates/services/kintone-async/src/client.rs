use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};

use crate::{config::Config, error::KintoneError, exchange::RequestSummary, middleware};

/// kintone REST client
///
/// The client is generic over a [`Config`] implementation that provides authentication
/// and API configuration. Every response goes through
/// [`middleware::on_rejected`], so a failed call surfaces as
/// [`KintoneError::Api`] with the message kintone sent back.
#[derive(Debug, Clone)]
pub struct Client<C: Config> {
    http: reqwest::Client,
    config: C,
}

impl Client<crate::config::KintoneConfig> {
    /// Creates a new client with default configuration
    ///
    /// Reads the base URL and credentials from the environment, see
    /// [`KintoneConfig::new`](crate::config::KintoneConfig::new).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(crate::config::KintoneConfig::new())
    }
}

impl<C: Config + Default> Default for Client<C> {
    fn default() -> Self {
        Self::with_config(C::default())
    }
}

impl<C: Config> Client<C> {
    /// Creates a new client with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the reqwest client cannot be built.
    #[must_use]
    pub fn with_config(config: C) -> Self {
        Self {
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(5))
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("reqwest client"),
            config,
        }
    }

    /// Replaces the HTTP client with a custom one
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Returns a reference to the client's configuration
    #[must_use]
    pub const fn config(&self) -> &C {
        &self.config
    }

    /// Starts a request to an API path with the configured auth headers
    ///
    /// # Errors
    ///
    /// Returns an error if the auth headers cannot be built.
    pub fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, KintoneError> {
        let headers = self.config.headers()?;
        Ok(self
            .http
            .request(method, self.config.url(path))
            .headers(headers))
    }

    /// Sends a request and classifies the outcome
    ///
    /// Successful responses are returned with their body unread.
    ///
    /// # Errors
    ///
    /// Returns [`KintoneError::Config`] if auth is not configured,
    /// [`KintoneError::Http`] if the transport fails, and
    /// [`KintoneError::Api`] if the status is 300 or above.
    pub async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, KintoneError> {
        // Validate auth before any request
        self.config.validate_auth()?;

        let request = builder.build()?;
        let summary = RequestSummary::from_request(&request);
        let result = self.http.execute(request).await;
        middleware::on_rejected(&summary, result).await
    }

    /// Sends a GET request with query parameters and decodes the JSON response
    ///
    /// # Errors
    ///
    /// See [`Client::send`] and [`middleware::decode_json`].
    pub async fn get<Q, O>(&self, path: &str, query: &Q) -> Result<O, KintoneError>
    where
        Q: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        let builder = self.request(Method::GET, path)?.query(query);
        middleware::decode_json(self.send(builder).await?).await
    }

    /// Sends a POST request with a JSON body and decodes the JSON response
    ///
    /// # Errors
    ///
    /// See [`Client::send`] and [`middleware::decode_json`].
    pub async fn post<I, O>(&self, path: &str, body: &I) -> Result<O, KintoneError>
    where
        I: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    /// Sends a PUT request with a JSON body and decodes the JSON response
    ///
    /// # Errors
    ///
    /// See [`Client::send`] and [`middleware::decode_json`].
    pub async fn put<I, O>(&self, path: &str, body: &I) -> Result<O, KintoneError>
    where
        I: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body).await
    }

    /// Sends a DELETE request with a JSON body and decodes the JSON response
    ///
    /// kintone takes the ids to delete in the request body.
    ///
    /// # Errors
    ///
    /// See [`Client::send`] and [`middleware::decode_json`].
    pub async fn delete<I, O>(&self, path: &str, body: &I) -> Result<O, KintoneError>
    where
        I: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        self.send_json(Method::DELETE, path, body).await
    }

    async fn send_json<I, O>(
        &self,
        method: Method,
        path: &str,
        body: &I,
    ) -> Result<O, KintoneError>
    where
        I: Serialize + Sync + ?Sized,
        O: DeserializeOwned,
    {
        let builder = self.request(method, path)?.json(body);
        middleware::decode_json(self.send(builder).await?).await
    }
}
