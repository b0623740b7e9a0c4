use crate::api::traits::{AuthApi, ProductsApi};
use crate::configuration::ApiSettings;
use crate::data_models::{
    AddProductResponse, AuthResponse, CreatedProduct, Credential, Credentials, ErrorBody,
    NewProduct, Product, ProductId, ProductsResponse,
};
use crate::errors::ApiError;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("price-tracker/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP client for the tracking service rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: Url,
    client: Client,
}

impl HttpApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut client = Client::builder()
            .redirect(Policy::limited(10))
            .user_agent(USER_AGENT);
        if let Some(timeout) = settings.timeout {
            client = client.timeout(timeout);
        }
        Ok(Self {
            base_url: with_trailing_slash(settings.base_url.clone()),
            client: client.build()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, builder: RequestBuilder, credential: &Credential) -> RequestBuilder {
        builder.bearer_auth(credential.expose())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response received");
        if status.is_success() {
            return Ok(response);
        }
        Err(remote_error(response).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn remote_error(response: Response) -> ApiError {
    let status_code = response.status().as_u16();
    let message = match response.text().await {
        Ok(text) => serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.error),
        Err(err) => {
            warn!(status_code, "failed to read error body: {err}");
            None
        }
    };
    ApiError::Remote {
        status_code,
        message,
    }
}

#[async_trait]
impl ProductsApi for HttpApi {
    async fn list_products(&self, credential: &Credential) -> Result<Vec<Product>, ApiError> {
        let request = self.authorized(self.client.get(self.endpoint("products")?), credential);
        let body: ProductsResponse = self.send_json(request).await?;
        Ok(body.products)
    }

    async fn add_product(
        &self,
        credential: &Credential,
        product: &NewProduct,
    ) -> Result<Option<CreatedProduct>, ApiError> {
        let request = self
            .authorized(self.client.post(self.endpoint("products")?), credential)
            .json(product);
        let text = self.send(request).await?.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<AddProductResponse>(&text) {
            Ok(body) => Ok(body.product),
            Err(err) => {
                debug!("add acknowledged without a product body: {err}");
                Ok(None)
            }
        }
    }

    async fn delete_product(&self, credential: &Credential, id: ProductId) -> Result<(), ApiError> {
        let path = format!("products/{id}");
        let request = self.authorized(self.client.delete(self.endpoint(&path)?), credential);
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthApi for HttpApi {
    async fn register(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let request = self
            .client
            .post(self.endpoint("auth/register")?)
            .json(credentials);
        self.send_json(request).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let request = self.client.post(self.endpoint("auth/login")?).json(credentials);
        self.send_json(request).await
    }
}
