use crate::data_models::{
    AuthResponse, CreatedProduct, Credential, Credentials, NewProduct, Product, ProductId,
};
use crate::errors::ApiError;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote product endpoints. Every call is a single attempt.
#[async_trait]
pub trait ProductsApi: Send + Sync {
    async fn list_products(&self, credential: &Credential) -> Result<Vec<Product>, ApiError>;

    async fn add_product(
        &self,
        credential: &Credential,
        product: &NewProduct,
    ) -> Result<Option<CreatedProduct>, ApiError>;

    async fn delete_product(&self, credential: &Credential, id: ProductId) -> Result<(), ApiError>;
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;
}

#[async_trait]
impl<T: ProductsApi + ?Sized> ProductsApi for Arc<T> {
    async fn list_products(&self, credential: &Credential) -> Result<Vec<Product>, ApiError> {
        (**self).list_products(credential).await
    }

    async fn add_product(
        &self,
        credential: &Credential,
        product: &NewProduct,
    ) -> Result<Option<CreatedProduct>, ApiError> {
        (**self).add_product(credential, product).await
    }

    async fn delete_product(&self, credential: &Credential, id: ProductId) -> Result<(), ApiError> {
        (**self).delete_product(credential, id).await
    }
}

#[async_trait]
impl<T: AuthApi + ?Sized> AuthApi for Arc<T> {
    async fn register(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        (**self).register(credentials).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        (**self).login(credentials).await
    }
}
