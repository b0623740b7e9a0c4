mod http_api;
mod traits;

pub use http_api::HttpApi;
pub use traits::{AuthApi, ProductsApi};
