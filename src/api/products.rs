//! Produce listings

use super::ApiClient;
use crate::error::ClientResult;
use crate::models::{NewProduct, Product};

const PRODUCTS_PATH: &str = "/api/products/";

impl ApiClient {
    /// Farmers get their own listings, buyers every available one
    pub async fn list_products(&self) -> ClientResult<Vec<Product>> {
        self.get(PRODUCTS_PATH).await
    }

    /// List new produce; the backend sets the farmer from the session
    pub async fn create_product(&self, product: &NewProduct) -> ClientResult<Product> {
        self.post(PRODUCTS_PATH, product).await
    }
}
