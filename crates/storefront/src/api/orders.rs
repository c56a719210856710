//! Order endpoints.

use reqwest::Method;
use tracing::instrument;

use loopstore_core::OrderId;

use super::client::ApiClient;
use super::types::{Listing, Order, OrderRequest, Page};
use super::ApiError;

impl ApiClient {
    /// Submit an order. Guest checkout is allowed; with a session the order
    /// is attached to the signed-in customer.
    ///
    /// Stock levels change server-side, so the catalog cache is dropped on
    /// success.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the order (e.g. insufficient
    /// stock) or the request fails.
    #[instrument(skip(self, order), fields(items = order.items.len(), total = %order.total_amount))]
    pub async fn create_order(&self, order: &OrderRequest) -> Result<Order, ApiError> {
        let created: Order = self
            .send_json(Method::POST, self.endpoint("orders/")?, order)
            .await?;
        self.invalidate_catalog();
        tracing::info!(order_id = %created.id, "Order created");
        Ok(created)
    }

    /// List the signed-in customer's orders.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session, or an error if the
    /// request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        let page: Page<Order> = self
            .get_json::<Listing<Order>>(self.endpoint("orders/")?)
            .await?
            .into();
        Ok(page.results)
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the order does not exist or is not
    /// visible to the session, or an error if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.get_json(self.endpoint(&format!("orders/{id}/"))?)
            .await
    }
}
