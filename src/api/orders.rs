//! Orders placed by buyers against listed produce

use super::ApiClient;
use crate::error::ClientResult;
use crate::models::{NewOrder, Order, OrderStatus, OrderStatusUpdate};

const ORDERS_PATH: &str = "/api/orders/";

fn order_path(id: i64) -> String {
    format!("{}{}/", ORDERS_PATH, id)
}

impl ApiClient {
    /// Buyers see their own orders, farmers the orders for their produce
    pub async fn list_orders(&self) -> ClientResult<Vec<Order>> {
        self.get(ORDERS_PATH).await
    }

    pub async fn get_order(&self, id: i64) -> ClientResult<Order> {
        self.get(&order_path(id)).await
    }

    pub async fn place_order(&self, order: &NewOrder) -> ClientResult<Order> {
        self.post(ORDERS_PATH, order).await
    }

    /// Move an order along its lifecycle (farmer side)
    pub async fn update_order_status(&self, id: i64, status: OrderStatus) -> ClientResult<Order> {
        tracing::info!(order_id = id, status = status.as_str(), "Updating order status");
        self.patch(&order_path(id), &OrderStatusUpdate { status }).await
    }
}
