//! Direct-message wire payloads exchanged with buyers.
//!
//! These mirror the JSON shapes marketplace clients already understand:
//! an order request is `{"id", "type": 10, "items": [...]}` and a status
//! update is `{"id", "type": 2, "paid", "shipped", "message"}`.

use serde::{Deserialize, Serialize};

use crate::{OrderId, TxId};

/// Message type tag for a new order request.
pub const MESSAGE_TYPE_ORDER_REQUEST: u8 = 10;
/// Message type tag for an order status update.
pub const MESSAGE_TYPE_STATUS_UPDATE: u8 = 2;

/// One purchased item inside an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Order-creation message sent to an auction winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: OrderId,
    #[serde(rename = "type")]
    pub message_type: u8,
    pub items: Vec<RequestedItem>,
}

impl OrderRequest {
    /// An order for a single unit of one product.
    #[must_use]
    pub fn single_item(order_id: OrderId, product_id: String) -> Self {
        Self {
            id: order_id,
            message_type: MESSAGE_TYPE_ORDER_REQUEST,
            items: vec![RequestedItem {
                product_id,
                quantity: 1,
            }],
        }
    }
}

/// Payment status update sent to a buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub id: OrderId,
    #[serde(rename = "type")]
    pub message_type: u8,
    pub paid: bool,
    pub shipped: bool,
    pub message: String,
}

impl OrderStatusUpdate {
    #[must_use]
    pub fn payment_confirmed(order_id: OrderId, txid: &TxId) -> Self {
        Self {
            id: order_id,
            message_type: MESSAGE_TYPE_STATUS_UPDATE,
            paid: true,
            shipped: false,
            message: format!("Payment confirmed. TxID: {txid}"),
        }
    }

    #[must_use]
    pub fn awaiting_confirmation(order_id: OrderId, txid: &TxId) -> Self {
        Self {
            id: order_id,
            message_type: MESSAGE_TYPE_STATUS_UPDATE,
            paid: false,
            shipped: false,
            message: format!("Found transaction. Waiting for confirmation. TxID: {txid}"),
        }
    }

    #[must_use]
    pub fn expired(order_id: OrderId) -> Self {
        Self {
            id: order_id,
            message_type: MESSAGE_TYPE_STATUS_UPDATE,
            paid: false,
            shipped: false,
            message: "Order expired.".to_string(),
        }
    }
}
