use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::discount::DiscountId;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    DiscountCreated(DiscountId),
    DiscountUpdated(DiscountId),
    DiscountDeleted(DiscountId),
    DiscountStatusChanged {
        discount_id: DiscountId,
        old_status: String,
        new_status: String,
    },
    DiscountRedeemed {
        discount_id: DiscountId,
        uses: u32,
    },
}

/// Drains the event channel. Today events only feed the structured log;
/// downstream consumers (webhooks, analytics) would hang off this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::DiscountCreated(id) => info!(discount_id = id, "Discount created"),
            Event::DiscountUpdated(id) => info!(discount_id = id, "Discount updated"),
            Event::DiscountDeleted(id) => info!(discount_id = id, "Discount deleted"),
            Event::DiscountStatusChanged {
                discount_id,
                old_status,
                new_status,
            } => info!(
                discount_id,
                old_status, new_status, "Discount status changed"
            ),
            Event::DiscountRedeemed { discount_id, uses } => {
                info!(discount_id, uses, "Discount redeemed")
            }
        }
        debug!(?event, "Event processed");
    }
    info!("Event processor stopped");
}
