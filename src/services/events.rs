//! Rental change feed
//!
//! Every rental change is broadcast in-process. Subscribers receive the
//! changes of the rentals they take part in, for as long as they hold the
//! stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Rental, RentalStatus};

const DEFAULT_CAPACITY: usize = 256;

/// A rental changed
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RentalEvent {
    pub rental_id: Uuid,
    pub item_id: Uuid,
    pub renter_id: Uuid,
    pub lender_id: Uuid,
    pub status: RentalStatus,
    pub at: DateTime<Utc>,
}

impl RentalEvent {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.renter_id == user_id || self.lender_id == user_id
    }
}

impl From<&Rental> for RentalEvent {
    fn from(rental: &Rental) -> Self {
        Self {
            rental_id: rental.rental_id,
            item_id: rental.item_id,
            renter_id: rental.renter_id,
            lender_id: rental.lender_id,
            status: rental.status,
            at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct RentalEvents {
    sender: broadcast::Sender<RentalEvent>,
}

impl Default for RentalEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RentalEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, rental: &Rental) {
        // No subscribers is fine
        let _ = self.sender.send(RentalEvent::from(rental));
    }

    /// Changes of the rentals `user_id` takes part in. Dropping the stream
    /// unsubscribes.
    pub fn subscribe(&self, user_id: Uuid) -> impl Stream<Item = RentalEvent> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(move |event| match event {
            Ok(event) if event.involves(user_id) => Some(event),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Rental feed subscriber for {} lagged by {} events", user_id, skipped);
                None
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
