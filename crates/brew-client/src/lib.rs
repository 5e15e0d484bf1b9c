//! brew-client
//!
//! Typed API client for the order service, plus the client-side state a
//! kiosk needs: a [`StockCache`] with optimistic reservations and a [`Cart`].

mod cache;
mod cart;
mod error;
mod http;

pub use cache::{ReservationId, StockCache};
pub use cart::{Cart, CartKey, CartLine};
pub use error::ClientError;
pub use http::{decode_envelope, ApiClient, OrderQuery};
