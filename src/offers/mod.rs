//! Offer catalog and user grants

mod cache;
mod models;
mod repository;

pub use cache::load_active_offers_cached;
pub use models::{Offer, UserOffer};
pub use repository::{OfferRepository, UserOfferRepository};
