pub mod card;
pub mod card_base;
pub mod game;
pub mod offer;
pub mod offer_card;
pub mod offer_status;
pub mod publication;
pub mod publication_card_base;
pub mod publication_status;
pub mod refresh_token;
pub mod user;

pub use offer_status::OfferStatus;
pub use publication_status::PublicationStatus;
