pub mod card;
pub mod offer;
pub mod pagination;
pub mod user;

pub use card::{CardBaseSummary, CardResponse};
pub use offer::OfferResponse;
pub use pagination::{Paginated, PaginationQuery};
pub use user::UserResponse;
