//! Shared building blocks for the pressroom workspace: the error taxonomy,
//! the polite HTTP fetch client and URL helpers.

pub mod error;
pub mod fetch;
pub mod urlnorm;

pub use error::{PressroomError, Result};
pub use fetch::FetchClient;
pub use urlnorm::{category_from_url, normalize_url};
