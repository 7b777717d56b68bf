//! Access to the remote places service.
//!
//! [`PlacesUpstream`] is the capability the engine is written against;
//! [`LocationClient`] is the HTTP implementation used in production.

pub mod client;
pub mod error;
mod retry;
pub mod types;
mod upstream;

pub use client::{ClientSettings, LocationClient};
pub use error::{UpstreamError, UpstreamErrorKind};
pub use types::{NearbyQuery, RawPage, SearchCircle, TextQuery};
pub use upstream::PlacesUpstream;
