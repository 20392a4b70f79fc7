//! Seatsurf Core - session, credential and cache management for the
//! Seatsurfing desk booking API
//!
//! The tool server composes these pieces: credentials are resolved per
//! login attempt, a single [`SessionManager`] keeps the bearer tokens fresh,
//! and the [`CacheStore`] mirrors locations and spaces on disk.

pub mod api;
pub mod cache;
pub mod credentials;
pub mod datetime;
pub mod error;
pub mod gateway;
pub mod paths;
pub mod session;

pub use api::{AvailabilityPartition, Booking, Location, NewBooking, Space, SpaceAvailability, User};
pub use cache::{CacheStore, CacheSummary, CachedEntity, SpaceCache};
pub use credentials::{CredentialField, CredentialOverrides, CredentialResolver, CredentialSet};
pub use error::{Error, Result};
pub use gateway::{Gateway, Response};
pub use paths::Paths;
pub use session::{SessionManager, SessionStatus};
