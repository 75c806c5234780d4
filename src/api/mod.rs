//! Portal client boundary and error taxonomy.
//!
//! `PortalClient` abstracts the three operations the session subsystem
//! needs (login, probe, grade fetch); `EdupageClient` implements them
//! over reqwest. The error enums here encode which failures propagate
//! (login rejections) and which only steer fallback (probe results).

pub mod client;
pub mod error;

pub use client::{EdupageClient, PortalClient, PortalHandle, SessionAttrs};
pub use error::{ApiError, LoginError, ProbeError, ResolveError};
