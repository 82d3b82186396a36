//! Domain models for Landable.
//!
//! # Core Concepts
//!
//! - [`Template`]: the mutable working copy authors edit.
//! - [`TemplateRevision`]: an immutable snapshot written on every publish.
//!   Exactly one revision per published template carries `is_published`.
//! - [`Author`] and [`AccessToken`]: the principal acting on a request and
//!   the credential it presents.
//! - [`Theme`]: read-only catalog entry loaded from configuration.

mod author;
mod revision;
mod template;
mod theme;

pub use author::*;
pub use revision::*;
pub use template::*;
pub use theme::*;
