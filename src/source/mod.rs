//! Data source abstraction layer.
//!
//! This module defines the [`DataSource`] trait and the common [`Item`]
//! type.  Concrete source implementations live in sub-modules (currently
//! only [`reddit`]).
//!
//! ## For contributors — adding a new source
//!
//! 1. Create a new file in this directory (e.g. `lemmy.rs`).
//! 2. Define a struct (e.g. `LemmySource`) and implement [`DataSource`] for it.
//! 3. Add `mod lemmy;` below and re-export your struct in the `pub use` block.
//! 4. Construct an instance in `main.rs` instead of the Reddit source.
//!
//! The poll cycle, de-duplication, and notification path are all
//! source-agnostic.

mod item;
mod reddit;

pub use item::Item;
pub use reddit::RedditSource;

#[cfg(test)]
pub(crate) use item::tests::make_item;

use anyhow::Result;

/// Trait that every data source must implement.
///
/// The poll cycle calls [`fetch()`](DataSource::fetch) once per channel per
/// cycle on a blocking worker thread, so implementations must be [`Send`]
/// and [`Sync`].
///
/// ## Implementing a new source
///
/// ```ignore
/// pub struct MySource { /* credentials, client */ }
///
/// impl DataSource for MySource {
///     fn name(&self) -> &str { "my-source" }
///
///     fn fetch(&self, channel: &str, limit: usize) -> Result<Vec<Item>> {
///         // Perform HTTP / IO, then convert into Item values.
///         todo!()
///     }
/// }
/// ```
pub trait DataSource: Send + Sync {
    /// Human-readable label used in log lines.
    fn name(&self) -> &str;

    /// Fetch up to `limit` of the most recent items posted to `channel`,
    /// newest first.
    ///
    /// Any failure (network, authentication, unknown channel) is reported
    /// as an error; the poll cycle skips the channel and carries on.
    fn fetch(&self, channel: &str, limit: usize) -> Result<Vec<Item>>;
}
