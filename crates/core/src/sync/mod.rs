//! Inventory synchronization.
//!
//! Reconciles the remote file listing against the catalog: new files are
//! inserted, seen files refreshed, aged-out files deleted remotely and
//! vanished files expired. A pass either commits all of its catalog changes
//! or none.

mod synchronizer;
mod thumbnails;
mod types;

pub use synchronizer::InventorySynchronizer;
pub use thumbnails::{ThumbnailCache, ThumbnailError};
pub use types::*;
