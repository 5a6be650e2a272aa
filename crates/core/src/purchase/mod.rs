//! Purchase pipeline: product → price → checkout session → confirmation →
//! share link.

mod pipeline;
mod types;

pub use pipeline::PurchasePipeline;
pub use types::*;
