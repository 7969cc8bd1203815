pub mod item_ctx;
pub mod paper_flow;

pub use item_ctx::ItemCtx;
pub use paper_flow::{ItemOutcome, PaperFlow, SkipReason};
