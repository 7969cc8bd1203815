pub mod loaders;
pub mod paper;
pub mod taxonomy;

pub use loaders::load_work_items;
pub use paper::{ClassificationResult, PaperFields, WorkItem};
pub use taxonomy::{Label, Taxonomy};
