pub mod work_item_loader;

pub use work_item_loader::load_work_items;
