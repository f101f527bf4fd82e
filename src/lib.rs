pub mod cli;
pub mod controller;
pub mod domain;
pub mod field;
pub mod inputter;
pub mod list;
pub mod loader;
pub mod model;
pub mod pagination;
pub mod record;
pub mod ui;

pub use field::{Field, Filter};
pub use list::{FilterableList, ListView, RowRenderer, SortOrder, ViewState};
pub use pagination::PageSlot;
pub use record::{KeyPath, Record, Value};
