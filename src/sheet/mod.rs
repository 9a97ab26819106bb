mod csv_store;
mod layout;
mod row;
mod store;
mod xlsx_store;

pub use row::{ContactRow, RowStatus};
pub use store::{FileStore, Sheet, SheetStore};
