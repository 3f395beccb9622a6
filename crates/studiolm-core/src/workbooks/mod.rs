//! Document/resource store collaborator
//!
//! The application owns workbook persistence; the core consumes it through
//! the `WorkbookStore` trait. `MemoryWorkbookStore` backs tests and demos.

mod memory;
mod traits;

pub use memory::MemoryWorkbookStore;
pub use traits::{Workbook, WorkbookStore, WorkbookStoreError, WorkbookStoreResult};
