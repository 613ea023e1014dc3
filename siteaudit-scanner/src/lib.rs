pub mod error;
pub mod links;
pub mod page;
pub mod pool;
pub mod render;

pub use error::ScanError;
pub use links::LinkVerifier;
pub use page::PageData;
pub use pool::{TaskResult, WorkPool};
pub use render::{HttpRenderer, PageRenderer};
