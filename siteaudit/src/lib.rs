// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{load_urls_from_file, load_urls_from_source, parse_url_line};
