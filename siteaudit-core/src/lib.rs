pub mod audit;
pub mod checks;
pub mod config;
pub mod crawl;
pub mod error;
pub mod events;
pub mod list;
pub mod report;
pub mod warning;

pub use audit::{AuditOptions, PageAuditor, PageResult};
pub use checks::Checks;
pub use config::AuditConfig;
pub use crawl::{CrawlRequest, CrawlState, Crawler};
pub use error::AuditError;
pub use events::{AuditEvent, EventBus, EventKind, Subscription};
pub use report::{CrawlReport, ReportFormat};
pub use warning::{Evidence, WarningMap, WarningType};
