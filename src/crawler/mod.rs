//! Crawler module
//!
//! The pagination crawler walks one site's search results; the coordinator
//! runs all enabled sites and feeds what they find through the dedup engine.

mod coordinator;
mod pagination;

pub use coordinator::ScrapeCoordinator;
pub use pagination::PaginationCrawler;
