//! Crawler module: listing pagination, detail fetching and record extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind a global concurrency limit
//! - Detail-link extraction from listing pages
//! - Per-field extraction strategies and the phone-reveal call
//! - The producer/worker-pool coordination of a run

mod coordinator;
mod extractor;
mod fetcher;
mod links;
mod phone;
mod queue;
mod stats;

pub use coordinator::{run_crawl, Coordinator};
pub use extractor::{first_match, DetailPage, RecordExtractor, Strategy};
pub use fetcher::{build_http_client, random_user_agent, FetchError, HttpMethod, PageFetcher, USER_AGENTS};
pub use links::LinkFetcher;
pub use phone::{build_payload, parse_response, PhoneIdentifiers, COUNTRY_PREFIX};
pub use queue::{work_queue, CrawlWorkItem, WorkReceiver, WorkSender};
pub use stats::{CrawlStats, CrawlSummary};
