pub mod catalog;
pub mod error_handler;
pub mod mock;
pub mod normalizer;
pub mod price_scraper;
pub mod service;

pub use catalog::{Brand, ProductCategory, SiteCatalog};
pub use error_handler::{ErrorDecision, ScrapingErrorHandler};
pub use mock::{MockFailure, MockScrapingService};
pub use normalizer::{NormalizationError, ResultNormalizer};
pub use price_scraper::PriceScraper;
pub use service::{HttpScrapingService, ScrapeError, ScrapingService};
