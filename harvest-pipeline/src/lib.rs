//! Collection pipeline: walks platform pages, filters, caps and writes.
//!
//! Every collector is assembled from the same pieces. A [`PageSource`]
//! wraps one client call, the [`Paginator`] turns it into a stream that is
//! paced by a shared [`RateLimiter`] and cut at the date window, and
//! [`collect_retained`] applies the keyword or channel filter until the
//! retained cap is met. The records are then written by
//! [`write_records`] as JSON and CSV with a summary next to them.
//!
//! ```no_run
//! use harvest_config::HarvestConfigLoader;
//! use harvest_pipeline::{RunContext, run_all};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarvestConfigLoader::new().with_optional_file("harvest.yaml").load()?;
//! let ctx = RunContext::from_config(&config)?;
//! let summary = run_all(&config, &ctx).await?;
//! println!("{} records", summary.total_records);
//! # Ok(())
//! # }
//! ```
pub mod context;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod plan;
pub mod rate;
pub mod reddit;
pub mod run;
pub mod summary;
pub mod telegram;
pub mod twitter;
pub mod writer;
pub mod youtube;

pub use context::RunContext;
pub use error::CollectError;
pub use filter::{AllowList, ItemFilter, KeywordFilter, Verdict};
pub use pagination::{PageLimits, PageSource, Paginator, Timestamped, collect_retained};
pub use plan::{PlatformPlan, build_plan, render_plan, write_plan};
pub use rate::RateLimiter;
pub use run::{run_all, run_platform};
pub use summary::{CollectionSummary, PlatformRun, RunStatus, Summary};
pub use writer::{OutputPaths, write_records};
