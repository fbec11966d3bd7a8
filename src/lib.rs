//! # minvar
//!
//! $$
//! \min_{\mathbf{w}} \ \mathbf{w}^\top \Sigma \mathbf{w} \quad \text{s.t.} \quad \mathbf{w}^\top \mathbf{1} = 1
//! $$
//!
//! Global minimum-variance portfolios from historical crypto prices.
//!
//! ## Modules
//!
//! | Module          | Description                                                                  |
//! |-----------------|------------------------------------------------------------------------------|
//! | [`catalog`]     | Snapshot of known assets with atomic wholesale refresh.                      |
//! | [`resolver`]    | Maps user tickers to canonical asset ids.                                    |
//! | [`source`]      | Upstream market-data trait and the CoinGecko HTTP client.                    |
//! | [`fetcher`]     | Cache-first price acquisition with exponential backoff on rate limits.       |
//! | [`returns`]     | Tail alignment of price series and log-return matrix construction.           |
//! | [`linalg`]      | Column means, broadcasting, products and Gauss-Jordan inversion.             |
//! | [`optimizer`]   | Sample covariance and the closed-form minimum-variance weights.              |
//! | [`pipeline`]    | Resolve, fetch, transform and optimize in one call.                          |
//! | [`config`]      | Defaults and `MINVAR_*` environment overrides.                               |
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let config = Config::from_env()?;
//! let source = Arc::new(CoinGeckoClient::new(&config.api_base, None, config.http_timeout, 4)?);
//! let pipeline = Pipeline::from_config(&config, source.clone());
//! pipeline.catalog().refresh(source.as_ref()).await?;
//! let allocation = pipeline.run(&["BTC", "ETH"], Some(90)).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod linalg;
pub mod optimizer;
pub mod pipeline;
pub mod resolver;
pub mod returns;
pub mod source;

pub use catalog::Asset;
pub use catalog::Catalog;
pub use catalog::CatalogStore;
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use fetcher::PriceCache;
pub use fetcher::PriceFetcher;
pub use fetcher::PriceSeries;
pub use fetcher::RetryPolicy;
pub use optimizer::optimize;
pub use pipeline::Allocation;
pub use pipeline::Pipeline;
pub use resolver::resolve;
pub use returns::compute_returns;
pub use returns::ReturnMatrix;
pub use source::CoinGeckoClient;
pub use source::PriceSource;
pub use source::SourceError;
