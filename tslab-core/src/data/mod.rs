//! Canonical-table ingestion, cleaning, storage, and grouping.

pub mod clean;
pub mod frame;
pub mod grouping;
pub mod inspect;
pub mod provider;
pub mod schema;
pub mod store;
pub mod twelvedata;
pub mod update;

pub use clean::Cleaner;
pub use frame::{bars_to_dataframe, dataframe_to_bars, FrameError};
pub use grouping::{ticker_groups, ticker_row_indices};
pub use inspect::{inspect_interval, IntervalReport};
pub use provider::{BarProvider, ProviderBar, ProviderError, SilentProgress, StdoutProgress, UpdateProgress};
pub use schema::{BarSchema, SchemaError};
pub use store::{StoreError, StoreMeta, TableStore};
pub use twelvedata::TwelveDataProvider;
pub use update::{clean_all, PipelineError, UpdateSummary, Updater};
