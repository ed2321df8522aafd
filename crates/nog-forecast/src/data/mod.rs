//! Price history, macro data and the pipeline that turns them into features

pub mod macro_data;
pub mod pipeline;
pub mod prices;

pub use macro_data::{MacroObservation, MacroRecord, asof_backward, merge_macro_series};
pub use pipeline::{
    DataOutput, DataPipeline, DataRequest, NewsRefreshOutcome, NewsRefresher, PriceRefreshOutcome,
};
pub use prices::{PriceCache, PriceRecord};
