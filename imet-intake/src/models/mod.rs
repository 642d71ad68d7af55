//! Data models for the intake service

pub mod device_info;
pub mod lookup;

pub use device_info::{LookupStatus, NormalizedDeviceInfo, RawProviderResponse};
pub use lookup::{
    BatchItemResult, BatchLookupRequest, LookupContext, LookupOutcome, LookupRequest,
    LookupSource, RecentLookup,
};
