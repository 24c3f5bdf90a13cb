//! Progressive data loading for the asset-management client.
//!
//! Pages build a [`ProgressiveController`] around an [`AssetService`]. The
//! controller fetches each named stage only when the UI needs it, lets the
//! newest request for a stage win, debounces search input and derives the
//! visible rows from the loaded list.

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod notice;
pub mod request_gate;
pub mod service;
pub mod stage;
pub mod validation;

pub use controller::{
    ControllerEvent, ProgressiveController, TriggerMode, TriggerOutcome, STAGE_ENUMS, STAGE_LIST,
    STAGE_MODAL_DETAIL,
};
pub use debounce::DebouncedTrigger;
pub use error::LoadError;
pub use filter::{FilterCriteria, FilteredView, SortOrder};
pub use notice::{Notice, NoticeCategory};
pub use request_gate::{RequestGate, RequestHandle};
pub use service::{AssetService, HttpAssetService};
pub use stage::{LoadContext, StageLoader, StagePayload, StageRegistry, StageState};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
