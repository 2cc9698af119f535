mod autosave;
mod deriver;
pub mod editor;
mod export;
mod planner;
mod service;
mod store;
mod types;
mod waypoint;

pub use autosave::*;
pub use deriver::*;
pub use export::*;
pub use planner::*;
pub use service::*;
pub use store::*;
pub use types::*;
pub use waypoint::*;

cfg_if::cfg_if! {
    if #[cfg(feature = "full")] {
        mod repository;

        pub use repository::*;
    }
}

pub(crate) fn new_id() -> String {
    ulid::Ulid::new().to_string()
}
