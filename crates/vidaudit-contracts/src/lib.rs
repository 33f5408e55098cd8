pub mod analysis;
pub mod attachment;
pub mod checklist;
pub mod errors;
pub mod events;
pub mod view;
