pub mod cell;
pub mod curriculum;
pub mod dedup;
pub mod dom;
pub mod grid;
pub mod layout;
pub mod lecture;
pub mod rating;
pub mod report;
pub mod snapshot;
