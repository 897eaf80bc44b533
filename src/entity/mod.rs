pub mod apartment;
pub mod base_time;
pub mod content_view;
pub mod issue;
pub mod profile;
pub mod report;
pub mod user;
