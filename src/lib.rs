pub mod api;
pub mod auth;
pub mod configuration;
pub mod db;
pub mod entity;
pub mod jobs;
pub mod migration;
pub mod model;
pub mod notification;
pub mod openapi;
pub mod startup;
pub mod storage;
pub mod telemetry;
