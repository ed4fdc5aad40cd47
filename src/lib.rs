pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod content;
pub mod discussion;
pub mod flipbook;
pub mod logging;
pub mod measure;
pub mod models;
pub mod navigation;
pub mod paginate;
pub mod rating;
pub mod storage;
pub mod ui;
