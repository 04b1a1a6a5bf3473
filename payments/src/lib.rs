pub mod auth;
pub mod entities;
pub mod error;
pub mod executable_utils;
pub mod handlers;
pub mod model;
pub mod storage;
