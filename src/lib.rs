#![doc = "The `taskvault` library crate."]
#![doc = ""]
#![doc = "Request authentication and credential lifecycle for a multi-tenant"]
#![doc = "task-tracking service: password hashing with silent cost upgrades,"]
#![doc = "TOTP second factors, sealed session cookies, and OAuth2 bearer-token"]
#![doc = "client authentication, plus the task and client CRUD surface those"]
#![doc = "credentials protect. The main binary (`main.rs`) wires it together."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod oauth2;
pub mod routes;
pub mod state;
pub mod stores;
