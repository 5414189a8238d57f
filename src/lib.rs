#![forbid(unsafe_code)]

pub mod aggregate;
pub mod check;
pub mod config;
pub mod consts;
pub mod errors;
pub mod model;
pub mod rates;
pub mod reconcile;
pub mod util;
