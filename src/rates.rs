pub use self::{cache::*, provider::*, resolver::*};

pub mod cache;
pub mod provider;
pub mod resolver;
