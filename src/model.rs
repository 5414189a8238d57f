pub use self::transaction::*;

pub(crate) mod transaction;
