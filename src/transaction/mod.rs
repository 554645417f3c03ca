pub mod model;
pub mod pool;

pub use model::{Transaction, TransactionInput};
pub use pool::TransactionPool;
