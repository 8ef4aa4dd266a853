pub mod config;
pub mod error;
pub mod error_utils;
pub mod history;
pub mod selector;
pub mod storage;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use history::*;
pub use selector::*;
pub use storage::*;
pub use traits::*;
pub use types::*;
