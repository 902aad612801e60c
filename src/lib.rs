pub mod cli;
pub mod core;
pub mod exchanges;
pub mod orders;
pub mod reports;
pub mod utils;

pub use crate::core::{config::*, error::*, exchange::*, types::*};
pub use exchanges::*;
pub use orders::*;
