//! ekami-domain
//!
//! Pure domain models (intake form, repair requests, comments, loyalty, valuation).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod comment;
pub mod common;
pub mod identity;
pub mod intake;
pub mod loyalty;
pub mod repair;
pub mod valuation;

pub use comment::*;
pub use common::*;
pub use identity::*;
pub use intake::*;
pub use loyalty::*;
pub use repair::*;
pub use valuation::*;
