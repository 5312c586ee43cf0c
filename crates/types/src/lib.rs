//! Shared data model for the Payguard engine: payment intents, guard
//! policies, custody bindings, and settlement records.

pub mod intent;
pub mod policy;
pub mod request;
pub mod settlement;
pub mod step;
pub mod transfer;
pub mod wallet;

pub use intent::*;
pub use policy::*;
pub use request::*;
pub use settlement::*;
pub use step::*;
pub use transfer::*;
pub use wallet::*;

pub const ENGINE_VERSION: &str = "1.0";
