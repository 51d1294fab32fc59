//! Config DB and Asic DB client traits for the dynamic port breakout
//! engine, plus a Redis-backed implementation and an in-memory test
//! double that satisfy the same traits.
//!
//! One trait per collaborator the orchestrator needs, `async_trait`-ed so
//! a production and a test implementation are interchangeable behind a
//! `Box<dyn Trait>` or a generic parameter.

pub mod asic_db;
pub mod config_db;
pub mod defaults;
pub mod fixture;

pub use asic_db::{AsicDbClient, RedisAsicDb};
pub use config_db::{ConfigDbClient, RedisConfigDb};
pub use defaults::load_defaults_file;
pub use fixture::{FixtureAsicDb, FixtureConfigDb};
