//! Infrastructure layer: storage abstraction, configuration, clock and the
//! `ContractDesk` service that drives the engine crates.

pub mod clock;
pub mod config;
pub mod desk;
pub mod repository;


pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use desk::{ContractDesk, DeskError, DeskResult, EvaluationReport, apply_overrides};
pub use repository::{
    ContractRepository, InMemoryContractRepository, RepositoryError, RepositoryResult,
};
