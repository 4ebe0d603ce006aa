pub mod random;
pub mod policy;
pub mod outcome;
pub mod transition;
pub mod engine;
pub mod memory;

pub use random::{RandomSource, ThreadRandom, ScriptedRandom};
pub use policy::PayoutPolicy;
pub use outcome::OutcomeSelector;
pub use transition::{DeferredTransition, NotificationOutcome, TaskReport, TaskState};
pub use engine::LifecycleEngine;
pub use memory::InMemoryOrderRepository;
