pub mod order;
pub mod error;
pub mod repository;
pub mod notifier;

pub use order::{Order, OrderStatus};
pub use error::{PayoutError, PayoutResult};
pub use repository::OrderRepository;
pub use notifier::Notifier;

/// Service name reported by health checks and log lines.
pub const SERVICE_NAME: &str = "reward-service-mock";
