pub mod schema;

pub use schema::{Config, CredentialsConfig, DefaultsConfig, ReliabilityConfig, SchedulerConfig};
