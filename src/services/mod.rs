pub mod artifact_writer;
pub mod email_finder;
pub mod job_orchestrator;
pub mod job_registry;
pub mod job_service;
pub mod keyword_worker;
pub mod overpass_client;
pub mod throttle;

pub use artifact_writer::*;
pub use email_finder::*;
pub use job_orchestrator::*;
pub use job_registry::*;
pub use job_service::*;
pub use keyword_worker::*;
pub use overpass_client::*;
pub use throttle::*;
