pub mod fixture;
pub mod remote;
pub mod subprocess;

pub use fixture::FixtureBackend;
pub use remote::{RemoteBackend, RemoteConfig};
pub use subprocess::{SubprocessBackend, SubprocessConfig};
