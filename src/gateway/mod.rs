//! Gateway core - normalization, rate gate, credential pool, upstream client, dispatch

pub mod credentials;
pub mod dispatcher;
pub mod normalizer;
pub mod rate_gate;
pub mod upstream;

pub use credentials::{Credential, CredentialPool};
pub use dispatcher::{DispatchAttempt, Dispatcher};
pub use normalizer::{normalize, GenerateParams, RequestSpec};
pub use rate_gate::{Admission, RateGate};
pub use upstream::{AttemptOutcome, HttpUpstream, ImageUpstream};
