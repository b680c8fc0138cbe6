pub mod credentials;
pub mod gateway;
pub mod history;
pub mod retry;

pub use credentials::{Credential, CredentialPool, PooledCredential};
pub use gateway::GenerationGateway;
pub use history::{normalize_history, ModelRole, ModelTurn};
pub use retry::{
    cancellation, next_state, CancelHandle, CancelSignal, RetryCoordinator, RetryPolicy,
    RetryState,
};
