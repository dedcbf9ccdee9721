pub mod domain;
pub mod identity;
pub mod ports;
pub mod store;
pub mod summarize;
pub mod workspace;

pub use domain::{
    Account, AuthProvider, AuthSession, ChatMessage, ChatRole, Flashcard, SessionUser, Space,
    SummaryFields, SummaryRecord, VerifiedIdentity,
};
pub use identity::{derive_identity, Identity};
pub use ports::{
    AuthClient, CompletionService, IdentityVerifier, KeyValueStore, PortError, PortResult,
    UserRepository, WriteOp,
};
pub use store::{Collection, MemoryStore, NamespacedStore};
pub use workspace::{Workspace, WorkspaceError, WorkspaceResult};
