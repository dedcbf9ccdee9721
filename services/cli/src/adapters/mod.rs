pub mod auth_http;
pub mod completion;
pub mod file_store;

pub use auth_http::HttpAuthClient;
pub use completion::OpenAiCompletionAdapter;
pub use file_store::FileStore;
