pub mod completion_llm;
pub mod db;
pub mod fetcher;
pub mod memory;

pub use completion_llm::OpenAiCompletionAdapter;
pub use db::DbAdapter;
pub use fetcher::ReqwestFetcher;
pub use memory::MemoryStore;
