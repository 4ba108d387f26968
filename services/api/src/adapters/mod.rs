pub mod db;
pub mod identity;
pub mod optimizer_llm;

pub use db::DbAdapter;
pub use identity::JwtIdentityAdapter;
pub use optimizer_llm::OpenAiScheduleAdapter;
