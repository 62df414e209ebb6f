pub mod db;
pub mod memory;
pub mod session;

pub use db::PgBackend;
pub use memory::MemoryBackend;
pub use session::StaticSession;
