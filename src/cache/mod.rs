// Key-value backends and the read-through response cache built on them.

mod backend;
mod response;

pub use backend::{CacheBackend, CacheError, MemoryCache, RedisCache};
pub use response::ResponseCache;
