//! SessionRegistry の実装
//!
//! ## 実装
//!
//! - `inmemory`: 単一プロセス内の Mutex 保護されたマップによる実装
//! - 将来的に: 複数サーバー構成では Redis などの共有レジストリ

pub mod inmemory;

pub use inmemory::InMemorySessionRegistry;
