pub mod http;
pub mod process;
pub mod storage;
