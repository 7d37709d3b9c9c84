pub mod convert;
pub mod storage;
