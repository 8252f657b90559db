pub mod conflict;
pub mod error;
pub mod materializer;
pub mod synchronize;
pub mod target;
