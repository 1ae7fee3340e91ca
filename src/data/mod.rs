pub mod columns;
pub mod export;
pub mod parser;
pub mod preamble;
pub mod upload;
