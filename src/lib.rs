pub mod annotate;
pub mod assemble;
pub mod cli;
pub mod error;
pub mod funcs;
pub mod ingest;
pub mod merge;
pub mod model;
pub mod parsers;
pub mod report;
pub mod resolve;
pub mod source;
pub mod tree;
