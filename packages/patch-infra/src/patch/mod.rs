pub mod command;
pub mod executor;
pub mod report;
pub mod run;
pub mod verifier;
