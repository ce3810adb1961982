pub(crate) mod common;
pub mod quantiles;
pub mod run;
pub mod runs;
