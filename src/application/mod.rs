//! Navigation flows, routing and the collaborators they talk to.

pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod features;
pub mod navigator;
pub mod reporting;
pub mod transport;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;
