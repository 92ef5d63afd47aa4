//! Test support utilities
//!
//! Mock implementations used by unit and integration tests to exercise the
//! connection lifecycle without a broker.

pub mod mocks;
