//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one slice of the node
//! against mock ports.  All tests run on the host (x86_64) with no real
//! hardware required.

mod access_code_tests;
mod arbitration_tests;
mod dispatch_tests;
mod mock_ports;
mod request_flow_tests;
