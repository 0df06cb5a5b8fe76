// the engine aggregate, split by concern:
//   core      - state, construction, account and derivative admin
//   orders    - submission, replacement, offsetting, matching
//   valuation - administrator mark-to-market and margin checks
//   lifecycle - close, close-out, settlement, destroy
//   results   - outcome types and the error enum

pub mod core;
pub mod lifecycle;
pub mod orders;
pub mod results;
pub mod valuation;

pub use core::Engine;
pub use results::{ClearingError, Fill, OrderResult};
