// ABOUTME: Tool module - the Tool trait and the results tools return.
// ABOUTME: Everything an agent can call goes through these types.

mod result;
mod traits;

pub use result::*;
pub use traits::*;
