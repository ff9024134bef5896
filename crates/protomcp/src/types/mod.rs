//! MCP Protocol Types
//!
//! Type definitions for the stateless subset of MCP served by the dispatcher:
//!
//! - `jsonrpc` - JSON-RPC 2.0 envelopes (requests, notifications, responses)
//! - `error` - error data with the standard and tool-execution codes
//! - `protocol` - initialize result and capability advertisement
//! - `tool` - tool listings and call results
//! - `content` - content blocks carried by call results

pub mod content;
pub mod error;
pub mod jsonrpc;
pub mod protocol;
pub mod tool;
