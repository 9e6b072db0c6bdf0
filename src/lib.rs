// ABOUTME: Root module for plane-agent - a supervisor that routes Plane tasks to
// ABOUTME: domain agents over MCP, served via AG-UI and A2A.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod prelude;
pub mod server;
pub mod skills;
pub mod tool;
pub mod toolset;
pub mod ui;

pub use error::PlaneError;
