//! Element resolution against browser sessions
//!
//! Turns declarative [`SelectorDescriptor`](selector::SelectorDescriptor)s
//! into element handles, through any [`BrowserSession`]:
//!
//! - [`CdpPage`]: a live Chrome tab over the DevTools protocol
//! - [`DocumentSession`]: a parsed markup snapshot, no browser needed
//!
//! # Layout
//!
//! 1. **cdp**: one WebSocket per browser, multiplexed target sessions
//! 2. **capability**: the session traits the resolver is written against
//! 3. **resolver**: descriptor → handle policy (waiting, ambiguity, filters)

pub mod capability;
pub mod cdp;
pub mod config;
pub mod error;
pub mod offline;
pub mod page;
pub mod resolver;
pub mod wait;

pub use capability::{BrowserSession, ElementHandle, ScriptEvaluator};
pub use cdp::{CDPClient, CDPError, CDPSession};
pub use config::{CdpConfig, ResolverConfig};
pub use error::{Result, SessionError, WebAutomationError};
pub use offline::DocumentSession;
pub use page::CdpPage;
pub use resolver::ElementResolver;
pub use wait::{poll_until, wait_for, WaitConfig};
