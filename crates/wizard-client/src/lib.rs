//! # Wizard client
//!
//! The networked core of a Wizard card game client.
//!
//! The game server owns the rules. This crate keeps a connection to it,
//! turns its messages into a [`SessionView`](wizard_session::SessionView)
//! that a UI can render, and turns UI input into protocol actions after
//! checking them locally.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wizard_client::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let (client, _notices) = WizardClient::start(ClientConfig::default());
//! client.join("ada").await?;   // sent as soon as the socket opens
//! client.connect().await?;
//!
//! let mut views = client.subscribe();
//! while views.changed().await.is_ok() {
//!     let view = views.borrow_and_update().clone();
//!     println!("{} ({} players)", view.lifecycle(), view.roster().len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! ClientHandle ──commands──→ client actor ──frames──→ Link ──→ server
//!      ↑                        │    ↑                 │
//!      └── watch<SessionView> ──┘    └──LinkEvent──────┘
//! ```

mod client;
mod config;
mod dispatcher;
mod error;

pub use client::{ClientHandle, ClientNotice, WizardClient};
pub use config::ClientConfig;
pub use dispatcher::{Dispatcher, Outbound};
pub use error::ClientError;

/// Everything a typical caller needs in one import.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, ClientHandle, ClientNotice, WizardClient,
    };
    pub use wizard_protocol::{Card, CardFace, Color, Player, RoundState};
    pub use wizard_session::{
        GuardViolation, Lifecycle, MessageKind, SessionMessage, SessionView,
    };
    pub use wizard_transport::{LinkState, ReconnectPolicy};
}
