//! Async Rust client for the Cisco Meraki Dashboard API v1.
//!
//! The crate covers the read-only slice of the Dashboard that a poller
//! needs: organizations, networks, device inventory and status,
//! licensing, environmental sensor readings, wireless and switch port
//! status. Every list endpoint follows `Link: rel=next` pagination.
//!
//! ```no_run
//! # async fn demo() -> Result<(), meraki_api::Error> {
//! use meraki_api::{MerakiClient, Region, TransportConfig};
//! use secrecy::SecretString;
//!
//! let key = SecretString::from("0123456789abcdef0123456789abcdef01234567".to_owned());
//! let client = MerakiClient::from_api_key(
//!     Region::Global.base_url(),
//!     &key,
//!     &TransportConfig::default(),
//! )?;
//! for org in client.get_organizations().await? {
//!     println!("{} {}", org.id, org.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod region;
pub mod transport;

pub use client::MerakiClient;
pub use error::Error;
pub use region::Region;
pub use transport::{TlsMode, TransportConfig};
