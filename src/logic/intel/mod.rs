//! External Reputation Clients
//!
//! Tranco (domain popularity), VirusTotal (multi-engine verdicts) and
//! WHOIS/RDAP (registration age), all behind the shared single-flight
//! cache in `cache.rs`. Failures surface as `None`, never as errors.

pub mod cache;
pub mod tranco;
pub mod virustotal;
pub mod whois;

pub use tranco::{TrancoClient, TrancoVerdict};
pub use virustotal::{VirusTotalClient, VirusTotalVerdict};
pub use whois::{WhoisClient, WhoisVerdict};
