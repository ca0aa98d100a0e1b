//! SMTP probing: transport, multi-host prober, and catch-all detection.

mod catch_all;
mod prober;
mod result;
mod transport;

pub use catch_all::CatchAllDetector;
pub use prober::SmtpProber;
pub use result::{HostAttempt, RcptReply, ScanOutcome};
pub use transport::{test_smtp_connectivity, LettreTransport, RcptTransport};
