pub mod hardware;
pub mod identity;
pub mod network;
pub mod software;

pub use hardware::HardwareCollector;
pub use identity::SystemIdentityCollector;
pub use network::NetworkCollector;
pub use software::{DesktopEntrySource, DpkgSource};
