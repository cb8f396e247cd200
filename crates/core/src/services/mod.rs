//! Background services the router dispatches to besides the desktop session.

mod config;
mod disabled_domains;
mod login_memory;

pub use config::ConfigService;
pub use disabled_domains::DisabledDomains;
pub use login_memory::LoginMemory;
