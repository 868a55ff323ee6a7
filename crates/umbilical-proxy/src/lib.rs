//! Asynchronous fan-out relay for the umbilical link.
//!
//! The binary runs two [`Proxy`] sides on adjacent ports: "software"
//! for ground-station clients (frames mirrored between them) and
//! "hardware" for the avionics endpoint or its simulator. Each side
//! forwards client frames into the other's forward queue and fans
//! forwarded frames out to all of its own clients.
//!
//! Frames are relayed as opaque 14-byte units framed by the `0x05`
//! header; CRC checking and frame semantics stay at the endpoints.

mod relay;

pub use relay::{Proxy, ProxyError};
