//! IPC module for daemon-host communication

mod protocol;
mod server;

pub use protocol::{
    DaemonStatus, Notification, Request, Response, SettingsSnapshot, MAX_FRAME_LEN,
};
pub use server::{Links, Server};
