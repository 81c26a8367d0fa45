//! The wire protocol shared by the device and host processes (spec §4.1,
//! §6.1): line framing, the optional envelope, and the frame/message
//! types that ride on top of it.

pub mod codec;
pub mod envelope;
pub mod frame;

/// Formats "now" as `YYYY-MM-DD HH:MM:SS`, the timestamp form every
/// device->host JSON frame carries (spec §6.1).
pub fn now_timestamp() -> String {
    jiff::Zoned::now()
        .strftime("%Y-%m-%d %H:%M:%S")
        .to_string()
}
