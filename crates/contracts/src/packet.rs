//! StreamPacket - the unit of traffic on one stream
//!
//! What a producer hands to the aligner: one payload stamped with the shared
//! capture clock and the stream's own sequence counter.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::StreamId;

/// One message on one stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPacket {
    /// Originating stream
    pub stream_id: StreamId,

    /// Capture timestamp (nanoseconds, shared clock) - the alignment key
    pub timestamp: u64,

    /// Per-stream monotonic sequence number
    pub sequence: u64,

    /// Payload (zero-copy)
    pub payload: FramePayload,
}

/// Stream payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FramePayload {
    /// Camera image
    Image(ImageFrame),

    /// Inertial sample
    Imu(ImuSample),

    /// Opaque bytes (fallback)
    Raw(Bytes),
}

impl FramePayload {
    /// Payload size in bytes, for diagnostics
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Image(img) => img.data.len(),
            Self::Imu(_) => std::mem::size_of::<ImuSample>(),
            Self::Raw(data) => data.len(),
        }
    }
}

/// Image data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFrame {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Pixel encoding
    pub encoding: ImageEncoding,

    /// Exposure time (microseconds)
    pub exposure_us: u32,

    /// Sensor gain
    pub gain: u32,

    /// Raw pixel data
    pub data: Bytes,
}

/// Image pixel encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageEncoding {
    Mono8,
    Yuv420,
    Bgr8,
    Jpeg,
}

/// IMU sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuSample {
    /// Accelerometer (m/s²)
    pub accelerometer: Vector3,

    /// Gyroscope (rad/s)
    pub gyroscope: Vector3,
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
