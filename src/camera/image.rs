//! Captured image buffer.

use chrono::{DateTime, Utc};

/// Bytes per pixel: blue, green, red.
pub const CHANNELS: usize = 3;

/// A captured frame in `height × width × 3` layout, BGR channel order,
/// one byte per channel.
#[derive(Clone)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
    captured_at: DateTime<Utc>,
    /// Per-driver capture counter, starting at 1.
    sequence: u64,
}

impl Image {
    /// Wraps a buffer that is already in BGR order.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            captured_at: Utc::now(),
            sequence,
        }
    }

    /// Builds an image from interleaved RGB, swapping to BGR in place.
    pub fn from_rgb(mut rgb: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        for px in rgb.chunks_exact_mut(CHANNELS) {
            px.swap(0, 2);
        }
        Self::new(rgb, width, height, sequence)
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(height, width, channels)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }

    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the `[b, g, r]` triple at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = self.data.get(offset..offset + CHANNELS)?;
        Some([px[0], px[1], px[2]])
    }

    /// Validates that the buffer size matches the dimensions.
    pub fn is_valid(&self) -> bool {
        let (h, w, c) = self.shape();
        self.data.len() == h * w * c
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("captured_at", &self.captured_at)
            .field("bytes", &self.data.len())
            .finish()
    }
}
