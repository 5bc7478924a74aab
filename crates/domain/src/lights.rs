//! RGB LED state and the lighting sub-protocol.
//!
//! The board has four RGB LEDs sharing one colour. The light characteristic
//! carries `(mode, r, g, b)` where `mode` is a bitmask selecting which LEDs are
//! lit. LEDs are numbered from the one right of the USB port (1), the top one
//! (2), the one right of the battery holder (3) and the remaining top one (4).
//!
//! The peripheral has no brightness channel, so brightness is applied to the
//! colour in HSV space before it is written.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{PayloadError, RegistryError};

/// Mode code → LEDs lit by that code.
pub const MODE_TABLE: [(u8, &[u8]); 16] = [
    (0, &[]),
    (1, &[1]),
    (2, &[2]),
    (3, &[1, 2]),
    (4, &[4]),
    (5, &[1, 4]),
    (6, &[2, 4]),
    (7, &[1, 2, 4]),
    (8, &[3]),
    (9, &[1, 3]),
    (10, &[2, 3]),
    (11, &[1, 2, 3]),
    (12, &[3, 4]),
    (13, &[1, 3, 4]),
    (14, &[2, 3, 4]),
    (15, &[1, 2, 3, 4]),
];

/// Mode with every LED lit.
pub const ALL_ON: [u8; 4] = [1, 2, 3, 4];

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Self = Self(255, 255, 255);
}

/// Last known state of the RGB LEDs.
///
/// `rgb` and `brightness` are the logical, unscaled values. The bytes sent to
/// the peripheral are derived from them by [`scale_brightness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightsState {
    pub rgb: Rgb,
    pub mode: u8,
    pub brightness: u8,
}

impl Default for LightsState {
    fn default() -> Self {
        Self {
            rgb: Rgb::WHITE,
            mode: 0,
            brightness: 255,
        }
    }
}

impl LightsState {
    /// Whether the power bit (bit 0) of the mode is set.
    #[must_use]
    pub const fn power(&self) -> bool {
        self.mode & 1 != 0
    }

    /// Parse a 4-byte `(mode, r, g, b)` payload read from the peripheral.
    ///
    /// The colour is kept verbatim and the brightness is derived from it
    /// (the HSV value component).
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::MalformedPayload`] when the payload is not 4
    /// bytes, or [`PayloadError::InvalidMode`] when the mode is not one of the
    /// 16 known bitmasks.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        let [mode, r, g, b] = codec::decode_tuple(payload)?;
        if usize::from(mode) >= MODE_TABLE.len() {
            return Err(PayloadError::InvalidMode { mode });
        }
        let rgb = Rgb(r, g, b);
        Ok(Self {
            rgb,
            mode,
            brightness: brightness_of(rgb),
        })
    }

    /// Build the 4-byte payload to write, with brightness applied to the colour.
    #[must_use]
    pub fn to_payload(&self) -> [u8; 4] {
        let Rgb(r, g, b) = scale_brightness(self.rgb, self.brightness);
        [self.mode, r, g, b]
    }

    /// LEDs lit by the current mode.
    #[must_use]
    pub fn leds(&self) -> &'static [u8] {
        MODE_TABLE
            .iter()
            .find(|(code, _)| *code == self.mode)
            .map_or(&[][..], |(_, leds)| *leds)
    }
}

/// Mode code that lights exactly the given LEDs.
///
/// Order and duplicates in `leds` are irrelevant.
///
/// # Errors
///
/// Returns [`RegistryError::UnknownLedSet`] when `leds` contains anything
/// outside `1..=4`.
pub fn get_mode(leds: &[u8]) -> Result<u8, RegistryError> {
    let mut wanted = leds.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    MODE_TABLE
        .iter()
        .find(|(_, lit)| *lit == wanted.as_slice())
        .map(|(code, _)| *code)
        .ok_or(RegistryError::UnknownLedSet(wanted))
}

/// Brightness of a colour read back from the peripheral.
#[must_use]
pub fn brightness_of(rgb: Rgb) -> u8 {
    let Rgb(r, g, b) = rgb;
    r.max(g).max(b)
}

/// Rescale the HSV value of `rgb` by `brightness / 255`.
///
/// Components are truncated, so the result can be one step below the input
/// even at full brightness.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
pub fn scale_brightness(rgb: Rgb, brightness: u8) -> Rgb {
    let Rgb(r, g, b) = rgb;
    let (h, s, v) = rgb_to_hsv(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(b) / 255.0,
    );
    let v = v * f64::from(brightness) / 255.0;
    let (r, g, b) = hsv_to_rgb(h, s, v);
    Rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

#[allow(clippy::many_single_char_names)]
fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, v);
    }
    let delta = max - min;
    let s = delta / max;
    let rc = (max - r) / delta;
    let gc = (max - g) / delta;
    let bc = (max - b) / delta;
    let h = if (r - max).abs() < f64::EPSILON {
        bc - gc
    } else if (g - max).abs() < f64::EPSILON {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), s, v)
}

#[allow(
    clippy::many_single_char_names,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as u32) % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
