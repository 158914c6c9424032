use serde::{Deserialize, Serialize};
use vm_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    NearestPixel,
    SubPixelGradient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiameterConfig {
    /// Path pixels between samples. Counted along the pixel chain, not in arc
    /// length: a diagonal step counts as one pixel.
    pub interval: usize,
    pub method: Method,
    /// Half-width, in path pixels, of the central difference used for the
    /// tangent.
    pub tangent_window: usize,
    /// Longest ray walked from the centre line, pixels.
    pub max_radius: f32,
}

impl Default for DiameterConfig {
    fn default() -> Self {
        Self {
            interval: 10,
            method: Method::NearestPixel,
            tangent_window: 2,
            max_radius: 50.0,
        }
    }
}

impl DiameterConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval == 0 {
            return Err(Error::config("interval must be >= 1"));
        }
        if self.tangent_window == 0 {
            return Err(Error::config("tangent_window must be >= 1"));
        }
        if !(self.max_radius.is_finite() && self.max_radius > 0.0) {
            return Err(Error::config("max_radius must be > 0"));
        }
        Ok(())
    }
}
