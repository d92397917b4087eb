use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::Color;
use crate::error::FcpError;

/// Colormaps offered for multi-file comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Plasma,
    Inferno,
    Cool,
    Tab10,
}

// Stops at t = 0, 0.25, 0.5, 0.75, 1.
const VIRIDIS: [u32; 5] = [0x440154, 0x3b528b, 0x21918c, 0x5ec962, 0xfde725];
const PLASMA: [u32; 5] = [0x0d0887, 0x7e03a8, 0xcc4778, 0xf89540, 0xf0f921];
const INFERNO: [u32; 5] = [0x000004, 0x57106e, 0xbc3754, 0xf98e09, 0xfcffa4];
const COOL: [u32; 2] = [0x00ffff, 0xff00ff];
const TAB10: [u32; 10] = [
    0x1f77b4, 0xff7f0e, 0x2ca02c, 0xd62728, 0x9467bd, 0x8c564b, 0xe377c2, 0x7f7f7f, 0xbcbd22,
    0x17becf,
];

fn interpolate(stops: &[u32], t: f64) -> Color {
    let scaled = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - lo as f64;
    let (a, b) = (Color(stops[lo]).channels(), Color(stops[lo + 1]).channels());
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    Color::rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

impl Colormap {
    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
            Colormap::Inferno => "inferno",
            Colormap::Cool => "cool",
            Colormap::Tab10 => "tab10",
        }
    }

    /// Color at position `t` in `[0, 1]`.
    pub fn sample(&self, t: f64) -> Color {
        match self {
            Colormap::Viridis => interpolate(&VIRIDIS, t),
            Colormap::Plasma => interpolate(&PLASMA, t),
            Colormap::Inferno => interpolate(&INFERNO, t),
            Colormap::Cool => interpolate(&COOL, t),
            Colormap::Tab10 => {
                let idx = (t.clamp(0.0, 1.0) * TAB10.len() as f64) as usize;
                Color(TAB10[idx.min(TAB10.len() - 1)])
            }
        }
    }

    /// `n` colors evenly spaced over the whole map.
    pub fn colors(&self, n: usize) -> Vec<Color> {
        match n {
            0 => Vec::new(),
            1 => vec![self.sample(0.0)],
            _ => (0..n)
                .map(|i| self.sample(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

impl FromStr for Colormap {
    type Err = FcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        [
            Colormap::Viridis,
            Colormap::Plasma,
            Colormap::Inferno,
            Colormap::Cool,
            Colormap::Tab10,
        ]
        .into_iter()
        .find(|map| map.name() == wanted)
        .ok_or_else(|| FcpError::UnknownColormap(s.to_string()))
    }
}
