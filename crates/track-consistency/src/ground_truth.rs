use anyhow::{bail, ensure, Result};
use fixedbitset::FixedBitSet;
use ndarray::*;
use num_traits::ToPrimitive;
use std::collections::HashMap;

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRDS: f64 = 2.0 / 3.0;

/// Colour palette of a segmentation renderer, where the colour at index `i` encodes object `i` and index 0 is black background.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
    lookup: HashMap<[u8; 3], u32>,
}

impl Palette {
    /// Returns a new Palette from an explicit colour list.
    pub fn new(colors: Vec<[u8; 3]>) -> Palette {
        let mut lookup = HashMap::with_capacity(colors.len());
        for (index, color) in colors.iter().enumerate() {
            lookup.entry(*color).or_insert(index as u32);
        }
        Palette { colors, lookup }
    }

    /// Returns a palette of `n_colors + 1` entries: black followed by `n_colors` hues evenly spaced in HLS space.
    ///
    /// # Parameters
    ///
    /// * `n_colors`: Number of non background colours.
    /// * `first_hue`: Hue offset of the first colour, in `[0, 1)`.
    /// * `lightness`: HLS lightness.
    /// * `saturation`: HLS saturation.
    pub fn hls(n_colors: usize, first_hue: f64, lightness: f64, saturation: f64) -> Palette {
        let mut colors = vec![[0u8, 0u8, 0u8]];
        colors.extend((0..n_colors).map(|i| {
            let hue = (i as f64 / n_colors as f64 + first_hue).rem_euclid(1.0);
            let (r, g, b) = hls_to_rgb(hue, lightness, saturation);
            [to_u8(r), to_u8(g), to_u8(b)]
        }));
        Palette::new(colors)
    }

    /// Returns the palette Kubric uses to render the segmentation of a scene with `num_instances` objects.
    pub fn kubric(num_instances: usize) -> Palette {
        Palette::hls(num_instances + 1, 0.01, 0.5, 0.7)
    }

    /// Returns the colours
    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    /// Returns the object id of an exactly matching colour, `0` when the colour is not in the palette.
    pub fn object_id(&self, color: [u8; 3]) -> u32 {
        self.lookup.get(&color).copied().unwrap_or(0)
    }
}

fn to_u8(value: f64) -> u8 {
    (value * 255.0).round_ties_even().clamp(0.0, 255.0) as u8
}

fn hls_to_rgb(hue: f64, lightness: f64, saturation: f64) -> (f64, f64, f64) {
    if saturation == 0.0 {
        return (lightness, lightness, lightness);
    }
    let m2 = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - (lightness * saturation)
    };
    let m1 = 2.0 * lightness - m2;
    (
        hue_channel(m1, m2, hue + ONE_THIRD),
        hue_channel(m1, m2, hue),
        hue_channel(m1, m2, hue - ONE_THIRD),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < ONE_SIXTH {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < TWO_THIRDS {
        m1 + (m2 - m1) * (TWO_THIRDS - hue) * 6.0
    } else {
        m1
    }
}

/// How an RGB mask encodes object identity.
///
/// * `Channel` reads the id from a single designated channel value.
/// * `Palette` matches the full colour against a renderer palette.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskEncoding {
    Channel(usize),
    Palette(Palette),
}

impl Default for MaskEncoding {
    fn default() -> Self {
        MaskEncoding::Channel(0)
    }
}

/// A ground truth segmentation frame: one object id per pixel (`0` is background) and the foreground bitmap.
#[derive(Debug, Clone)]
pub struct GroundTruthFrame {
    /// Object ids indexed `[y, x]`.
    labels: Array2<u32>,
    /// Row-major bitmap of pixels whose encoded value is non-zero.
    foreground: FixedBitSet,
}

impl GroundTruthFrame {
    /// Returns a new GroundTruthFrame from an integer labelled raster of shape `(height, width)`.
    ///
    /// Values that do not fit an object id (negative or too large) are read as background.
    pub fn from_labels<S, T>(labels: &ArrayBase<S, Ix2>) -> GroundTruthFrame
    where
        S: Data<Elem = T>,
        T: ToPrimitive + Clone,
    {
        let labels = labels.mapv(|value| value.to_u32().unwrap_or(0));
        let mut foreground = FixedBitSet::with_capacity(labels.len());
        labels
            .iter()
            .enumerate()
            .filter(|(_, &id)| id != 0)
            .for_each(|(index, _)| foreground.insert(index));
        GroundTruthFrame { labels, foreground }
    }

    /// Returns a new GroundTruthFrame from an RGB raster of shape `(height, width, channels)`.
    ///
    /// A pixel is foreground if any of its first three channels is non-zero, its id comes from `encoding`.
    pub fn from_rgb<S>(rgb: &ArrayBase<S, Ix3>, encoding: &MaskEncoding) -> Result<GroundTruthFrame>
    where
        S: Data<Elem = u8>,
    {
        let (height, width, channels) = rgb.dim();
        ensure!(
            channels >= 3,
            "rgb mask must have at least 3 channels, got {}",
            channels
        );
        if let MaskEncoding::Channel(channel) = encoding {
            if *channel >= 3 {
                bail!("identity channel {} is not an RGB channel", channel);
            }
        }

        let mut labels = Array2::<u32>::zeros((height, width));
        let mut foreground = FixedBitSet::with_capacity(height * width);
        for y in 0..height {
            for x in 0..width {
                let color = [rgb[[y, x, 0]], rgb[[y, x, 1]], rgb[[y, x, 2]]];
                if color.iter().any(|&c| c != 0) {
                    foreground.insert(y * width + x);
                }
                labels[[y, x]] = match encoding {
                    MaskEncoding::Channel(channel) => color[*channel] as u32,
                    MaskEncoding::Palette(palette) => palette.object_id(color),
                };
            }
        }
        Ok(GroundTruthFrame { labels, foreground })
    }

    /// Returns the width of the frame
    pub fn width(&self) -> usize {
        self.labels.ncols()
    }

    /// Returns the height of the frame
    pub fn height(&self) -> usize {
        self.labels.nrows()
    }

    /// Whether `(x, y)` lies inside the raster.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }

    /// Returns the object id at `(x, y)`. Panics when out of bounds.
    pub fn object_id(&self, x: usize, y: usize) -> u32 {
        self.labels[[y, x]]
    }

    /// Whether the pixel at `(x, y)` is foreground. Panics when out of bounds.
    pub fn is_foreground(&self, x: usize, y: usize) -> bool {
        assert!(x < self.width() && y < self.height(), "pixel ({x}, {y}) out of bounds");
        self.foreground.contains(y * self.width() + x)
    }

    /// Returns the number of foreground pixels
    pub fn foreground_count(&self) -> usize {
        self.foreground.count_ones(..)
    }
}

/// The ground truth frames of one video, all sharing the same resolution.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthSequence {
    frames: Vec<GroundTruthFrame>,
}

impl GroundTruthSequence {
    /// Returns a new GroundTruthSequence
    pub fn new(frames: Vec<GroundTruthFrame>) -> Result<GroundTruthSequence> {
        if let Some(first) = frames.first() {
            let (width, height) = (first.width(), first.height());
            for (index, frame) in frames.iter().enumerate() {
                ensure!(
                    frame.width() == width && frame.height() == height,
                    "ground truth frame {} is {}x{}, expected {}x{}",
                    index,
                    frame.width(),
                    frame.height(),
                    width,
                    height
                );
            }
        }
        Ok(GroundTruthSequence { frames })
    }

    /// Returns the number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the sequence has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the frame at `index`
    pub fn get(&self, index: usize) -> Option<&GroundTruthFrame> {
        self.frames.get(index)
    }

    /// Returns the `(width, height)` shared by all frames, `None` when empty.
    pub fn resolution(&self) -> Option<(usize, usize)> {
        self.frames.first().map(|frame| (frame.width(), frame.height()))
    }
}
