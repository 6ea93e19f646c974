use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use image::DynamicImage;
use itertools::Itertools;
use ndarray::{Array2, Array3};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use track_consistency::{GroundTruthFrame, GroundTruthSequence, MaskEncoding, Palette};
use tracing::debug;

/// How RGB ground truth masks are turned into object ids.
///
/// Grayscale masks are always read as labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MaskDecoding {
    /// Only accept grayscale label masks.
    Labels,
    /// Read the id from a single RGB channel.
    Channel,
    /// Match colours against the renderer palette sized from `metadata.json`.
    Palette,
}

#[derive(Debug, Deserialize)]
struct SceneMetadata {
    instances: Vec<serde_json::Value>,
}

/// Returns the sorted `gt_masks/segmentation_*.png` files of a video directory.
pub fn mask_paths(video_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = video_dir.join("gt_masks").join("segmentation_*.png");
    let paths = glob::glob(&pattern.to_string_lossy())?
        .filter_map(|entry| entry.ok())
        .sorted()
        .collect();
    Ok(paths)
}

/// Number of object instances listed in the `metadata.json` of a video directory.
pub fn instance_count(video_dir: &Path) -> Result<usize> {
    let path = video_dir.join("metadata.json");
    let file =
        std::fs::File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let metadata: SceneMetadata = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(metadata.instances.len())
}

/// Load the ground truth masks of a video directory, in file name order.
///
/// # Parameters
///
/// * `video_dir`: The `<dataset>/<video>` directory.
/// * `decoding`: How RGB masks encode object identity.
/// * `channel`: The identity channel when `decoding` is [`MaskDecoding::Channel`].
pub fn load_ground_truth(
    video_dir: &Path,
    decoding: MaskDecoding,
    channel: usize,
) -> Result<GroundTruthSequence> {
    let images = mask_paths(video_dir)?
        .iter()
        .map(|path| {
            image::io::Reader::open(path)?
                .decode()
                .with_context(|| format!("failed to decode {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let needs_encoding = images.iter().any(|image| !is_grayscale(image));
    let encoding = match (needs_encoding, decoding) {
        (false, _) => MaskEncoding::default(),
        (true, MaskDecoding::Labels) => bail!(
            "{} contains RGB masks but label decoding was requested",
            video_dir.display()
        ),
        (true, MaskDecoding::Channel) => MaskEncoding::Channel(channel),
        (true, MaskDecoding::Palette) => {
            let instances = instance_count(video_dir)?;
            debug!("{} palette for {} instances", video_dir.display(), instances);
            MaskEncoding::Palette(Palette::kubric(instances))
        }
    };

    let frames = images
        .into_iter()
        .map(|image| decode_mask(image, &encoding))
        .collect::<Result<Vec<_>>>()?;
    GroundTruthSequence::new(frames)
}

fn is_grayscale(image: &DynamicImage) -> bool {
    matches!(image, DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_))
}

/// Decode one mask image into a frame.
pub fn decode_mask(image: DynamicImage, encoding: &MaskEncoding) -> Result<GroundTruthFrame> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    match image {
        DynamicImage::ImageLuma8(buffer) => {
            let labels = Array2::from_shape_vec((height, width), buffer.into_raw())?;
            Ok(GroundTruthFrame::from_labels(&labels))
        }
        DynamicImage::ImageLuma16(buffer) => {
            let labels = Array2::from_shape_vec((height, width), buffer.into_raw())?;
            Ok(GroundTruthFrame::from_labels(&labels))
        }
        image => {
            let rgb = Array3::from_shape_vec((height, width, 3), image.to_rgb8().into_raw())?;
            GroundTruthFrame::from_rgb(&rgb, encoding)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn write_masks(video_dir: &Path, masks: &[DynamicImage]) -> Result<()> {
        let dir = video_dir.join("gt_masks");
        std::fs::create_dir_all(&dir)?;
        for (index, mask) in masks.iter().enumerate() {
            mask.save(dir.join(format!("segmentation_{index:05}.png")))?;
        }
        Ok(())
    }

    #[test]
    fn test_grayscale_labels() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut first = GrayImage::new(4, 3);
        first.put_pixel(2, 1, Luma([7]));
        let second = GrayImage::new(4, 3);
        write_masks(
            dir.path(),
            &[DynamicImage::ImageLuma8(first), DynamicImage::ImageLuma8(second)],
        )?;

        let sequence = load_ground_truth(dir.path(), MaskDecoding::Labels, 0)?;
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.resolution(), Some((4, 3)));
        let frame = sequence.get(0).unwrap();
        assert_eq!(frame.object_id(2, 1), 7);
        assert_eq!(frame.foreground_count(), 1);
        assert_eq!(sequence.get(1).unwrap().foreground_count(), 0);
        Ok(())
    }

    #[test]
    fn test_rgb_channel() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut mask = RgbImage::new(3, 3);
        mask.put_pixel(0, 0, Rgb([0, 5, 0]));
        mask.put_pixel(1, 1, Rgb([9, 0, 0]));
        write_masks(dir.path(), &[DynamicImage::ImageRgb8(mask)])?;

        let sequence = load_ground_truth(dir.path(), MaskDecoding::Channel, 1)?;
        let frame = sequence.get(0).unwrap();
        assert_eq!(frame.object_id(0, 0), 5);
        // foreground through channel 0 but id 0 in channel 1
        assert!(frame.is_foreground(1, 1));
        assert_eq!(frame.object_id(1, 1), 0);

        assert!(load_ground_truth(dir.path(), MaskDecoding::Labels, 0).is_err());
        Ok(())
    }

    #[test]
    fn test_rgb_palette() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join("metadata.json"),
            r#"{"instances": [{"asset_id": "a"}, {"asset_id": "b"}]}"#,
        )?;
        let palette = Palette::kubric(2);
        let mut mask = RgbImage::new(2, 2);
        mask.put_pixel(1, 0, Rgb(palette.colors()[2]));
        write_masks(dir.path(), &[DynamicImage::ImageRgb8(mask)])?;

        let sequence = load_ground_truth(dir.path(), MaskDecoding::Palette, 0)?;
        let frame = sequence.get(0).unwrap();
        assert_eq!(frame.object_id(1, 0), 2);
        assert_eq!(frame.object_id(0, 0), 0);
        Ok(())
    }

    #[test]
    fn test_palette_without_metadata() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut mask = RgbImage::new(2, 2);
        mask.put_pixel(0, 0, Rgb([1, 2, 3]));
        write_masks(dir.path(), &[DynamicImage::ImageRgb8(mask)])?;
        assert!(load_ground_truth(dir.path(), MaskDecoding::Palette, 0).is_err());
        Ok(())
    }

    #[test]
    fn test_no_masks() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(mask_paths(dir.path())?.is_empty());
        assert!(load_ground_truth(dir.path(), MaskDecoding::Palette, 0)?.is_empty());
        Ok(())
    }
}
