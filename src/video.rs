// src/video.rs - Frame sources: synthetic frames, image sequences and (optionally) the camera
use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[cfg(feature = "camera")]
use nokhwa::pixel_format::RgbFormat;
#[cfg(feature = "camera")]
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
#[cfg(feature = "camera")]
use nokhwa::Camera;

/// One captured still image, stamped by the capture worker.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    /// Seconds since capture started.
    pub timestamp: f64,
    pub image: DynamicImage,
}

impl Frame {
    pub fn new(index: u64, timestamp: f64, image: DynamicImage) -> Self {
        Self { index, timestamp, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub enum VideoSource {
    Synthetic(SyntheticFrames),
    Images(ImageSequenceReader),
    #[cfg(feature = "camera")]
    Camera(Camera),
}

/// Produces blank frames of a fixed size. Used with the simulated estimator,
/// which ignores pixel content.
pub struct SyntheticFrames {
    width: u32,
    height: u32,
    remaining: Option<u64>,
}

impl SyntheticFrames {
    pub fn new(width: u32, height: u32, limit: Option<u64>) -> Self {
        Self {
            width,
            height,
            remaining: limit,
        }
    }

    fn next_frame(&mut self) -> Option<DynamicImage> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        Some(DynamicImage::ImageRgb8(RgbImage::new(self.width, self.height)))
    }
}

/// Reads still images (png/jpg) from a directory in file-name order.
pub struct ImageSequenceReader {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    current: usize,
    looping: bool,
}

impl ImageSequenceReader {
    pub fn new(dir: impl AsRef<Path>, looping: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.is_dir() {
            return Err(anyhow::anyhow!("Image directory does not exist: {}", dir.display()));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(anyhow::anyhow!("No png/jpg frames found in {}", dir.display()));
        }

        info!("Found {} frames in {}", paths.len(), dir.display());
        Ok(Self {
            dir,
            paths,
            current: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Next decodable image. Files that fail to decode are skipped with a
    /// warning.
    fn next_frame(&mut self) -> Option<DynamicImage> {
        let mut failures = 0;
        loop {
            if self.current >= self.paths.len() {
                if !self.looping {
                    return None;
                }
                self.current = 0;
            }

            let path = &self.paths[self.current];
            self.current += 1;

            match image::open(path) {
                Ok(img) => return Some(img),
                Err(e) => {
                    warn!("Skipping frame {}: {}", path.display(), e);
                    failures += 1;
                    if failures >= self.paths.len() {
                        return None;
                    }
                }
            }
        }
    }
}

impl VideoSource {
    pub fn synthetic(width: u32, height: u32, limit: Option<u64>) -> Self {
        VideoSource::Synthetic(SyntheticFrames::new(width, height, limit))
    }

    pub fn images(dir: impl AsRef<Path>, looping: bool) -> Result<Self> {
        Ok(VideoSource::Images(ImageSequenceReader::new(dir, looping)?))
    }

    #[cfg(feature = "camera")]
    pub fn camera(index: u32, width: u32, height: u32, fps: u32) -> Result<Self> {
        tracing::debug!("Opening camera index {}", index);

        let format = CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, fps);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Exact(format));

        let camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| anyhow::anyhow!("Failed to open camera: {}", e))?;

        info!("Camera {} opened", index);
        Ok(VideoSource::Camera(camera))
    }

    /// Returns `Ok(None)` once a finite source is exhausted.
    pub fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        match self {
            VideoSource::Synthetic(frames) => Ok(frames.next_frame()),
            VideoSource::Images(reader) => Ok(reader.next_frame()),
            #[cfg(feature = "camera")]
            VideoSource::Camera(cam) => {
                if !cam.is_stream_open() {
                    cam.open_stream()
                        .map_err(|e| anyhow::anyhow!("Failed to open camera stream: {}", e))?;
                }

                let frame = cam.frame()
                    .map_err(|e| anyhow::anyhow!("Failed to capture frame: {}", e))?;
                let decoded = frame.decode_image::<RgbFormat>()
                    .map_err(|e| anyhow::anyhow!("Failed to decode frame: {}", e))?;

                // Front camera: show the player a mirror image.
                let flipped = image::imageops::flip_horizontal(&decoded);
                Ok(Some(DynamicImage::ImageRgb8(flipped)))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            VideoSource::Synthetic(frames) => format!("synthetic {}x{}", frames.width, frames.height),
            VideoSource::Images(reader) => format!("images from {}", reader.dir().display()),
            #[cfg(feature = "camera")]
            VideoSource::Camera(cam) => format!("camera {}", cam.info().human_name()),
        }
    }
}

#[cfg(feature = "camera")]
impl Drop for VideoSource {
    fn drop(&mut self) {
        if let VideoSource::Camera(cam) = self {
            let _ = cam.stop_stream();
        }
    }
}
