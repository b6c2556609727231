//! Conversions between `image` buffers and OpenCV matrices.

use image::RgbImage;
use opencv::{core::Mat, imgproc, prelude::*};

use crate::error::{MediaError, MediaResult};

fn opencv_err(context: &str, e: opencv::Error) -> MediaError {
    MediaError::detection_failed(format!("{}: {}", context, e))
}

/// Copy an RGB8 image into a BGR `Mat`, the layout OpenCV detectors expect.
pub(crate) fn rgb_to_bgr_mat(image: &RgbImage) -> MediaResult<Mat> {
    let rgb = rgb_mat(image)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)
        .map_err(|e| opencv_err("RGB to BGR conversion failed", e))?;
    Ok(bgr)
}

/// Copy an RGB8 image into a single-channel grayscale `Mat`.
pub(crate) fn rgb_to_gray_mat(image: &RgbImage) -> MediaResult<Mat> {
    let rgb = rgb_mat(image)?;
    let mut gray = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut gray, imgproc::COLOR_RGB2GRAY)
        .map_err(|e| opencv_err("RGB to grayscale conversion failed", e))?;
    Ok(gray)
}

fn rgb_mat(image: &RgbImage) -> MediaResult<Mat> {
    let rows = i32::try_from(image.height())
        .map_err(|_| MediaError::detection_failed("Image too tall for OpenCV"))?;
    let flat = Mat::from_slice(image.as_raw())
        .map_err(|e| opencv_err("Failed to wrap image buffer", e))?;
    let shaped = flat
        .reshape(3, rows)
        .map_err(|e| opencv_err("Failed to reshape image buffer", e))?;
    let owned = shaped
        .try_clone()
        .map_err(|e| opencv_err("Failed to copy image buffer", e))?;
    Ok(owned)
}
