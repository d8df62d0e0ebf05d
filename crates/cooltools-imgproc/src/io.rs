// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image file I/O — load grayscale images and stacks into `ImageData`, write
// layers back out as 8- or 16-bit files.

use std::path::{Path, PathBuf};

use cooltools_core::error::{CoolToolsError, Result};
use cooltools_core::{Dtype, ImageData, Layer, OutputFormat};
use image::{ColorType, DynamicImage, ImageBuffer, ImageFormat, Luma};
use ndarray::{Array2, ArrayView2, Axis, Ix2, Ix3};
use tracing::{debug, info, instrument};

use crate::kernels::exposure::rescale_range;

// -- Loading ------------------------------------------------------------------

/// Load a single image file as a 2D buffer. Colour images are reduced to luma.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_image(path: impl AsRef<Path>) -> Result<ImageData> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| {
        CoolToolsError::ImageError(format!("failed to open {}: {}", path.display(), err))
    })?;
    let data = dynamic_to_data(&img)?;
    info!(
        width = img.width(),
        height = img.height(),
        dtype = %data.dtype(),
        "Image loaded"
    );
    Ok(data)
}

/// Load several same-sized files as a `(N, H, W)` stack.
#[instrument(skip_all, fields(count = paths.len()))]
pub fn load_stack<P: AsRef<Path>>(paths: &[P]) -> Result<ImageData> {
    if paths.is_empty() {
        return Err(CoolToolsError::InvalidParameter("a stack needs at least one image".into()));
    }

    let mut planes = Vec::with_capacity(paths.len());
    for path in paths {
        planes.push(load_image(path)?);
    }

    let dtype = planes[0].dtype();
    let expected = planes[0].shape().to_vec();
    let mut views: Vec<ArrayView2<'_, f32>> = Vec::with_capacity(planes.len());
    for plane in &planes {
        if plane.shape() != expected.as_slice() {
            return Err(CoolToolsError::ShapeMismatch {
                expected,
                actual: plane.shape().to_vec(),
            });
        }
        views.push(as_plane(plane)?);
    }

    let stack = ndarray::stack(Axis(0), &views).map_err(|err| CoolToolsError::ImageError(err.to_string()))?;
    // Mixed bit depths are widened to the deepest one.
    let dtype = planes.iter().map(ImageData::dtype).fold(dtype, deeper);
    debug!(shape = ?stack.shape(), %dtype, "Stack assembled");
    Ok(ImageData::new(stack.into_dyn(), dtype))
}

fn deeper(a: Dtype, b: Dtype) -> Dtype {
    match (a, b) {
        (Dtype::F32, _) | (_, Dtype::F32) => Dtype::F32,
        (Dtype::U16, _) | (_, Dtype::U16) => Dtype::U16,
        _ => Dtype::U8,
    }
}

fn as_plane(data: &ImageData) -> Result<ArrayView2<'_, f32>> {
    data.array()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| CoolToolsError::InvalidRank { ndim: data.ndim() })
}

fn dynamic_to_data(img: &DynamicImage) -> Result<ImageData> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let (values, dtype): (Vec<f32>, Dtype) = match img.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => {
            (img.to_luma8().into_raw().into_iter().map(f32::from).collect(), Dtype::U8)
        }
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            (img.to_luma16().into_raw().into_iter().map(f32::from).collect(), Dtype::U16)
        }
        _ => (img.to_luma32f().into_raw(), Dtype::F32),
    };
    let plane = Array2::from_shape_vec((height, width), values)
        .map_err(|err| CoolToolsError::ImageError(err.to_string()))?;
    Ok(ImageData::from_plane(plane, dtype))
}

// -- Saving -------------------------------------------------------------------

/// Write a layer into `dir`. A 2D layer becomes `{name}.{ext}`; a stack
/// becomes one file per slice, `{name}_{index:03}.{ext}`.
///
/// `U8` layers are written as 8-bit, everything else as 16-bit; `F32` data is
/// min-max rescaled onto the 16-bit range first.
#[instrument(skip_all, fields(layer = %layer.name, dir = %dir.as_ref().display(), ?format))]
pub fn save_layer(layer: &Layer, dir: impl AsRef<Path>, format: OutputFormat) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let stem = sanitize_stem(&layer.name);
    let ext = format.extension();
    let image_format = match format {
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::Tiff => ImageFormat::Tiff,
    };

    let dtype = layer.data.dtype();
    let values = match dtype {
        Dtype::F32 => rescale_range(layer.data.array(), 0.0, f32::from(u16::MAX)),
        _ => layer.data.array().mapv(|v| dtype.saturate(v)),
    };

    let mut written = Vec::new();
    match values.ndim() {
        2 => {
            let plane = values
                .view()
                .into_dimensionality::<Ix2>()
                .map_err(|_| CoolToolsError::InvalidRank { ndim: 2 })?;
            let path = dir.join(format!("{stem}.{ext}"));
            write_plane(plane, dtype, &path, image_format)?;
            written.push(path);
        }
        3 => {
            let stack = values
                .view()
                .into_dimensionality::<Ix3>()
                .map_err(|_| CoolToolsError::InvalidRank { ndim: 3 })?;
            for (index, plane) in stack.axis_iter(Axis(0)).enumerate() {
                let path = dir.join(format!("{stem}_{index:03}.{ext}"));
                write_plane(plane, dtype, &path, image_format)?;
                written.push(path);
            }
        }
        ndim => return Err(CoolToolsError::InvalidRank { ndim }),
    }

    info!(files = written.len(), "Layer saved");
    Ok(written)
}

fn write_plane(plane: ArrayView2<'_, f32>, dtype: Dtype, path: &Path, format: ImageFormat) -> Result<()> {
    let (height, width) = plane.dim();
    let (width, height) = (width as u32, height as u32);
    let dynamic = match dtype {
        Dtype::U8 => {
            let raw: Vec<u8> = plane.iter().map(|&v| v as u8).collect();
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, raw).map(DynamicImage::ImageLuma8)
        }
        Dtype::U16 | Dtype::F32 => {
            let raw: Vec<u16> = plane.iter().map(|&v| v.round().clamp(0.0, 65535.0) as u16).collect();
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, raw).map(DynamicImage::ImageLuma16)
        }
    }
    .ok_or_else(|| CoolToolsError::ImageError(format!("buffer does not fit {width}x{height}")))?;

    dynamic.save_with_format(path, format).map_err(|err| {
        CoolToolsError::ImageError(format!("failed to write {}: {}", path.display(), err))
    })?;
    debug!(path = %path.display(), "Plane written");
    Ok(())
}

/// File-system safe version of a layer name.
fn sanitize_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if stem.is_empty() { "layer".into() } else { stem }
}
