// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: image buffers, their numeric type, and viewer layers.

use std::collections::BTreeMap;

use ndarray::{Array2, Array3, ArrayD};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a viewer layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric type the pixel values originated from.
///
/// Buffers are always held as `f32`; the tag records which integer or float
/// range the values live in so operations can convert to and from unit floats
/// the way array libraries do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    U8,
    U16,
    F32,
}

impl Dtype {
    /// Intensity limits of the type. Float images use `(-1, 1)`.
    pub fn limits(self) -> (f32, f32) {
        match self {
            Self::U8 => (0.0, u8::MAX as f32),
            Self::U16 => (0.0, u16::MAX as f32),
            Self::F32 => (-1.0, 1.0),
        }
    }

    /// Divisor that maps the type's positive range onto `[0, 1]`.
    pub fn float_scale(self) -> f32 {
        match self {
            Self::U8 => u8::MAX as f32,
            Self::U16 => u16::MAX as f32,
            Self::F32 => 1.0,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32)
    }

    /// Convert a value into this type: truncate toward zero and saturate for
    /// integer types, pass floats through. NaN becomes 0 for integers.
    pub fn saturate(self, value: f32) -> f32 {
        if !self.is_integer() {
            return value;
        }
        if value.is_nan() {
            return 0.0;
        }
        let (lo, hi) = self.limits();
        value.trunc().clamp(lo, hi)
    }

    /// Map a unit-range value onto the full range of this type.
    pub fn from_unit(self, value: f32) -> f32 {
        match self {
            Self::F32 => value,
            _ => self.saturate((value * self.float_scale()).round()),
        }
    }
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::F32 => "float32",
        };
        f.write_str(label)
    }
}

/// Which implementation family runs an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Array-library conventions, slices processed one after another.
    #[default]
    Cpu,
    /// Tensor-library conventions, slices processed in parallel.
    Accelerated,
}

/// An in-memory image buffer: a single image `(H, W)` or a stack
/// `(N, H, W)` whose first axis is the slice index.
///
/// The rank is not restricted at construction; operations reject anything
/// other than 2 or 3 axes before computing.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    array: ArrayD<f32>,
    dtype: Dtype,
}

impl ImageData {
    pub fn new(array: ArrayD<f32>, dtype: Dtype) -> Self {
        Self { array, dtype }
    }

    /// Wrap a single 2D image.
    pub fn from_plane(plane: Array2<f32>, dtype: Dtype) -> Self {
        Self::new(plane.into_dyn(), dtype)
    }

    /// Wrap a stack of images, axis 0 being the slice index.
    pub fn from_stack(stack: Array3<f32>, dtype: Dtype) -> Self {
        Self::new(stack.into_dyn(), dtype)
    }

    pub fn ndim(&self) -> usize {
        self.array.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.array.shape()
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn array(&self) -> &ArrayD<f32> {
        &self.array
    }

    pub fn into_array(self) -> ArrayD<f32> {
        self.array
    }

    /// Smallest and largest finite value, or `None` when there is none.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.array
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn has_negative(&self) -> bool {
        self.array.iter().any(|&v| v < 0.0)
    }

    /// Values divided by the dtype's float scale (`img_as_float` semantics).
    pub fn to_unit_float(&self) -> ArrayD<f32> {
        let scale = self.dtype.float_scale();
        self.array.mapv(|v| v / scale)
    }

    /// Convert to another dtype with truncating, saturating semantics.
    pub fn cast(&self, dtype: Dtype) -> Self {
        Self {
            array: self.array.mapv(|v| dtype.saturate(v)),
            dtype,
        }
    }
}

/// Kind of displayable layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    Image,
}

/// A named, typed, displayable image buffer tracked by the viewer.
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub data: ImageData,
    /// Free-form annotations (`operation`, `source`, ...).
    pub metadata: BTreeMap<String, String>,
}

impl Layer {
    /// Build a new image layer with a fresh id.
    pub fn create(data: ImageData, name: impl Into<String>) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            kind: LayerKind::Image,
            data,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Name of a layer derived from this one: the source name followed by
    /// `suffix`.
    pub fn derived_name(&self, suffix: &str) -> String {
        format!("{}{}", self.name, suffix)
    }
}
