//! Target-size math for resizing and page layout.
//!
//! Two constraints are supported:
//! - [`compute_render_target`] caps the *width* only (the resize/convert tools)
//! - [`fit_within`] caps the *longest edge* (document pages)
//!
//! Both preserve aspect ratio within one pixel and never produce a zero-sized
//! dimension. Rounding is half-up and done in integer arithmetic so results
//! are identical on every host.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when an image reports a zero width or height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid image geometry: {width}x{height} (both dimensions must be non-zero)")]
pub struct InvalidImageError {
    pub width: u32,
    pub height: u32,
}

/// Pixel dimensions an image should be rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
}

/// Compute the render size for an image given a maximum width.
///
/// # Arguments
///
/// * `native_width` - Decoded image width in pixels
/// * `native_height` - Decoded image height in pixels
/// * `max_width` - Maximum output width; `0` means unconstrained
///
/// # Returns
///
/// The native dimensions if no constraint applies, otherwise a target with
/// `width == max_width` and the height scaled proportionally.
///
/// # Errors
///
/// Returns `InvalidImageError` if either native dimension is zero.
pub fn compute_render_target(
    native_width: u32,
    native_height: u32,
    max_width: u32,
) -> Result<RenderTarget, InvalidImageError> {
    validate(native_width, native_height)?;

    if max_width > 0 && native_width > max_width {
        let height = scale_round(native_height, max_width, native_width);
        return Ok(RenderTarget {
            width: max_width,
            height: height.max(1),
        });
    }

    Ok(RenderTarget {
        width: native_width,
        height: native_height,
    })
}

/// Fit dimensions inside a `max_dim x max_dim` box, preserving aspect ratio.
///
/// Dimensions already inside the box are returned unchanged. Otherwise the
/// longer side becomes `max_dim` and the shorter is rounded; square inputs
/// become `max_dim x max_dim`.
///
/// # Errors
///
/// Returns `InvalidImageError` if either dimension is zero.
pub fn fit_within(
    width: u32,
    height: u32,
    max_dim: u32,
) -> Result<RenderTarget, InvalidImageError> {
    validate(width, height)?;

    if max_dim == 0 || width.max(height) <= max_dim {
        return Ok(RenderTarget { width, height });
    }

    let target = if width > height {
        RenderTarget {
            width: max_dim,
            height: scale_round(height, max_dim, width).max(1),
        }
    } else {
        RenderTarget {
            width: scale_round(width, max_dim, height).max(1),
            height: max_dim,
        }
    };

    Ok(target)
}

fn validate(width: u32, height: u32) -> Result<(), InvalidImageError> {
    if width == 0 || height == 0 {
        return Err(InvalidImageError { width, height });
    }
    Ok(())
}

/// `round(value * numerator / denominator)`, half-up.
fn scale_round(value: u32, numerator: u32, denominator: u32) -> u32 {
    let num = u64::from(value) * u64::from(numerator);
    let den = u64::from(denominator);
    ((num * 2 + den) / (den * 2)) as u32
}


// ============================================================================
// Property-Based Tests
// ============================================================================
