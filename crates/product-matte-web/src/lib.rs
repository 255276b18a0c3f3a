//! WebAssembly bindings for the interactive background-removal preview
//!
//! The admin UI draws a photo onto a canvas, hands the `ImageData` bytes to
//! [`preview_remove_background`] and paints the result back. The passes are
//! the same `product_matte::matting` functions the batch processor runs.

use js_sys::Array;
use product_matte::{matting, ImagePreprocessor, Level, MatteError, PixelBuffer};
use wasm_bindgen::prelude::*;

/// Padding kept around the subject in preview crops
pub const PREVIEW_CROP_PADDING: u32 = 8;

/// Longest canvas side matted by the preview; larger canvases are downscaled first
pub const PREVIEW_MAX_SIDE: u32 = 1000;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

/// JavaScript-compatible error type for WASM
#[wasm_bindgen]
#[derive(Debug)]
pub struct WasmError {
    message: String,
}

#[wasm_bindgen]
impl WasmError {
    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

impl From<MatteError> for WasmError {
    fn from(err: MatteError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// RGBA pixels ready for `new ImageData(data, width, height)`
#[wasm_bindgen]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

#[wasm_bindgen]
impl PreviewImage {
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA8 bytes
    #[wasm_bindgen(getter)]
    pub fn data(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// Strip the backdrop from canvas pixels and crop to the subject
///
/// `level` is one of `"low"`, `"medium"` or `"high"`. `crop_padding`
/// defaults to [`PREVIEW_CROP_PADDING`] and `max_side` to [`PREVIEW_MAX_SIDE`].
#[wasm_bindgen]
pub fn preview_remove_background(
    data: Vec<u8>,
    width: u32,
    height: u32,
    level: &str,
    crop_padding: Option<u32>,
    max_side: Option<u32>,
) -> Result<PreviewImage, WasmError> {
    let preview = render_preview(data, width, height, level, crop_padding, max_side)?;
    console_log!(
        "product-matte preview: {}x{} -> {}x{} ({})",
        width,
        height,
        preview.width,
        preview.height,
        level
    );
    Ok(preview)
}

fn render_preview(
    data: Vec<u8>,
    width: u32,
    height: u32,
    level: &str,
    crop_padding: Option<u32>,
    max_side: Option<u32>,
) -> Result<PreviewImage, MatteError> {
    let level: Level = level.parse()?;
    let max_side = match max_side {
        Some(0) => {
            return Err(MatteError::config_value_error(
                "max side",
                0,
                "1 or more",
                Some(PREVIEW_MAX_SIDE),
            ))
        },
        other => other.unwrap_or(PREVIEW_MAX_SIDE),
    };
    let buffer = ImagePreprocessor::fit_buffer(
        PixelBuffer::new(width, height, data)?,
        Some(max_side),
    )?;

    let stripped = matting::remove_background(buffer, level);
    let cropped =
        matting::crop_to_content(stripped, crop_padding.unwrap_or(PREVIEW_CROP_PADDING));

    let (width, height) = cropped.dimensions();
    Ok(PreviewImage {
        width,
        height,
        data: cropped.into_raw(),
    })
}

/// Level names in the order the UI should list them
#[wasm_bindgen]
pub fn level_names() -> Array {
    [Level::Low, Level::Medium, Level::High]
        .iter()
        .map(|level| JsValue::from_str(level.as_str()))
        .collect()
}

#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
