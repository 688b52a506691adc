//! Draw targets for composed frames.

use std::path::Path;

use image::{Rgba, RgbaImage};
use storyreel_common::{StoryreelError, StoryreelResult};
use storyreel_motion_core::Transform;
use storyreel_project_model::RoiBox;

use crate::assets::DecodedAsset;
use crate::renderer::{FrameComposition, FrameContent, Overlay};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PLACEHOLDER: Rgba<u8> = Rgba([38, 38, 46, 255]);
const PLACEHOLDER_FAILED: Rgba<u8> = Rgba([92, 28, 32, 255]);
const ROI_OUTLINE: Rgba<u8> = Rgba([255, 196, 0, 255]);
const PROGRESS: Rgba<u8> = Rgba([235, 235, 235, 255]);
const PROGRESS_HEIGHT: u32 = 4;

/// Something a [`FrameComposition`] can be drawn onto.
pub trait Surface {
    /// Viewport size in pixels.
    fn size(&self) -> (u32, u32);

    fn draw(&mut self, frame: &FrameComposition) -> StoryreelResult<()>;
}

/// Software surface backed by an RGBA buffer.
///
/// Assets are cover-fitted to the viewport, then the motion transform is
/// applied about the viewport center with nearest-neighbour sampling.
/// Placeholder labels are not rasterized; the last one is kept for callers.
pub struct RasterSurface {
    canvas: RgbaImage,
    last_label: Option<String>,
    frames_drawn: u64,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND),
            last_label: None,
            frames_drawn: 0,
        }
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Label of the most recent placeholder frame, cleared by asset frames.
    pub fn last_label(&self) -> Option<&str> {
        self.last_label.as_deref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn save_png(&self, path: &Path) -> StoryreelResult<()> {
        self.canvas
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| StoryreelError::render(format!("{}: {e}", path.display())))
    }

    fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = color;
        }
    }

    fn draw_asset(&mut self, asset: &DecodedAsset, transform: &Transform) {
        let mapping = Mapping::new(self.size(), asset, transform);
        let source = &asset.image;
        let (src_w, src_h) = source.dimensions();

        for (x, y, pixel) in self.canvas.enumerate_pixels_mut() {
            let (sx, sy) = mapping.to_source(x as f64 + 0.5, y as f64 + 0.5);
            *pixel = if sx >= 0.0 && sy >= 0.0 && sx < src_w as f64 && sy < src_h as f64 {
                *source.get_pixel(sx as u32, sy as u32)
            } else {
                BACKGROUND
            };
        }
    }

    fn draw_overlay(&mut self, overlay: &Overlay, mapping: Option<Mapping>) {
        if let (Some(roi), Some(mapping)) = (overlay.roi, mapping) {
            self.outline_roi(&roi, &mapping);
        }

        let (width, height) = self.size();
        let fraction = if overlay.total_secs > 0.0 {
            (overlay.elapsed_secs / overlay.total_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let filled = (fraction * width as f64).round() as u32;
        for y in height.saturating_sub(PROGRESS_HEIGHT)..height {
            for x in 0..filled.min(width) {
                self.canvas.put_pixel(x, y, PROGRESS);
            }
        }
    }

    fn outline_roi(&mut self, roi: &RoiBox, mapping: &Mapping) {
        let (x0, y0) = mapping.to_canvas(roi.xmin(), roi.ymin());
        let (x1, y1) = mapping.to_canvas(roi.xmax(), roi.ymax());
        let (width, height) = self.size();
        let clamp_x = |v: f64| v.round().clamp(0.0, (width - 1) as f64) as u32;
        let clamp_y = |v: f64| v.round().clamp(0.0, (height - 1) as f64) as u32;
        let (left, right) = (clamp_x(x0.min(x1)), clamp_x(x0.max(x1)));
        let (top, bottom) = (clamp_y(y0.min(y1)), clamp_y(y0.max(y1)));

        for x in left..=right {
            self.canvas.put_pixel(x, top, ROI_OUTLINE);
            self.canvas.put_pixel(x, bottom, ROI_OUTLINE);
        }
        for y in top..=bottom {
            self.canvas.put_pixel(left, y, ROI_OUTLINE);
            self.canvas.put_pixel(right, y, ROI_OUTLINE);
        }
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn draw(&mut self, frame: &FrameComposition) -> StoryreelResult<()> {
        let mut mapping = None;
        match &frame.content {
            FrameContent::Blank => {
                self.fill(BACKGROUND);
                self.last_label = None;
            }
            FrameContent::Placeholder { label, failed } => {
                self.fill(if *failed { PLACEHOLDER_FAILED } else { PLACEHOLDER });
                self.last_label = Some(label.clone());
            }
            FrameContent::Asset { asset, transform } => {
                self.draw_asset(asset, transform);
                self.last_label = None;
                mapping = Some(Mapping::new(self.size(), asset, transform));
            }
        }

        if let Some(overlay) = &frame.overlay {
            self.draw_overlay(overlay, mapping);
        }
        self.frames_drawn += 1;
        Ok(())
    }
}

/// Canvas ↔ source pixel mapping for one asset frame.
///
/// The transform is `scale(s) translate(tx%, ty%)` about the canvas center:
/// a source point `p` (centered, cover-fitted) lands at `s · (p + t)`.
#[derive(Debug, Clone, Copy)]
struct Mapping {
    canvas_w: f64,
    canvas_h: f64,
    src_w: f64,
    src_h: f64,
    cover: f64,
    transform: Transform,
}

impl Mapping {
    fn new((width, height): (u32, u32), asset: &DecodedAsset, transform: &Transform) -> Self {
        let (canvas_w, canvas_h) = (width as f64, height as f64);
        let (src_w, src_h) = (asset.width().max(1) as f64, asset.height().max(1) as f64);
        Self {
            canvas_w,
            canvas_h,
            src_w,
            src_h,
            cover: (canvas_w / src_w).max(canvas_h / src_h),
            transform: *transform,
        }
    }

    fn offset(&self) -> (f64, f64) {
        (
            self.transform.translate_x / 100.0 * self.canvas_w,
            self.transform.translate_y / 100.0 * self.canvas_h,
        )
    }

    /// Canvas pixel → source pixel.
    fn to_source(&self, cx: f64, cy: f64) -> (f64, f64) {
        let (tx, ty) = self.offset();
        let px = (cx - self.canvas_w / 2.0) / self.transform.scale - tx;
        let py = (cy - self.canvas_h / 2.0) / self.transform.scale - ty;
        (
            px / self.cover + self.src_w / 2.0,
            py / self.cover + self.src_h / 2.0,
        )
    }

    /// Normalized source point → canvas pixel.
    fn to_canvas(&self, nx: f64, ny: f64) -> (f64, f64) {
        let (tx, ty) = self.offset();
        let px = (nx * self.src_w - self.src_w / 2.0) * self.cover;
        let py = (ny * self.src_h - self.src_h / 2.0) * self.cover;
        (
            self.transform.scale * (px + tx) + self.canvas_w / 2.0,
            self.transform.scale * (py + ty) + self.canvas_h / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storyreel_project_model::MediaKind;

    /// 4x2 source: left half red, right half blue.
    fn split_asset() -> Arc<DecodedAsset> {
        let image = RgbaImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        Arc::new(DecodedAsset {
            kind: MediaKind::Image,
            image,
        })
    }

    fn asset_frame(transform: Transform, overlay: Option<Overlay>) -> FrameComposition {
        FrameComposition {
            time_secs: 0.0,
            segment_index: Some(0),
            content: FrameContent::Asset {
                asset: split_asset(),
                transform,
            },
            overlay,
        }
    }

    #[test]
    fn test_identity_cover_fits_source() {
        let mut surface = RasterSurface::new(8, 4);
        surface.draw(&asset_frame(Transform::IDENTITY, None)).unwrap();
        assert_eq!(*surface.canvas().get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*surface.canvas().get_pixel(7, 3), Rgba([0, 0, 255, 255]));
        assert_eq!(surface.frames_drawn(), 1);
    }

    #[test]
    fn test_cover_fit_crops_the_long_axis() {
        // Square viewport over a 2:1 source keeps the middle half.
        let mut surface = RasterSurface::new(4, 4);
        surface.draw(&asset_frame(Transform::IDENTITY, None)).unwrap();
        assert_eq!(*surface.canvas().get_pixel(0, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(*surface.canvas().get_pixel(3, 2), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_translate_shifts_content() {
        // A quarter-frame shift right exposes the left edge and pulls red
        // past the center.
        let mut surface = RasterSurface::new(8, 4);
        let transform = Transform {
            scale: 1.0,
            translate_x: 25.0,
            translate_y: 0.0,
        };
        surface.draw(&asset_frame(transform, None)).unwrap();
        assert_eq!(*surface.canvas().get_pixel(0, 1), BACKGROUND);
        assert_eq!(*surface.canvas().get_pixel(5, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_placeholder_keeps_label() {
        let mut surface = RasterSurface::new(4, 4);
        let frame = FrameComposition {
            time_secs: 1.0,
            segment_index: Some(2),
            content: FrameContent::Placeholder {
                label: "Unavailable: c.jpg".to_string(),
                failed: true,
            },
            overlay: None,
        };
        surface.draw(&frame).unwrap();
        assert_eq!(surface.last_label(), Some("Unavailable: c.jpg"));
        assert_eq!(*surface.canvas().get_pixel(1, 1), PLACEHOLDER_FAILED);

        surface.draw(&asset_frame(Transform::IDENTITY, None)).unwrap();
        assert_eq!(surface.last_label(), None);
    }

    #[test]
    fn test_overlay_draws_roi_and_progress() {
        let mut surface = RasterSurface::new(8, 8);
        let overlay = Overlay {
            label: "1/1 a.jpg [subtle]".to_string(),
            roi: Some(RoiBox::new(0.25, 0.0, 0.75, 1.0).unwrap()),
            elapsed_secs: 1.0,
            total_secs: 2.0,
        };
        surface
            .draw(&asset_frame(Transform::IDENTITY, Some(overlay)))
            .unwrap();
        // After cover-fit the ROI is larger than the viewport and clamps to
        // its edges.
        assert_eq!(*surface.canvas().get_pixel(0, 2), ROI_OUTLINE);
        assert_eq!(*surface.canvas().get_pixel(3, 7), PROGRESS);
        assert_ne!(*surface.canvas().get_pixel(6, 7), PROGRESS);
    }

    #[test]
    fn test_mapping_round_trips_center() {
        let asset = split_asset();
        let transform = Transform {
            scale: 1.15,
            translate_x: 3.0,
            translate_y: -2.0,
        };
        let mapping = Mapping::new((16, 9), &asset, &transform);
        let (cx, cy) = mapping.to_canvas(0.3, 0.6);
        let (sx, sy) = mapping.to_source(cx, cy);
        assert!((sx - 0.3 * 4.0).abs() < 1e-9);
        assert!((sy - 0.6 * 2.0).abs() < 1e-9);
    }
}
