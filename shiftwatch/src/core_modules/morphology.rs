// THEORY:
// Grayscale morphology on foreground masks. The extractor needs exactly two
// compound operations: an opening (erode, then dilate) that deletes isolated
// speckles smaller than the structuring element, and a closing (dilate, then
// erode) that fills pinholes and hairline gaps inside real silhouettes.
//
// Pixels outside the image never influence the result: erosion ignores them
// (as if they were maximal) and dilation ignores them (as if they were zero).

use image::GrayImage;

/// The set of neighbour offsets covered by an elliptical kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// An ellipse inscribed in a `size` x `size` square. For `size == 5` this is
    /// the familiar rounded cross: full middle three rows, single centre pixel
    /// on the top and bottom rows.
    pub fn ellipse(size: u32) -> Self {
        let size = size.max(1);
        let r = (size / 2) as i32;
        let c = (size / 2) as i32;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut offsets = Vec::new();
        for i in 0..size as i32 {
            let dy = i - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
            let j1 = (c - dx).max(0);
            let j2 = (c + dx + 1).min(size as i32);
            for j in j1..j2 {
                offsets.push((j - c, dy));
            }
        }
        Self { size, offsets }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

pub fn erode(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    apply_kernel(mask, element, u8::MAX, u8::min)
}

pub fn dilate(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    apply_kernel(mask, element, u8::MIN, u8::max)
}

/// Erode then dilate: removes specks smaller than the kernel.
pub fn open(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    dilate(&erode(mask, element), element)
}

/// Dilate then erode: fills holes smaller than the kernel.
pub fn close(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    erode(&dilate(mask, element), element)
}

fn apply_kernel(
    mask: &GrayImage,
    element: &StructuringElement,
    identity: u8,
    combine: fn(u8, u8) -> u8,
) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut out = GrayImage::new(width, height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let mut acc = identity;
            for &(dx, dy) in element.offsets() {
                let nx = x + dx;
                let ny = y + dy;
                if nx >= 0 && nx < width as i32 && ny >= 0 && ny < height as i32 {
                    acc = combine(acc, mask.get_pixel(nx as u32, ny as u32)[0]);
                }
            }
            out.put_pixel(x as u32, y as u32, image::Luma([acc]));
        }
    }
    out
}
