//! Contrast Limited Adaptive Histogram Equalization.
//!
//! The image is cut into a grid of tiles. Every tile gets its own histogram,
//! clipped at `clip_limit` times the mean bin height, with the clipped excess
//! spread back over all bins. The clipped cumulative histogram becomes the
//! tile's lookup table, and each pixel is mapped by bilinear interpolation
//! between the tables of the four nearest tile centres.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::{Error, Lab, Result};

const BINS: usize = 256;

type Lut = [u8; BINS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    pub cols: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clahe {
    pub clip_limit: f32,
    pub tiles: TileGrid,
}

impl Default for Clahe {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles: TileGrid { cols: 8, rows: 8 },
        }
    }
}

impl Clahe {
    pub fn new(clip_limit: f32, cols: u32, rows: u32) -> Result<Self> {
        let clahe = Self {
            clip_limit,
            tiles: TileGrid { cols, rows },
        };
        clahe.validate()?;
        Ok(clahe)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.clip_limit.is_finite() || self.clip_limit <= 0.0 {
            return Err(Error::invalid_options(format!(
                "clip limit must be positive, got {}",
                self.clip_limit
            )));
        }
        if self.tiles.cols == 0 || self.tiles.rows == 0 {
            return Err(Error::invalid_options(format!(
                "tile grid must be non-empty, got {}x{}",
                self.tiles.cols, self.tiles.rows
            )));
        }
        Ok(())
    }

    pub fn apply_luma(&self, img: &GrayImage) -> Result<GrayImage> {
        self.validate()?;
        let (width, height) = img.dimensions();
        let out = self.equalize(width, height, img.as_raw());
        GrayImage::from_raw(width, height, out)
            .ok_or_else(|| Error::invalid_options("equalized buffer size mismatch"))
    }

    /// Equalizes the L* channel only, keeping a* and b*, so hues are preserved.
    pub fn apply_rgb(&self, img: &RgbImage) -> Result<RgbImage> {
        self.validate()?;
        let (width, height) = img.dimensions();

        let labs: Vec<Lab> = img.pixels().map(|p| Lab::from_rgb(p.0)).collect();
        let lightness: Vec<u8> = labs.iter().map(|lab| lab.l_u8()).collect();
        let lightness = self.equalize(width, height, &lightness);

        let mut out = RgbImage::new(width, height);
        for ((pixel, lab), l) in out.pixels_mut().zip(labs).zip(lightness) {
            pixel.0 = lab.with_l_u8(l).to_rgb();
        }
        Ok(out)
    }

    fn equalize(&self, width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let (width, height) = (width as usize, height as usize);
        debug_assert_eq!(pixels.len(), width * height);

        let grid = Grid::new(width, height, self.tiles);
        let luts = grid.luts(pixels, self.clip_limit);

        let xs: Vec<Span> = (0..width)
            .map(|x| Span::new(x, grid.tile_w, grid.cols))
            .collect();

        let mut out = vec![0u8; pixels.len()];
        for y in 0..height {
            let sy = Span::new(y, grid.tile_h, grid.rows);
            let top = &luts[sy.lo * grid.cols..][..grid.cols];
            let bottom = &luts[sy.hi * grid.cols..][..grid.cols];
            let row = y * width;
            for (x, sx) in xs.iter().enumerate() {
                let v = pixels[row + x] as usize;
                let upper = lerp(top[sx.lo][v], top[sx.hi][v], sx.frac);
                let lower = lerp(bottom[sx.lo][v], bottom[sx.hi][v], sx.frac);
                out[row + x] = (upper * (1.0 - sy.frac) + lower * sy.frac)
                    .round()
                    .clamp(0.0, 255.0) as u8;
            }
        }
        out
    }
}

/// Tile layout over an image. The grid always has the requested number of
/// equally sized tiles; when the image does not divide evenly it is extended
/// past its right and bottom edges by mirroring (`dcb|abcd|cba`).
#[derive(Debug, Clone, Copy)]
struct Grid {
    width: usize,
    height: usize,
    tile_w: usize,
    tile_h: usize,
    cols: usize,
    rows: usize,
}

impl Grid {
    fn new(width: usize, height: usize, tiles: TileGrid) -> Self {
        let (cols, rows) = (tiles.cols as usize, tiles.rows as usize);
        Self {
            width,
            height,
            tile_w: width.div_ceil(cols),
            tile_h: height.div_ceil(rows),
            cols,
            rows,
        }
    }

    fn luts(&self, pixels: &[u8], clip_limit: f32) -> Vec<Lut> {
        let area = (self.tile_w * self.tile_h) as u32;
        let mut luts = Vec::with_capacity(self.rows * self.cols);
        for ty in 0..self.rows {
            let y0 = ty * self.tile_h;
            for tx in 0..self.cols {
                let x0 = tx * self.tile_w;

                let mut hist = [0u32; BINS];
                for y in y0..y0 + self.tile_h {
                    let row = mirror(y, self.height) * self.width;
                    for x in x0..x0 + self.tile_w {
                        hist[pixels[row + mirror(x, self.width)] as usize] += 1;
                    }
                }
                clip_histogram(&mut hist, clip_limit, area);
                luts.push(cumulative_lut(&hist, area));
            }
        }
        luts
    }
}

/// Index into `0..len` for a position past the end, reflecting without
/// repeating the border pixel.
fn mirror(pos: usize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let pos = pos % period;
    if pos < len {
        pos
    } else {
        period - pos
    }
}

/// Position of a coordinate between two neighbouring tile centres.
#[derive(Debug, Clone, Copy)]
struct Span {
    lo: usize,
    hi: usize,
    frac: f32,
}

impl Span {
    fn new(pos: usize, tile: usize, count: usize) -> Self {
        let t = pos as f32 / tile as f32 - 0.5;
        let lo = t.floor();
        let frac = t - lo;
        let lo = lo as isize;
        let last = count as isize - 1;
        Self {
            lo: lo.clamp(0, last) as usize,
            hi: (lo + 1).clamp(0, last) as usize,
            frac,
        }
    }
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    f32::from(a) * (1.0 - t) + f32::from(b) * t
}

fn clip_histogram(hist: &mut [u32; BINS], clip_limit: f32, area: u32) {
    let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / BINS as u32;
    let mut residual = excess as usize - batch as usize * BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }
}

fn cumulative_lut(hist: &[u32; BINS], area: u32) -> Lut {
    let scale = (BINS - 1) as f32 / area as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist) {
        sum += count;
        *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
