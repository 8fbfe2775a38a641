//! sRGB <-> CIE L*a*b* (D65) conversion for 8-bit pixels.

const XN: f32 = 0.950_456;
const ZN: f32 = 1.088_754;
const EPSILON: f32 = 0.008_856;
const KAPPA: f32 = 7.787;
const OFFSET: f32 = 16.0 / 116.0;

/// A colour in CIE L*a*b*, with `l` in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

impl Lab {
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        let (r, g, b) = (to_linear(r), to_linear(g), to_linear(b));

        let x = 0.412_453 * r + 0.357_580 * g + 0.180_423 * b;
        let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
        let z = 0.019_334 * r + 0.119_193 * g + 0.950_227 * b;

        let fx = f(x / XN);
        let fy = f(y);
        let fz = f(z / ZN);

        Self {
            l: (116.0 * fy - 16.0).max(0.0),
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }

    pub fn to_rgb(self) -> [u8; 3] {
        let fy = (self.l + 16.0) / 116.0;
        let fx = fy + self.a / 500.0;
        let fz = fy - self.b / 200.0;

        let x = XN * f_inv(fx);
        let y = f_inv(fy);
        let z = ZN * f_inv(fz);

        let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
        let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
        let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

        [from_linear(r), from_linear(g), from_linear(b)]
    }

    /// Lightness scaled to the 8-bit range.
    pub fn l_u8(self) -> u8 {
        (self.l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8
    }

    pub fn with_l_u8(self, l: u8) -> Self {
        Self {
            l: f32::from(l) * 100.0 / 255.0,
            ..self
        }
    }
}

fn f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        KAPPA * t + OFFSET
    }
}

fn f_inv(t: f32) -> f32 {
    let cube = t * t * t;
    if cube > EPSILON {
        cube
    } else {
        (t - OFFSET) / KAPPA
    }
}

fn to_linear(c: u8) -> f32 {
    let c = f32::from(c) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn from_linear(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let c = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(lhs: [u8; 3], rhs: [u8; 3]) -> bool {
        lhs.iter().zip(rhs).all(|(&a, b)| a.abs_diff(b) <= 1)
    }

    #[test]
    fn reference_colours() {
        let white = Lab::from_rgb([255, 255, 255]);
        assert!((white.l - 100.0).abs() < 0.1);
        assert!(white.a.abs() < 0.1 && white.b.abs() < 0.1);

        let black = Lab::from_rgb([0, 0, 0]);
        assert!(black.l.abs() < 0.1);

        // sRGB red is roughly L=53.2, a=80.1, b=67.2
        let red = Lab::from_rgb([255, 0, 0]);
        assert!((red.l - 53.2).abs() < 0.5);
        assert!((red.a - 80.1).abs() < 1.0);
        assert!((red.b - 67.2).abs() < 1.0);
    }

    #[test]
    fn conversion_is_stable_across_the_cube() {
        for r in (0..=255u8).step_by(17) {
            for g in (0..=255u8).step_by(17) {
                for b in (0..=255u8).step_by(17) {
                    let rgb = [r, g, b];
                    let back = Lab::from_rgb(rgb).to_rgb();
                    assert!(close(rgb, back), "{rgb:?} -> {back:?}");
                }
            }
        }
    }

    #[test]
    fn greys_have_no_chroma() {
        for v in [0u8, 40, 128, 200, 255] {
            let lab = Lab::from_rgb([v, v, v]);
            assert!(lab.a.abs() < 0.05 && lab.b.abs() < 0.05, "{v}: {lab:?}");
        }
    }
}
