//! Pixel boxes and the scaling between image frames.

use crate::error::{Error, Result};

/// Image or box size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HW {
    h: f64,
    w: f64,
}

impl HW {
    pub fn try_from_hw(hw: [f64; 2]) -> Result<Self> {
        let [h, w] = hw;
        if !(h >= 0.0 && w >= 0.0) {
            return Err(Error::invalid_box(format!(
                "height and width must be non-negative, but get h={} w={}",
                h, w
            )));
        }
        Ok(Self { h, w })
    }

    pub fn square(size: f64) -> Result<Self> {
        Self::try_from_hw([size, size])
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn w(&self) -> f64 {
        self.w
    }

    pub fn area(&self) -> f64 {
        self.h * self.w
    }
}

/// Bounding box in TLBR format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TLBR {
    t: f64,
    l: f64,
    b: f64,
    r: f64,
}

impl TLBR {
    pub fn try_from_tlbr(tlbr: [f64; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        if !(b >= t && r >= l) {
            return Err(Error::invalid_box(format!(
                "b >= t and r >= l must hold, but get t={} l={} b={} r={}",
                t, l, b, r
            )));
        }
        Ok(Self { t, l, b, r })
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn l(&self) -> f64 {
        self.l
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn cy(&self) -> f64 {
        (self.t + self.b) / 2.0
    }

    pub fn cx(&self) -> f64 {
        (self.l + self.r) / 2.0
    }

    pub fn h(&self) -> f64 {
        self.b - self.t
    }

    pub fn w(&self) -> f64 {
        self.r - self.l
    }

    pub fn area(&self) -> f64 {
        self.h() * self.w()
    }
}

/// Per-axis affine transform between two frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub sy: f64,
    pub sx: f64,
    pub ty: f64,
    pub tx: f64,
}

impl Transform {
    /// Stretch the `src` frame onto the `tgt` frame without keeping the aspect ratio.
    pub fn from_sizes_exact(src: &HW, tgt: &HW) -> Result<Self> {
        if !(src.h() > 0.0 && src.w() > 0.0) {
            return Err(Error::invalid_box(format!(
                "source size must be positive, but get {:?}",
                src
            )));
        }

        Ok(Self {
            sy: tgt.h() / src.h(),
            sx: tgt.w() / src.w(),
            ty: 0.0,
            tx: 0.0,
        })
    }

    pub fn apply(&self, rect: &TLBR) -> TLBR {
        let Self { sy, sx, ty, tx } = *self;

        // scales are positive, so the corner order survives
        TLBR {
            t: rect.t * sy + ty,
            l: rect.l * sx + tx,
            b: rect.b * sy + ty,
            r: rect.r * sx + tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn size_area() {
        let size = HW::try_from_hw([3.0, 2.0]).unwrap();
        assert_abs_diff_eq!(size.area(), 6.0);
        assert!(HW::try_from_hw([-1.0, 2.0]).is_err());
    }

    #[test]
    fn degenerate_box_rejected() {
        assert!(TLBR::try_from_tlbr([10.0, 10.0, 5.0, 20.0]).is_err());
        assert!(TLBR::try_from_tlbr([10.0, 10.0, 20.0, 5.0]).is_err());
        assert!(TLBR::try_from_tlbr([f64::NAN, 0.0, 1.0, 1.0]).is_err());

        let rect = TLBR::try_from_tlbr([10.0, 10.0, 10.0, 30.0]).unwrap();
        assert_abs_diff_eq!(rect.h(), 0.0);
        assert_abs_diff_eq!(rect.w(), 20.0);
    }

    #[test]
    fn rect_resize_exact() {
        let src = HW::try_from_hw([80.0, 80.0]).unwrap();
        let tgt = HW::try_from_hw([20.0, 40.0]).unwrap();
        let transform = Transform::from_sizes_exact(&src, &tgt).unwrap();
        let expect = Transform {
            sy: 0.25,
            sx: 0.5,
            ty: 0.0,
            tx: 0.0,
        };
        assert_eq!(transform, expect);

        let rect = TLBR::try_from_tlbr([8.0, 8.0, 40.0, 24.0]).unwrap();
        let rect = transform.apply(&rect);
        assert_abs_diff_eq!(rect.cy(), 6.0);
        assert_abs_diff_eq!(rect.cx(), 8.0);
        assert_abs_diff_eq!(rect.h(), 8.0);
        assert_abs_diff_eq!(rect.w(), 8.0);
    }

    #[test]
    fn zero_source_size_rejected() {
        let src = HW::try_from_hw([0.0, 10.0]).unwrap();
        let tgt = HW::square(448.0).unwrap();
        assert!(Transform::from_sizes_exact(&src, &tgt).is_err());
    }
}
