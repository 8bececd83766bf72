/// Axis-aligned bounding box with format conversion utilities.
///
/// Stored as TLWH. Supports the formats the tracker needs:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
/// - XYSR: Center X, Center Y, Area (w*h), Aspect Ratio (w/h)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from XYSR format (center x, center y, area, aspect ratio).
    ///
    /// A negative area or aspect yields NaN dimensions; callers check
    /// [`Rect::is_finite`] before using the result.
    #[inline]
    pub fn from_xysr(cx: f64, cy: f64, area: f64, aspect_ratio: f64) -> Self {
        let width = (area * aspect_ratio).sqrt();
        let height = area / width;
        Self {
            x: (cx - width / 2.0) as f32,
            y: (cy - height / 2.0) as f32,
            width: width as f32,
            height: height as f32,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Convert to XYSR format: (center_x, center_y, area, aspect_ratio).
    #[inline]
    pub fn to_xysr(&self) -> [f64; 4] {
        let (cx, cy) = self.center();
        let aspect_ratio = if self.height > 0.0 {
            self.width as f64 / self.height as f64
        } else {
            0.0
        };
        [cx as f64, cy as f64, self.area() as f64, aspect_ratio]
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Midpoint of the left edge.
    #[inline]
    pub fn center_left(&self) -> (f32, f32) {
        (self.x, self.y + self.height / 2.0)
    }

    /// Midpoint of the right edge.
    #[inline]
    pub fn center_right(&self) -> (f32, f32) {
        (self.x + self.width, self.y + self.height / 2.0)
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter_width = (x2 - x1).max(0.0);
        let inter_height = (y2 - y1).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }

    /// Distance-IoU: IoU minus the squared center distance normalized by the
    /// squared diagonal of the smallest enclosing box. Range `(-1, 1]`.
    pub fn diou(&self, other: &Rect) -> f32 {
        let iou = self.iou(other);
        iou - self.center_penalty(other)
    }

    /// Complete-IoU: DIoU with an additional aspect-ratio consistency penalty.
    pub fn ciou(&self, other: &Rect) -> f32 {
        let iou = self.iou(other);
        let center_penalty = self.center_penalty(other);

        let v = if self.height > 0.0 && other.height > 0.0 {
            let diff = (other.width / other.height).atan() - (self.width / self.height).atan();
            4.0 / (std::f32::consts::PI * std::f32::consts::PI) * diff * diff
        } else {
            0.0
        };
        let denom = 1.0 - iou + v;
        let alpha = if denom > 0.0 { v / denom } else { 0.0 };

        iou - center_penalty - alpha * v
    }

    fn center_penalty(&self, other: &Rect) -> f32 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        let rho2 = (ax - bx).powi(2) + (ay - by).powi(2);

        let ex1 = self.x.min(other.x);
        let ey1 = self.y.min(other.y);
        let ex2 = (self.x + self.width).max(other.x + other.width);
        let ey2 = (self.y + self.height).max(other.y + other.height);
        let c2 = (ex2 - ex1).powi(2) + (ey2 - ey1).powi(2);

        if c2 > 0.0 { rho2 / c2 } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_format_conversions() {
        let rect = Rect::from_tlbr(10.0, 20.0, 40.0, 60.0);
        assert_eq!(rect, Rect::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);

        let [cx, cy, s, r] = rect.to_xysr();
        assert_relative_eq!(cx, 25.0);
        assert_relative_eq!(cy, 40.0);
        assert_relative_eq!(s, 1200.0);
        assert_relative_eq!(r, 0.75, epsilon = 1e-6);

        assert_eq!(rect.center_left(), (10.0, 40.0));
        assert_eq!(rect.center_right(), (40.0, 40.0));
    }

    #[test]
    fn test_xysr_round_trip() {
        let rect = Rect::from_tlbr(0.0, 0.0, 10.0, 10.0);
        let [cx, cy, s, r] = rect.to_xysr();
        let back = Rect::from_xysr(cx, cy, s, r);
        assert_relative_eq!(back.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(back.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(back.width, 10.0, epsilon = 1e-4);
        assert_relative_eq!(back.height, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_negative_area_is_not_finite() {
        let rect = Rect::from_xysr(5.0, 5.0, -4.0, 1.0);
        assert!(!rect.is_finite());
    }

    #[rstest]
    #[case::partial(Rect::new(5.0, 5.0, 10.0, 10.0), 25.0 / 175.0)]
    #[case::disjoint(Rect::new(20.0, 20.0, 10.0, 10.0), 0.0)]
    #[case::identical(Rect::new(0.0, 0.0, 10.0, 10.0), 1.0)]
    #[case::contained(Rect::new(2.5, 2.5, 5.0, 5.0), 0.25)]
    fn test_iou(#[case] other: Rect, #[case] expected: f32) {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(a.iou(&other), expected, epsilon = 1e-6);
        assert_relative_eq!(other.iou(&a), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_penalties_vanish_for_identical_boxes() {
        let a = Rect::new(3.0, 4.0, 12.0, 6.0);
        assert_relative_eq!(a.diou(&a), 1.0, epsilon = 1e-6);
        assert_relative_eq!(a.ciou(&a), 1.0, epsilon = 1e-6);
    }

    #[rstest]
    #[case(Rect::new(5.0, 5.0, 10.0, 10.0))]
    #[case(Rect::new(2.0, 0.0, 10.0, 20.0))]
    #[case(Rect::new(30.0, 40.0, 5.0, 5.0))]
    #[case(Rect::new(-3.0, 1.0, 12.0, 7.0))]
    fn test_penalized_variants_bounded_by_iou(#[case] other: Rect) {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let iou = a.iou(&other);
        assert!(a.diou(&other) <= iou + 1e-6);
        assert!(a.ciou(&other) <= a.diou(&other) + 1e-6);
    }

    #[test]
    fn test_distant_boxes_go_negative() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(100.0, 100.0, 10.0, 10.0);
        assert!(a.diou(&b) < 0.0);
        assert!(a.ciou(&b) < 0.0);
    }
}
