//! Azimuthal integration windows around the 0° and 90° axes.
//!
//! The integrator works on a circular azimuthal domain expressed in degrees
//! on [-180, 180]. A band centred on 0° fits in one window, while the
//! antipodal band centred on 180° has to be split into two half-windows that
//! meet at the ±180° seam. Intensities of every window belonging to one axis
//! are summed point by point onto a single 2θ grid.

/// Largest aperture accepted; wider openings are clamped.
pub const MAX_APERTURE_DEG: u32 = 90;

/// One of the two orthogonal axes of a partial integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal axis, 0° and its antipode 180°.
    Zero,
    /// Vertical axis, +90° and -90°.
    Ninety,
}

impl Axis {
    /// Both axes, in output order.
    pub const ALL: [Axis; 2] = [Axis::Zero, Axis::Ninety];

    /// Nominal direction in degrees, as used in output names.
    #[inline]
    pub fn degrees(self) -> u32 {
        match self {
            Axis::Zero => 0,
            Axis::Ninety => 90,
        }
    }
}

/// Map an axis index onto its direction: 0 is 0°, anything else 90°.
#[inline]
pub fn axis_label(index: usize) -> u32 {
    if index == 0 {
        Axis::Zero.degrees()
    } else {
        Axis::Ninety.degrees()
    }
}

/// Azimuthal bounds handed to the integrator, in degrees.
///
/// `start` may be greater than `end` for the half-window that runs from the
/// seam back to -180°.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleWindow {
    pub start: f64,
    pub end: f64,
}

impl AngleWindow {
    #[inline]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Angular extent covered by the window.
    #[inline]
    pub fn span(&self) -> f64 {
        (self.end - self.start).abs()
    }
}

/// The ordered windows covering one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisWindowSet {
    pub axis: Axis,
    pub windows: Vec<AngleWindow>,
}

impl AxisWindowSet {
    /// Total angular coverage of the set.
    pub fn coverage(&self) -> f64 {
        self.windows.iter().map(AngleWindow::span).sum()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Clamp an aperture to [`MAX_APERTURE_DEG`].
#[inline]
pub fn clamp_aperture(aperture: u32) -> u32 {
    aperture.min(MAX_APERTURE_DEG)
}

/// Build the integration windows for both axes.
///
/// With `h = aperture / 2`:
/// - axis 0: `(-h, h)`, `(180 - h, 180)`, `(-180 + h, -180)`
/// - axis 90: `(90 - h, 90 + h)`, `(-90 - h, -90 + h)`
///
/// # Example
///
/// ```
/// use integxr::core::windows::build_windows;
///
/// let (axis0, axis90) = build_windows(30);
/// assert_eq!(axis0.windows.len(), 3);
/// assert_eq!(axis90.coverage(), 60.0);
/// ```
pub fn build_windows(aperture: u32) -> (AxisWindowSet, AxisWindowSet) {
    let half = f64::from(clamp_aperture(aperture)) / 2.0;

    let axis0 = AxisWindowSet {
        axis: Axis::Zero,
        windows: vec![
            AngleWindow::new(-half, half),
            AngleWindow::new(180.0 - half, 180.0),
            AngleWindow::new(-180.0 + half, -180.0),
        ],
    };

    let axis90 = AxisWindowSet {
        axis: Axis::Ninety,
        windows: vec![
            AngleWindow::new(90.0 - half, 90.0 + half),
            AngleWindow::new(-90.0 - half, -90.0 + half),
        ],
    };

    (axis0, axis90)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_for_30_degrees() {
        let (axis0, axis90) = build_windows(30);

        assert_eq!(axis0.axis, Axis::Zero);
        assert_eq!(
            axis0.windows,
            vec![
                AngleWindow::new(-15.0, 15.0),
                AngleWindow::new(165.0, 180.0),
                AngleWindow::new(-165.0, -180.0),
            ]
        );

        assert_eq!(axis90.axis, Axis::Ninety);
        assert_eq!(
            axis90.windows,
            vec![AngleWindow::new(75.0, 105.0), AngleWindow::new(-105.0, -75.0)]
        );
    }

    #[test]
    fn test_coverage_is_twice_the_aperture() {
        for aperture in 1..=90u32 {
            let (axis0, axis90) = build_windows(aperture);
            let expected = 2.0 * f64::from(aperture);
            assert!((axis0.coverage() - expected).abs() < 1e-9, "axis0 at {}", aperture);
            assert!((axis90.coverage() - expected).abs() < 1e-9, "axis90 at {}", aperture);
        }
    }

    #[test]
    fn test_wide_apertures_are_clamped() {
        assert_eq!(build_windows(120), build_windows(90));
        assert_eq!(build_windows(91), build_windows(90));
        assert_eq!(clamp_aperture(45), 45);
    }

    #[test]
    fn test_odd_aperture_keeps_half_degrees() {
        let (axis0, _) = build_windows(25);
        assert_eq!(axis0.windows[0], AngleWindow::new(-12.5, 12.5));
        assert_eq!(axis0.windows[2], AngleWindow::new(-167.5, -180.0));
    }

    #[test]
    fn test_axis_label() {
        assert_eq!(axis_label(0), 0);
        assert_eq!(axis_label(1), 90);
        assert_eq!(axis_label(7), 90);
        assert_eq!(Axis::ALL.map(Axis::degrees), [0, 90]);
    }
}
