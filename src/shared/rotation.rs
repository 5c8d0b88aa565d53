// This is free and unencumbered software released into the public domain.

//! Display rotation and the corrective preview transform.
//!
//! The display service reports how far the device is turned from its natural
//! orientation. The preview surface is rotated by the opposite amount about its
//! own center so the live image stays upright.

/// Device rotation relative to its natural orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DisplayRotation {
    #[default]
    #[display("0°")]
    Rotation0,
    #[display("90°")]
    Rotation90,
    #[display("180°")]
    Rotation180,
    #[display("270°")]
    Rotation270,
}

impl DisplayRotation {
    pub const ALL: [DisplayRotation; 4] = [
        DisplayRotation::Rotation0,
        DisplayRotation::Rotation90,
        DisplayRotation::Rotation180,
        DisplayRotation::Rotation270,
    ];

    /// Maps a raw display-service code (`0..=3`). Anything else is unrecognized.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(DisplayRotation::Rotation0),
            1 => Some(DisplayRotation::Rotation90),
            2 => Some(DisplayRotation::Rotation180),
            3 => Some(DisplayRotation::Rotation270),
            _ => None,
        }
    }

    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees {
            0 => Some(DisplayRotation::Rotation0),
            90 => Some(DisplayRotation::Rotation90),
            180 => Some(DisplayRotation::Rotation180),
            270 => Some(DisplayRotation::Rotation270),
            _ => None,
        }
    }

    pub const fn code(self) -> i32 {
        match self {
            DisplayRotation::Rotation0 => 0,
            DisplayRotation::Rotation90 => 1,
            DisplayRotation::Rotation180 => 2,
            DisplayRotation::Rotation270 => 3,
        }
    }

    pub const fn degrees(self) -> i32 {
        match self {
            DisplayRotation::Rotation0 => 0,
            DisplayRotation::Rotation90 => 90,
            DisplayRotation::Rotation180 => 180,
            DisplayRotation::Rotation270 => 270,
        }
    }
}

/// Rotation about a pivot, in the surface's own pixel coordinates (y down,
/// positive angles turn clockwise on screen).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrientationTransform {
    pub rotation_degrees: f32,
    pub pivot_x: f32,
    pub pivot_y: f32,
}

impl OrientationTransform {
    pub const IDENTITY: OrientationTransform = OrientationTransform {
        rotation_degrees: 0.0,
        pivot_x: 0.0,
        pivot_y: 0.0,
    };

    /// The transform that undoes `rotation` for a `width` x `height` surface.
    pub fn for_rotation(width: u32, height: u32, rotation: DisplayRotation) -> Self {
        Self {
            rotation_degrees: -(rotation.degrees() as f32),
            pivot_x: width as f32 / 2.0,
            pivot_y: height as f32 / 2.0,
        }
    }

    pub fn pivot(&self) -> (f32, f32) {
        (self.pivot_x, self.pivot_y)
    }

    pub fn is_identity(&self) -> bool {
        self.quarter_turns() == Some(0)
    }

    /// Number of clockwise quarter turns, when the angle is a multiple of 90°.
    pub fn quarter_turns(&self) -> Option<u8> {
        let deg = self.rotation_degrees;
        if deg.fract() != 0.0 || (deg as i64) % 90 != 0 {
            return None;
        }
        Some(((deg as i64 / 90).rem_euclid(4)) as u8)
    }

    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        let (sin, cos) = match self.quarter_turns() {
            Some(0) => (0.0, 1.0),
            Some(1) => (1.0, 0.0),
            Some(2) => (0.0, -1.0),
            Some(3) => (-1.0, 0.0),
            _ => self.rotation_degrees.to_radians().sin_cos(),
        };
        let dx = x - self.pivot_x;
        let dy = y - self.pivot_y;
        (
            self.pivot_x + dx * cos - dy * sin,
            self.pivot_y + dx * sin + dy * cos,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn maps_every_code_in_the_table() {
        for (code, degrees) in [(0, 0), (1, 90), (2, 180), (3, 270)] {
            let rotation = DisplayRotation::from_code(code).unwrap();
            assert_eq!(rotation.degrees(), degrees);
            assert_eq!(rotation.code(), code);
            assert_eq!(DisplayRotation::from_degrees(degrees), Some(rotation));
        }
    }

    #[test]
    fn unknown_codes_are_unrecognized() {
        for code in [-1, 4, 90, 180, i32::MIN, i32::MAX] {
            assert_eq!(DisplayRotation::from_code(code), None);
        }
        assert_eq!(DisplayRotation::from_degrees(45), None);
        assert_eq!(DisplayRotation::from_degrees(360), None);
    }

    #[test]
    fn zero_sized_surface_pivots_at_origin() {
        for rotation in DisplayRotation::ALL {
            let t = OrientationTransform::for_rotation(0, 0, rotation);
            assert_eq!(t.pivot(), (0.0, 0.0));
            assert_eq!(t.rotation_degrees, -(rotation.degrees() as f32));
        }
    }

    #[test]
    fn quarter_turns_are_clockwise_and_normalized() {
        let t = OrientationTransform::for_rotation(10, 10, DisplayRotation::Rotation90);
        assert_eq!(t.quarter_turns(), Some(3));
        let t = OrientationTransform::for_rotation(10, 10, DisplayRotation::Rotation270);
        assert_eq!(t.quarter_turns(), Some(1));
        assert!(OrientationTransform::IDENTITY.is_identity());
    }

    #[test]
    fn counter_rotation_moves_the_top_edge_left() {
        // Turning the device 90° is undone by turning the image 90°
        // counter-clockwise: the top-center point lands on the left-center.
        let t = OrientationTransform::for_rotation(100, 100, DisplayRotation::Rotation90);
        assert_eq!(t.map_point(50.0, 0.0), (0.0, 50.0));
    }

    proptest! {
        #[test]
        fn negates_the_display_rotation_about_the_center(
            width in 0u32..10_000,
            height in 0u32..10_000,
            code in 0i32..4,
        ) {
            let rotation = DisplayRotation::from_code(code).unwrap();
            let t = OrientationTransform::for_rotation(width, height, rotation);
            prop_assert_eq!(t.rotation_degrees, -(rotation.degrees() as f32));
            prop_assert_eq!(t.pivot(), (width as f32 / 2.0, height as f32 / 2.0));
            prop_assert_eq!(t.map_point(t.pivot_x, t.pivot_y), t.pivot());
        }

        #[test]
        fn same_inputs_give_the_same_transform(
            width in 0u32..10_000,
            height in 0u32..10_000,
            code in 0i32..4,
        ) {
            let rotation = DisplayRotation::from_code(code).unwrap();
            prop_assert_eq!(
                OrientationTransform::for_rotation(width, height, rotation),
                OrientationTransform::for_rotation(width, height, rotation)
            );
        }
    }
}
