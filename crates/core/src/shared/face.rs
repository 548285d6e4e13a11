use serde::{Serialize, Serializer};

/// Tag carried by every accepted face. The detector has a single class.
pub const FACE_LABEL: i32 = 0;

/// Axis-aligned box as `(x1, y1)` top-left and `(x2, y2)` bottom-right corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// One scored box from the detector, in processed-frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(confidence: f32, bbox: BoundingBox) -> Self {
        Self { confidence, bbox }
    }
}

/// A detection that passed the confidence and size filters, in the
/// original frame's pixel coordinates.
///
/// Serializes as the wire tuple `[x1, y1, x2, y2, label]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AcceptedFace {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: i32,
}

impl AcceptedFace {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            label: FACE_LABEL,
        }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn as_tuple(&self) -> [i32; 5] {
        [self.x1, self.y1, self.x2, self.y2, self.label]
    }
}

impl Serialize for AcceptedFace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_tuple().serialize(serializer)
    }
}
