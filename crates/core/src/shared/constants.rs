/// Detections scoring below this are discarded.
pub const CONFIDENCE_THRESHOLD: f32 = 0.8;

/// Minimum face width and height, in processed-frame pixels.
pub const MIN_FACE_SIZE: i32 = 30;

/// Maximum admitted frames per second, per connection.
pub const FPS: u32 = 20;

/// Minimum spacing between two admitted frames on one connection (50 ms at 20 fps).
pub const MIN_FRAME_INTERVAL_MS: f64 = 1000.0 / FPS as f64;

/// Fixed resolution the detector sees.
pub const PROCESS_WIDTH: u32 = 320;
pub const PROCESS_HEIGHT: u32 = 240;

/// CLAHE parameters applied to the processed frame's luminance.
pub const CLAHE_CLIP_LIMIT: f64 = 2.0;
pub const CLAHE_TILE_GRID: (u32, u32) = (8, 8);

/// Envelope used for outbound annotated frames.
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Outline colour for annotated faces (RGB).
pub const ANNOTATION_COLOR: [u8; 3] = [0, 255, 0];

/// File name the detector model is cached under.
pub const DETECTOR_MODEL_NAME: &str = "face_detector_ssd_res10.onnx";

/// Wire event names shared by inbound and outbound messages.
pub const EVENT_FRAME: &str = "frame";
pub const EVENT_CAMERA_FRAME: &str = "camera-frame";
pub const EVENT_FACES: &str = "faces";
