mod backend;
pub mod backends;
mod decode;
mod labels;
mod nms;
mod registry;
mod result;

pub use backend::{DetectionCapability, DetectorBackend};
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use decode::{BoxDecoder, DecodeError, DEFAULT_CONFIDENCE_THRESHOLD};
pub use labels::{load_labels, parse_labels};
pub use nms::{apply_nms, iou, DEFAULT_IOU_THRESHOLD};
pub use registry::{BackendRegistry, SharedBackend};
pub use result::{BoundingBox, InputLayout, ModelShape, RawDetectionTensor, DISTANCE_UNKNOWN};
