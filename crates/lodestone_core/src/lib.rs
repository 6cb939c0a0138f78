//! # LODESTONE Core
//!
//! Primitives shared by every part of the synchronization layer:
//!
//! - **Memory**: fixed-capacity ring buffers, allocated once and never resized
//! - **Sync**: atomic scalar cells so the scheduler thread can publish metrics
//!   that any query thread reads without tearing
//! - **Transform**: world transforms and their fixed-point wire quantization
//!
//! ## Example
//!
//! ```rust
//! use lodestone_core::{RingBuffer, Transform};
//!
//! let mut samples: RingBuffer<u64> = RingBuffer::with_capacity(4);
//! for ms in [50, 50, 50, 50, 500] {
//!     samples.push(ms);
//! }
//! assert_eq!(samples.iter().copied().collect::<Vec<_>>(), vec![50, 50, 50, 500]);
//!
//! let q = Transform::new(1.0, 64.5, -0.25, 90.0, 0.0).quantize();
//! assert_eq!((q.x, q.y, q.z), (32, 2064, -8));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod sync;
pub mod transform;

pub use memory::RingBuffer;
pub use sync::{AtomicF32, AtomicF64};
pub use transform::{
    quantize_angle, quantize_position, QuantizedTransform, Transform, Vec3,
    ANGLE_STEPS, POSITION_SCALE,
};
