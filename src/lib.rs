//! Reference-counted buffers storing a header and a trailing array of elements in a single
//! allocation, with copy-on-write mutation.
//!
//! A [`ManagedHandle`] owns a reference to a [`TailBuffer`]. Handles are cloned by
//! incrementing a reference count; mutating through a shared handle first copies the buffer
//! into a fresh allocation, so the other handles never observe the change.
//!
//! The capacity of a buffer is fixed at creation, but may exceed the requested one when the
//! allocator grants more memory than asked. The header is built from the final capacity.
//!
//! ```rust
//! use managed_buffer::ManagedHandle;
//!
//! #[derive(Clone)]
//! struct Header {
//!     name: &'static str,
//! }
//!
//! let mut a = ManagedHandle::<Header, u32>::new(8, |_| Header { name: "numbers" });
//! a.mutate(|buffer| buffer.extend_from_slice(&[1, 2, 3]));
//! let b = a.clone();
//! a.mutate(|buffer| buffer.header_mut().name = "renamed");
//! assert_eq!(a.header().name, "renamed");
//! assert_eq!(b.header().name, "numbers");
//! assert_eq!(a.as_slice(), b.as_slice());
//! ```
#![no_std]
extern crate alloc;

pub mod allocator;
mod any;
mod arc;
pub mod buffer;
mod capacity;
pub mod error;
mod handle;
pub mod layout;
mod loom;
#[cfg(feature = "serde")]
mod serde;
pub mod unique;
mod utils;

#[cfg(feature = "allocator-api2")]
pub use crate::allocator::ApiAllocator;
pub use crate::{
    allocator::{Global, RawAllocator},
    any::AnyBuffer,
    buffer::TailBuffer,
    handle::ManagedHandle,
};
