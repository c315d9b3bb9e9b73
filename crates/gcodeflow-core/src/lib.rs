//! # gcodeflow Core
//!
//! Core types shared by the gcodeflow crates: the error hierarchy, unit
//! handling and the modal machine state every pipeline stage observes.

pub mod error;
pub mod state;
pub mod units;

pub use error::{ConfigurationError, Error, ProcessError, Result, TransportError};

pub use state::{
    Axis, DistanceMode, ModalState, MotionMode, Plane, Position, Spindle, SpindleDirection,
};

pub use units::{format_coordinate, Units, MM_PER_INCH};
