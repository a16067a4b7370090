//! atomj-roi: Pointer-driven ROI editing for channel maps.
//!
//! This crate provides:
//! - **[`RoiManager`]** - the construction / drag state machine
//! - **[`RoiSupervisor`]** - the capabilities the hosting view exposes to it
//! - **[`ChannelView`]** - a host wiring the manager to a [`atomj_render::Channel2DPlot`]
//! - A closed table of ROI commands
//!

pub mod commands;
pub mod cursor;
pub mod error;
pub mod event;
pub mod manager;
pub mod mode;
pub mod supervisor;
pub mod view;

pub use commands::{dispatch, find_command, CommandDescriptor, COMMANDS};
pub use cursor::Cursor;
pub use error::{RoiError, Result};
pub use event::{MouseButton, PointerEvent};
pub use manager::{RoiManager, RoiManagerState};
pub use mode::InteractionMode;
pub use supervisor::RoiSupervisor;
pub use view::{ChannelView, PlotHost};
