//! ROI commands as a closed table of descriptors.
//!
//! Each entry pairs a stable id and a menu label with an enablement predicate
//! and an effect. Hosts list [`COMMANDS`] to build menus and call [`dispatch`]
//! to run one.

use log::debug;

use crate::error::{Result, RoiError};
use crate::manager::{RoiManager, RoiManagerState};
use crate::supervisor::RoiSupervisor;

/// A labeled ROI operation.
#[derive(Clone, Copy)]
pub struct CommandDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub is_enabled: fn(&RoiManager) -> bool,
    pub run: fn(&mut RoiManager, &mut dyn RoiSupervisor) -> Result<()>,
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

fn has_highlight(m: &RoiManager) -> bool {
    m.highlighted_count() > 0
}

fn has_two_highlighted(m: &RoiManager) -> bool {
    m.highlighted_count() > 1
}

pub const COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        id: "merge",
        label: "Merge ROIs",
        is_enabled: has_two_highlighted,
        run: |m, s| m.merge_highlighted(s).map(|_| ()),
    },
    CommandDescriptor {
        id: "subtract",
        label: "Subtract ROIs",
        is_enabled: has_two_highlighted,
        run: |m, s| m.subtract_highlighted(s).map(|_| ()),
    },
    CommandDescriptor {
        id: "complement",
        label: "Complement ROIs",
        is_enabled: has_highlight,
        run: |m, s| {
            m.complement_highlighted(s);
            Ok(())
        },
    },
    CommandDescriptor {
        id: "convex-hull",
        label: "Convex hull",
        is_enabled: has_highlight,
        run: |m, s| {
            m.convex_hull_highlighted(s);
            Ok(())
        },
    },
    CommandDescriptor {
        id: "remove",
        label: "Remove ROIs",
        is_enabled: has_highlight,
        run: |m, s| {
            m.remove_highlighted(s);
            Ok(())
        },
    },
    CommandDescriptor {
        id: "clear-highlight",
        label: "Clear selection",
        is_enabled: has_highlight,
        run: |m, s| {
            m.clear_highlight(s);
            Ok(())
        },
    },
    CommandDescriptor {
        id: "cancel-construction",
        label: "Cancel ROI",
        is_enabled: |m| m.state() == RoiManagerState::Constructing,
        run: |m, s| {
            m.cancel_roi_construction(s);
            Ok(())
        },
    },
    CommandDescriptor {
        id: "toggle-hole-mode",
        label: "Hole mode",
        is_enabled: |_| true,
        run: |m, _| {
            m.set_hole_mode(!m.is_hole_mode());
            Ok(())
        },
    },
];

#[must_use]
pub fn find_command(id: &str) -> Option<&'static CommandDescriptor> {
    COMMANDS.iter().find(|c| c.id == id)
}

/// Runs the command `id`.
///
/// # Errors
///
/// Returns [`RoiError::UnknownCommand`] for an id not in [`COMMANDS`],
/// [`RoiError::CommandDisabled`] when its predicate fails, or the error of
/// the command itself.
pub fn dispatch(
    id: &str,
    manager: &mut RoiManager,
    supervisor: &mut dyn RoiSupervisor,
) -> Result<()> {
    let command = find_command(id).ok_or_else(|| RoiError::UnknownCommand(id.to_string()))?;
    if !(command.is_enabled)(manager) {
        return Err(RoiError::CommandDisabled(command.id));
    }
    debug!("[{}] running command '{}'", supervisor.publication_site(), command.id);
    (command.run)(manager, supervisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in COMMANDS.iter().enumerate() {
            assert!(COMMANDS[i + 1..].iter().all(|b| b.id != a.id), "{}", a.id);
        }
    }

    #[test]
    fn test_enablement_without_rois() {
        let m = RoiManager::new();
        assert!(!(find_command("merge").unwrap().is_enabled)(&m));
        assert!((find_command("toggle-hole-mode").unwrap().is_enabled)(&m));
        assert!(find_command("histogram").is_none());
    }
}
