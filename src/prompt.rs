use anyhow::Context;

use crate::shell::{Point, Rectangle, Shell, Size, SurfaceId};

const ENTRY_WIDTH: i32 = 400;
const ENTRY_HEIGHT: i32 = 60;

/// The transient password entry attached to the overlay.
///
/// Pure capture-and-relay: it never validates anything, it only hands the
/// entered text to the session controller on activation.
pub struct CredentialPrompt {
    entry: SurfaceId,
}

impl CredentialPrompt {
    /// Creates the entry centered on the primary output and focuses it.
    pub fn create(shell: &mut dyn Shell, overlay: SurfaceId) -> anyhow::Result<Self> {
        let primary = shell.primary_geometry();
        let geometry = Rectangle {
            loc: Point {
                x: primary.loc.x + (primary.size.w - ENTRY_WIDTH) / 2,
                y: primary.loc.y + (primary.size.h - 100) / 2,
            },
            size: Size {
                w: ENTRY_WIDTH,
                h: ENTRY_HEIGHT,
            },
        };

        let entry = shell
            .create_entry(overlay, geometry)
            .context("error creating entry surface")?;

        if let Err(err) = shell.grab_focus(entry) {
            let _ = shell.destroy_surface(entry);
            return Err(err).context("error focusing entry surface");
        }

        Ok(Self { entry })
    }

    pub fn entry(&self) -> SurfaceId {
        self.entry
    }

    /// Reads the entered text and clears the visible entry in the same step.
    ///
    /// The caller hands the returned string straight to the outward signal
    /// and drops it; it is never stored or logged.
    pub fn take_text(&self, shell: &mut dyn Shell) -> String {
        let text = shell.entry_text(self.entry);
        shell.set_entry_text(self.entry, "");
        text
    }

    pub fn destroy(&self, shell: &mut dyn Shell) -> anyhow::Result<()> {
        shell.destroy_surface(self.entry)
    }
}
