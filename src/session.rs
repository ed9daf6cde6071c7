//! The lock session state machine.
//!
//! Owns the overlay surface and modal grab lifecycles. Every teardown path
//! (`HideLock`, panic bypass, daemon shutdown, failed acquisition) converges
//! on [`LockSession::cleanup`], which must always bring the process back to a
//! state where input is not captured.

use crate::escape_tracker::EscapePanicTracker;
use crate::prompt::CredentialPrompt;
use crate::shell::{Point, Rectangle, Shell, SurfaceId, SurfaceSpec};

/// Name every overlay surface is created under. Stray reclamation matches on
/// it, so it must stay stable across versions.
pub const OVERLAY_SURFACE_NAME: &str = "veil-lock-overlay";

const STATUS_SECURED: &str = "VEIL SECURED";
const STATUS_SCANNING: &str = "SCANNING...";
const STATUS_PASSWORD: &str = "PASSWORD REQUIRED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Idle,
    Locked,
    AwaitingPassword,
}

pub struct LockSession {
    state: LockState,
    overlay: Option<SurfaceId>,
    prompt: Option<CredentialPrompt>,
    status_label: Option<SurfaceId>,
    pub escape_tracker: EscapePanicTracker,
}

impl LockSession {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            state: LockState::Idle,
            overlay: None,
            prompt: None,
            status_label: None,
            escape_tracker: EscapePanicTracker::new(),
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state != LockState::Idle
    }

    pub fn prompt_shown(&self) -> bool {
        self.prompt.is_some()
    }

    pub fn overlay(&self) -> Option<SurfaceId> {
        self.overlay
    }

    pub fn prompt_entry(&self) -> Option<SurfaceId> {
        self.prompt.as_ref().map(CredentialPrompt::entry)
    }

    /// Establishes the locked state.
    ///
    /// Idempotent: locking while already locked is a no-op success. Returns
    /// `false` only when the shell refuses the overlay or the modal grab, in
    /// which case everything is torn back down before returning.
    pub fn show_lock(&mut self, shell: &mut dyn Shell) -> bool {
        if self.state != LockState::Idle {
            return true;
        }

        // A previous instance may have died while locked. Reclaim its overlay
        // before creating ours.
        self.reclaim_strays(shell);

        let spec = SurfaceSpec {
            name: OVERLAY_SURFACE_NAME.to_owned(),
            geometry: shell.combined_geometry(),
        };
        let overlay = match shell.create_surface(spec) {
            Ok(id) => id,
            Err(err) => {
                warn!("error creating overlay surface: {err:?}");
                self.cleanup(shell);
                return false;
            }
        };
        self.overlay = Some(overlay);

        if !shell.push_modal(overlay) {
            warn!("compositor refused the modal grab");
            self.cleanup(shell);
            return false;
        }

        self.state = LockState::Locked;
        self.create_status_label(shell);

        debug!("locked, overlay {overlay:?}");
        true
    }

    /// Shows the credential entry.
    ///
    /// Valid only while `Locked` with no existing prompt; anything else is a
    /// rejected call, not an error.
    pub fn show_password_prompt(&mut self, shell: &mut dyn Shell) -> bool {
        if self.state != LockState::Locked || self.prompt.is_some() {
            return false;
        }
        let Some(overlay) = self.overlay else {
            return false;
        };

        let prompt = match CredentialPrompt::create(shell, overlay) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!("error creating credential prompt: {err:?}");
                return false;
            }
        };
        self.prompt = Some(prompt);

        if let Some(label) = self.status_label {
            shell.set_label(
                label,
                STATUS_PASSWORD,
                secured_position(shell.primary_geometry()),
            );
        }

        self.state = LockState::AwaitingPassword;
        true
    }

    /// Unconditional teardown to `Idle`. Always succeeds.
    pub fn hide_lock(&mut self, shell: &mut dyn Shell) -> bool {
        self.cleanup(shell);
        true
    }

    /// Reads the entered text out of the prompt, clearing the visible entry.
    pub fn take_prompt_text(&mut self, shell: &mut dyn Shell) -> Option<String> {
        let prompt = self.prompt.as_ref()?;
        Some(prompt.take_text(shell))
    }

    /// Switches the status label to the scanning presentation.
    pub fn show_scanning(&mut self, shell: &mut dyn Shell) {
        if self.prompt.is_some() {
            return;
        }
        let Some(label) = self.status_label else {
            return;
        };

        shell.set_label(
            label,
            STATUS_SCANNING,
            scanning_position(shell.primary_geometry()),
        );
    }

    /// Tears everything down and resets to `Idle`.
    ///
    /// Idempotent, and every step tolerates the session having ended half-way:
    /// a grab that was never acquired, surfaces already destroyed, strays left
    /// behind by a crashed instance. Failures are observed, logged and
    /// discarded so that one bad step cannot leave input captured with no way
    /// out.
    pub fn cleanup(&mut self, shell: &mut dyn Shell) {
        self.state = LockState::Idle;
        self.escape_tracker.reset();

        if let Some(overlay) = self.overlay.take() {
            if let Err(err) = shell.pop_modal(overlay) {
                debug!("error releasing modal grab: {err:?}");
            }
        }

        if let Some(prompt) = self.prompt.take() {
            if let Err(err) = prompt.destroy(shell) {
                debug!("error destroying credential prompt: {err:?}");
            }
        }

        if let Some(label) = self.status_label.take() {
            if let Err(err) = shell.destroy_surface(label) {
                debug!("error destroying status label: {err:?}");
            }
        }

        // This also destroys the overlay this session tracked: it carries the
        // same name as any stray.
        self.reclaim_strays(shell);
    }

    /// Destroys every surface carrying our name, whether or not it is the
    /// instance this session tracks.
    ///
    /// A crashed instance can leave a zombie overlay behind that would
    /// otherwise block input forever.
    fn reclaim_strays(&mut self, shell: &mut dyn Shell) {
        for toplevel in shell.toplevels() {
            if toplevel.name != OVERLAY_SURFACE_NAME {
                continue;
            }

            debug!("reclaiming stray overlay surface {:?}", toplevel.id);

            // The stray may still hold the grab.
            let _ = shell.pop_modal(toplevel.id);

            if let Err(err) = shell.destroy_surface(toplevel.id) {
                warn!("error destroying stray overlay: {err:?}");
            }
        }
    }

    // Cosmetic: the lock works without it.
    fn create_status_label(&mut self, shell: &mut dyn Shell) {
        let Some(overlay) = self.overlay else {
            return;
        };

        match shell.create_label(overlay, STATUS_SECURED) {
            Ok(label) => {
                shell.set_label(
                    label,
                    STATUS_SECURED,
                    secured_position(shell.primary_geometry()),
                );
                self.status_label = Some(label);
            }
            Err(err) => debug!("error creating status label: {err:?}"),
        }
    }
}

fn secured_position(primary: Rectangle) -> Point {
    Point {
        x: primary.loc.x + primary.size.w - 120,
        y: primary.loc.y + primary.size.h - 30,
    }
}

fn scanning_position(primary: Rectangle) -> Point {
    Point {
        x: primary.loc.x + (primary.size.w - 150) / 2,
        y: primary.loc.y + primary.size.h - 150,
    }
}
