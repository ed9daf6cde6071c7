use calloop::{LoopHandle, LoopSignal};

use crate::dbus::overlay::OverlayToVeil;
use crate::dbus::{DBusServers, Emitter, OutwardEvent};
use crate::session::LockSession;
use crate::shell::Shell;

/// Everything the event loop owns.
///
/// All session mutation happens here, on the loop; the D-Bus side only talks
/// to us through channels.
pub struct State {
    pub event_loop: LoopHandle<'static, State>,
    pub stop_signal: LoopSignal,
    pub shell: Box<dyn Shell>,
    pub session: LockSession,
    pub emitter: Emitter,
    pub dbus: Option<DBusServers>,
}

impl State {
    pub fn new(
        event_loop: LoopHandle<'static, State>,
        stop_signal: LoopSignal,
        shell: Box<dyn Shell>,
    ) -> Self {
        Self {
            event_loop,
            stop_signal,
            shell,
            session: LockSession::new(),
            emitter: Emitter::new(),
            dbus: None,
        }
    }

    pub fn on_gateway_request(&mut self, request: OverlayToVeil) -> bool {
        match request {
            OverlayToVeil::ShowLock => self.session.show_lock(&mut *self.shell),
            OverlayToVeil::ShowPasswordPrompt => {
                self.session.show_password_prompt(&mut *self.shell)
            }
            OverlayToVeil::HideLock => self.session.hide_lock(&mut *self.shell),
        }
    }

    /// The user confirmed the credential entry.
    ///
    /// The text goes straight out to the agent and the visible entry is
    /// cleared; validation is entirely the agent's business.
    pub fn on_entry_activated(&mut self) {
        let Some(password) = self.session.take_prompt_text(&mut *self.shell) else {
            return;
        };

        self.emitter.emit(OutwardEvent::PasswordSubmitted(password));
    }

    /// Full teardown, used on SIGINT/SIGTERM.
    pub fn disable(&mut self) {
        self.session.cleanup(&mut *self.shell);
        self.stop_signal.stop();
    }
}

#[cfg(test)]
mod tests {
    use calloop::EventLoop;

    use super::*;
    use crate::input::OverlayEvent;
    use crate::session::LockState;
    use crate::shell::headless::Headless;

    fn make() -> (EventLoop<'static, State>, State) {
        let event_loop = EventLoop::try_new().unwrap();
        let state = State::new(
            event_loop.handle(),
            event_loop.get_signal(),
            Box::new(Headless::new()),
        );
        (event_loop, state)
    }

    #[test]
    fn gateway_requests_are_idempotent() {
        let (_loop, mut state) = make();

        assert!(state.on_gateway_request(OverlayToVeil::HideLock));
        assert!(state.on_gateway_request(OverlayToVeil::ShowLock));
        assert!(state.on_gateway_request(OverlayToVeil::ShowLock));
        assert!(state.on_gateway_request(OverlayToVeil::HideLock));
        assert!(state.on_gateway_request(OverlayToVeil::HideLock));

        assert_eq!(state.session.state(), LockState::Idle);
    }

    #[test]
    fn activation_without_prompt_is_ignored() {
        let (_loop, mut state) = make();
        assert!(state.on_gateway_request(OverlayToVeil::ShowLock));

        state.on_entry_activated();

        assert!(state.emitter.recorded.is_empty());
    }

    #[test]
    fn submitted_password_round_trips_and_clears() {
        let (_loop, mut state) = make();
        assert!(state.on_gateway_request(OverlayToVeil::ShowLock));
        assert!(state.on_gateway_request(OverlayToVeil::ShowPasswordPrompt));

        let entry = state.session.prompt_entry().unwrap();
        state.shell.set_entry_text(entry, "hunter2");

        state.on_entry_activated();

        assert_eq!(
            state.emitter.recorded,
            vec![OutwardEvent::PasswordSubmitted("hunter2".to_owned())]
        );
        assert_eq!(state.shell.entry_text(entry), "");
    }

    // The full flow from the agent's point of view.
    #[test]
    fn lock_scan_prompt_submit_unlock() {
        let (_loop, mut state) = make();

        assert!(state.on_gateway_request(OverlayToVeil::ShowLock));

        let res = state.process_overlay_event(OverlayEvent::KeyPress { keysym: 0x61 });
        assert_eq!(res, crate::input::FilterResult::Intercept);
        assert_eq!(state.emitter.recorded, vec![OutwardEvent::InputDetected]);

        assert!(state.on_gateway_request(OverlayToVeil::ShowPasswordPrompt));

        let entry = state.session.prompt_entry().unwrap();
        state.shell.set_entry_text(entry, "abc123");
        state.on_entry_activated();

        assert_eq!(
            state.emitter.recorded.last(),
            Some(&OutwardEvent::PasswordSubmitted("abc123".to_owned()))
        );
        assert_eq!(state.shell.entry_text(entry), "");

        assert!(state.on_gateway_request(OverlayToVeil::HideLock));
        assert_eq!(state.session.state(), LockState::Idle);
    }
}
