//! Input capture relay.
//!
//! While the session is locked, the compositor routes every input event to
//! the overlay surface and asks us what to do with it. Classification is a
//! pure function of the current session state and the event; the explicit
//! [`FilterResult`] replaces stop/continue propagation flags.

use std::time::Duration;

use crate::dbus::OutwardEvent;
use crate::utils::get_monotonic_time;
use crate::veil::State;

/// XKB keysym for Escape, the cancel gesture key.
pub const KEYSYM_ESCAPE: u32 = 0xff1b;

/// A raw input event delivered to the overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    KeyPress { keysym: u32 },
    KeyRelease { keysym: u32 },
    PointerPress,
    PointerMotion,
    TouchBegin,
}

/// What the compositor should do with the event after us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// Let the event continue to whatever is underneath the relay.
    Forward,
    /// Swallow the event.
    Intercept,
}

impl State {
    pub fn process_overlay_event(&mut self, event: OverlayEvent) -> FilterResult {
        self.process_overlay_event_at(event, get_monotonic_time())
    }

    /// Classifies one event against the current session state.
    ///
    /// The panic bypass check runs first and unconditionally: it outranks the
    /// password prompt and must keep working when the agent is gone.
    pub fn process_overlay_event_at(
        &mut self,
        event: OverlayEvent,
        now: Duration,
    ) -> FilterResult {
        if !self.session.is_locked() {
            return FilterResult::Forward;
        }

        if matches!(
            event,
            OverlayEvent::KeyPress {
                keysym: KEYSYM_ESCAPE
            }
        ) && self.session.escape_tracker.on_cancel_gesture(now)
        {
            info!("escape panic threshold reached, bypassing the lock");
            self.session.cleanup(&mut *self.shell);
            return FilterResult::Intercept;
        }

        // Typing must reach the entry while a prompt is up.
        if self.session.prompt_shown() {
            return FilterResult::Forward;
        }

        match event {
            OverlayEvent::KeyPress { .. }
            | OverlayEvent::PointerPress
            | OverlayEvent::TouchBegin => {
                self.session.show_scanning(&mut *self.shell);
                self.emitter.emit(OutwardEvent::InputDetected);
            }
            _ => (),
        }

        // Nothing beneath the overlay may see input while locked with no
        // prompt shown.
        FilterResult::Intercept
    }
}

#[cfg(test)]
mod tests {
    use calloop::EventLoop;

    use super::*;
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

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    const KEY_A: u32 = 0x61;

    #[test]
    fn events_forward_while_idle() {
        let (_loop, mut state) = make();

        let res = state.process_overlay_event_at(OverlayEvent::KeyPress { keysym: KEY_A }, ms(0));

        assert_eq!(res, FilterResult::Forward);
        assert!(state.emitter.recorded.is_empty());
    }

    #[test]
    fn substantial_input_is_swallowed_and_reported() {
        let (_loop, mut state) = make();
        assert!(state.session.show_lock(&mut *state.shell));

        for event in [
            OverlayEvent::KeyPress { keysym: KEY_A },
            OverlayEvent::PointerPress,
            OverlayEvent::TouchBegin,
        ] {
            let res = state.process_overlay_event_at(event, ms(0));
            assert_eq!(res, FilterResult::Intercept);
        }

        assert_eq!(state.emitter.recorded.len(), 3);
        assert!(state
            .emitter
            .recorded
            .iter()
            .all(|event| *event == OutwardEvent::InputDetected));
    }

    #[test]
    fn insubstantial_input_is_swallowed_silently() {
        let (_loop, mut state) = make();
        assert!(state.session.show_lock(&mut *state.shell));

        for event in [
            OverlayEvent::PointerMotion,
            OverlayEvent::KeyRelease { keysym: KEY_A },
        ] {
            let res = state.process_overlay_event_at(event, ms(0));
            assert_eq!(res, FilterResult::Intercept);
        }

        assert!(state.emitter.recorded.is_empty());
    }

    #[test]
    fn triple_escape_unlocks() {
        let (_loop, mut state) = make();
        assert!(state.session.show_lock(&mut *state.shell));

        let escape = OverlayEvent::KeyPress {
            keysym: KEYSYM_ESCAPE,
        };
        state.process_overlay_event_at(escape, ms(0));
        state.process_overlay_event_at(escape, ms(200));
        let res = state.process_overlay_event_at(escape, ms(400));

        assert_eq!(res, FilterResult::Intercept);
        assert_eq!(state.session.state(), LockState::Idle);
    }

    #[test]
    fn spaced_escapes_do_not_unlock() {
        let (_loop, mut state) = make();
        assert!(state.session.show_lock(&mut *state.shell));

        let escape = OverlayEvent::KeyPress {
            keysym: KEYSYM_ESCAPE,
        };
        state.process_overlay_event_at(escape, ms(0));
        state.process_overlay_event_at(escape, ms(1500));
        state.process_overlay_event_at(escape, ms(3000));

        assert_eq!(state.session.state(), LockState::Locked);
    }

    #[test]
    fn prompt_passes_typing_through() {
        let (_loop, mut state) = make();
        assert!(state.session.show_lock(&mut *state.shell));
        assert!(state.session.show_password_prompt(&mut *state.shell));
        state.emitter.recorded.clear();

        let res = state.process_overlay_event_at(OverlayEvent::KeyPress { keysym: KEY_A }, ms(0));

        assert_eq!(res, FilterResult::Forward);
        assert!(state.emitter.recorded.is_empty());
    }

    #[test]
    fn escape_outranks_the_prompt() {
        let (_loop, mut state) = make();
        assert!(state.session.show_lock(&mut *state.shell));
        assert!(state.session.show_password_prompt(&mut *state.shell));

        let escape = OverlayEvent::KeyPress {
            keysym: KEYSYM_ESCAPE,
        };
        state.process_overlay_event_at(escape, ms(0));
        state.process_overlay_event_at(escape, ms(200));
        let res = state.process_overlay_event_at(escape, ms(400));

        assert_eq!(res, FilterResult::Intercept);
        assert_eq!(state.session.state(), LockState::Idle);
        assert!(!state.session.prompt_shown());
    }
}
