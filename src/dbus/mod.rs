use std::fmt;

use zbus::blocking::Connection;
use zbus::{Interface, SignalContext};

use crate::veil::State;

pub mod overlay;

use self::overlay::{Overlay, VeilToOverlay};

trait Start: Interface {
    fn start(self) -> anyhow::Result<Connection>;
}

#[derive(Default)]
pub struct DBusServers {
    pub conn_overlay: Option<Connection>,
}

impl DBusServers {
    pub fn start(state: &mut State) {
        let mut dbus = Self::default();

        let (to_veil, from_overlay) = calloop::channel::channel();
        let (to_overlay, from_veil) = async_channel::unbounded();
        state
            .event_loop
            .insert_source(from_overlay, move |event, _, state| match event {
                calloop::channel::Event::Msg(request) => {
                    let success = state.on_gateway_request(request);
                    if let Err(err) = to_overlay.send_blocking(VeilToOverlay::Done(success)) {
                        warn!("error sending reply to the overlay gateway: {err:?}");
                    }
                }
                calloop::channel::Event::Closed => (),
            })
            .unwrap();

        let overlay = Overlay::new(to_veil, from_veil);
        dbus.conn_overlay = try_start(overlay);

        if let Some(conn) = &dbus.conn_overlay {
            match conn.object_server().interface::<_, Overlay>(overlay::PATH) {
                Ok(iface) => state.emitter.connect(iface.signal_context().clone()),
                Err(err) => warn!("error getting overlay interface reference: {err:?}"),
            }
        }

        state.dbus = Some(dbus);
    }
}

fn try_start<I: Start>(iface: I) -> Option<Connection> {
    match iface.start() {
        Ok(conn) => Some(conn),
        Err(err) => {
            warn!("error starting {}: {err:?}", I::name());
            None
        }
    }
}

/// Events re-emitted outward to the authentication agent.
#[derive(Clone, PartialEq, Eq)]
pub enum OutwardEvent {
    InputDetected,
    PasswordSubmitted(String),
}

// The password must never end up in logs.
impl fmt::Debug for OutwardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputDetected => write!(f, "InputDetected"),
            Self::PasswordSubmitted(_) => write!(f, "PasswordSubmitted(..)"),
        }
    }
}

/// Fire-and-forget signal emission towards the agent.
///
/// The session never waits for the agent: a slow or dead agent must not be
/// able to stall input handling or the panic bypass.
pub struct Emitter {
    ctxt: Option<SignalContext<'static>>,
    #[cfg(test)]
    pub recorded: Vec<OutwardEvent>,
}

impl Emitter {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            ctxt: None,
            #[cfg(test)]
            recorded: Vec::new(),
        }
    }

    pub fn connect(&mut self, ctxt: SignalContext<'static>) {
        self.ctxt = Some(ctxt);
    }

    pub fn emit(&mut self, event: OutwardEvent) {
        trace!("emitting {event:?}");

        #[cfg(test)]
        self.recorded.push(event.clone());

        let Some(ctxt) = &self.ctxt else {
            return;
        };

        let res = async_io::block_on(async {
            match &event {
                OutwardEvent::InputDetected => Overlay::input_detected(ctxt).await,
                OutwardEvent::PasswordSubmitted(password) => {
                    Overlay::password_submitted(ctxt, password).await
                }
            }
        });

        if let Err(err) = res {
            warn!("error emitting {event:?}: {err:?}");
        }
    }
}
