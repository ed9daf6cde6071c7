use zbus::blocking::Connection;
use zbus::fdo::RequestNameFlags;
use zbus::{dbus_interface, SignalContext};

use super::Start;

pub const NAME: &str = "dev.veil.Overlay";
pub const PATH: &str = "/dev/veil/Overlay";

/// Requests from the authentication agent, handled on the event loop.
pub enum OverlayToVeil {
    ShowLock,
    ShowPasswordPrompt,
    HideLock,
}

pub enum VeilToOverlay {
    Done(bool),
}

/// The D-Bus gateway the authentication agent drives.
///
/// Exposes exactly three methods and two signals; everything else about the
/// session stays private to the daemon. All methods report plain success
/// flags, never errors: internal failures surface as `false`.
pub struct Overlay {
    to_veil: calloop::channel::Sender<OverlayToVeil>,
    from_veil: async_channel::Receiver<VeilToOverlay>,
}

#[dbus_interface(name = "dev.veil.Overlay")]
impl Overlay {
    async fn show_lock(&self) -> bool {
        self.call(OverlayToVeil::ShowLock).await
    }

    async fn show_password_prompt(&self) -> bool {
        self.call(OverlayToVeil::ShowPasswordPrompt).await
    }

    async fn hide_lock(&self) -> bool {
        self.call(OverlayToVeil::HideLock).await
    }

    #[dbus_interface(signal)]
    pub async fn input_detected(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[dbus_interface(signal)]
    pub async fn password_submitted(
        ctxt: &SignalContext<'_>,
        password: &str,
    ) -> zbus::Result<()>;
}

impl Overlay {
    pub fn new(
        to_veil: calloop::channel::Sender<OverlayToVeil>,
        from_veil: async_channel::Receiver<VeilToOverlay>,
    ) -> Self {
        Self { to_veil, from_veil }
    }

    async fn call(&self, request: OverlayToVeil) -> bool {
        if let Err(err) = self.to_veil.send(request) {
            warn!("error sending request to veil: {err:?}");
            return false;
        }

        match self.from_veil.recv().await {
            Ok(VeilToOverlay::Done(success)) => success,
            Err(err) => {
                warn!("error receiving reply from veil: {err:?}");
                false
            }
        }
    }
}

impl Start for Overlay {
    fn start(self) -> anyhow::Result<Connection> {
        let conn = Connection::session()?;
        let flags = RequestNameFlags::AllowReplacement
            | RequestNameFlags::ReplaceExisting
            | RequestNameFlags::DoNotQueue;

        conn.object_server().at(PATH, self)?;
        conn.request_name_with_flags(NAME, flags)?;

        Ok(conn)
    }
}
