#[macro_use]
extern crate tracing;

use std::env;

use calloop::signals::{Signal, Signals};
use calloop::EventLoop;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use veil::dbus::{overlay, DBusServers};
use veil::shell::headless::Headless;
use veil::utils::version;
use veil::veil::State;

#[derive(Parser)]
#[command(author, version = version(), about, long_about = None)]
struct Cli {}

fn main() {
    env::set_var("RUST_BACKTRACE", "1");

    let directives = env::var("RUST_LOG").unwrap_or_else(|_| "veil=debug,info".to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .init();

    let _cli = Cli::parse();

    let mut event_loop = EventLoop::try_new().unwrap();

    let mut state = State::new(
        event_loop.handle(),
        event_loop.get_signal(),
        Box::new(Headless::new()),
    );

    event_loop
        .handle()
        .insert_source(
            Signals::new(&[Signal::SIGINT, Signal::SIGTERM]).unwrap(),
            |event, _, state: &mut State| {
                info!("quitting due to receiving signal {:?}", event.signal());
                state.disable();
            },
        )
        .unwrap();

    DBusServers::start(&mut state);

    info!("serving {} on the session bus", overlay::NAME);

    event_loop.run(None, &mut state, |_| ()).unwrap();

    debug!("exited the event loop");
}
