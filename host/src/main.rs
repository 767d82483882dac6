//! probe a board on a serial port and dump every property of its devices

use std::{env, process::ExitCode, sync::Arc};
use log::*;
use mojocat::hub::{
    registry,
    Hub, Settings, Detection, Peripheral,
    };

fn main() -> ExitCode {
    env_logger::init();

    let Some(port) = env::args().nth(1) else {
        eprintln!("usage: mojocat-probe <serial port>");
        return ExitCode::FAILURE;
    };
    let hub = Arc::new(Hub::serial(Settings::new(port.as_str())));

    match hub.detect() {
        Detection::CanCommunicate => println!("board found on {}", port),
        status => {
            eprintln!("no board on {}: {:?}", port, status);
            return ExitCode::FAILURE;
        },
    }
    if let Err(error) = hub.initialize() {
        eprintln!("failed initializing hub: {}", error);
        return ExitCode::FAILURE;
    }
    println!("{}: {:?}", registry::VERSION_PROPERTY, hub.version());

    for kind in registry::installed(&*hub) {
        let mut device: Peripheral = match Peripheral::new(kind, kind.max_channels) {
            Ok(device) => device,
            Err(error) => {
                error!("cannot create {}: {}", kind.name, error);
                continue
            },
        };
        if let Err(error) = device.initialize(Some(&hub)) {
            error!("cannot initialize {}: {}", kind.name, error);
            continue
        }
        println!("{} ({})", kind.name, kind.description);
        for property in device.properties() {
            match device.get(&property.name) {
                Ok(value) => println!("    {}: {}", property.name, value),
                Err(error) => println!("    {}: {}", property.name, error),
            }
        }
        device.shutdown();
    }
    hub.shutdown();
    ExitCode::SUCCESS
}
