use std::sync::Arc;
use serial_test::serial;

use mojocat::{
    board::Board,
    command::Command,
    hub::*,
    registers,
    };


fn ready(board: &Board) -> Arc<Hub<Board>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let hub = Arc::new(Hub::new(board.clone(), Settings::new("/dev/ttyMOJO0")));
    hub.initialize().expect("failed to initialize hub");
    hub
}
fn attached(kind: &'static Kind, channels: usize, hub: &Arc<Hub<Board>>) -> Peripheral<Board> {
    let mut peripheral = Peripheral::new(kind, channels).unwrap();
    peripheral.initialize(Some(hub)).unwrap();
    peripheral
}


#[test]
fn ttl_read() {
    let board = Board::new();
    let hub = ready(&board);
    board.set_register(33, 1);
    let mut ttl = attached(&TTL, 4, &hub);
    assert_eq!(ttl.state(), PeripheralState::Initialized);
    assert_eq!(ttl.shadow(&registers::TTL, 3), Some(0));

    assert_eq!(ttl.read_channel(&registers::TTL, 3).unwrap(), 1);
    assert_eq!(board.commands().last(), Some(&Command::Read {address: 33}));
    assert_eq!(ttl.shadow(&registers::TTL, 3), Some(1));
}

#[test]
fn ttl_normalized() {
    let board = Board::new();
    let hub = ready(&board);
    let mut ttl = attached(&TTL, 4, &hub);

    ttl.write_channel(&registers::TTL, 2, 7).unwrap();
    assert_eq!(board.commands().last(), Some(&Command::Write {address: 32, value: 1}));
    assert_eq!(board.register(32), Some(1));
    assert_eq!(ttl.shadow(&registers::TTL, 2), Some(1));

    ttl.write_channel(&registers::TTL, 2, 0).unwrap();
    assert_eq!(board.register(32), Some(0));
}

#[test]
fn pwm_out_of_bounds() {
    let board = Board::new();
    let hub = ready(&board);
    let mut pwm = attached(&PWM, 2, &hub);

    pwm.write_channel(&registers::PWM, 1, 128).unwrap();
    assert_eq!(board.register(51), Some(128));
    assert_eq!(pwm.shadow(&registers::PWM, 1), Some(128));

    for value in [-5, 400] {
        pwm.write_channel(&registers::PWM, 1, value).unwrap();
        assert_eq!(board.commands().last(), Some(&Command::Write {address: 51, value: 0}));
        assert_eq!(pwm.shadow(&registers::PWM, 1), Some(0));
    }
    pwm.write_channel(&registers::PWM, 0, 255).unwrap();
    assert_eq!(board.register(50), Some(255));

    // values read back are not filtered
    board.set_register(50, 400);
    assert_eq!(pwm.read_channel(&registers::PWM, 0).unwrap(), 400);
}

#[test]
fn laser_units() {
    let board = Board::new();
    let hub = ready(&board);
    let mut laser = attached(&LASER_TRIGGER, 4, &hub);
    assert_eq!(laser.shadow(&registers::LASER_SEQUENCE, 0), Some(65535));

    laser.write_channel(&registers::LASER_MODE, 1, 2).unwrap();
    laser.write_channel(&registers::LASER_DURATION, 1, 3000).unwrap();
    laser.write_channel(&registers::LASER_SEQUENCE, 3, 0b1010).unwrap();
    assert_eq!(board.register(1), Some(2));
    assert_eq!(board.register(11), Some(3000));
    assert_eq!(board.register(23), Some(0b1010));

    assert_eq!(laser.read_channel(&registers::LASER_DURATION, 1).unwrap(), 3000);
    assert_eq!(board.commands().last(), Some(&Command::Read {address: 11}));

    // a sequence of all ones cannot be read back
    laser.write_channel(&registers::LASER_SEQUENCE, 0, 65535).unwrap();
    assert!(matches!(laser.read_channel(&registers::LASER_SEQUENCE, 0), Err(Error::UnknownCommand)));
    assert_eq!(laser.shadow(&registers::LASER_SEQUENCE, 0), Some(65535));
}

#[test]
fn servo_range() {
    let board = Board::new();
    let hub = ready(&board);
    let mut servos = attached(&SERVOS, 6, &hub);
    servos.write_channel(&registers::SERVO, 5, 131071).unwrap();
    assert_eq!(board.commands().last(), Some(&Command::Write {address: 45, value: 131071}));
    assert_eq!(servos.read_channel(&registers::SERVO, 5).unwrap(), 131071);
}

#[test]
fn analog_input_read_only() {
    let board = Board::new();
    let hub = ready(&board);
    board.set_register(67, 812);
    let mut input = attached(&ANALOG_INPUT, 8, &hub);
    let sent = board.wire().len();

    assert!(matches!(input.write_channel(&registers::ANALOG_INPUT, 0, 5), Err(Error::ReadOnly(_))));
    assert_eq!(board.wire().len(), sent);
    assert_eq!(input.shadow(&registers::ANALOG_INPUT, 0), Some(0));

    assert_eq!(input.read_channel(&registers::ANALOG_INPUT, 7).unwrap(), 812);
}

#[test]
fn foreign_unit() {
    let board = Board::new();
    let hub = ready(&board);
    let mut ttl = attached(&TTL, 4, &hub);
    let sent = board.wire().len();
    assert!(matches!(ttl.read_channel(&registers::PWM, 0), Err(Error::UnsupportedUnit(_))));
    assert!(matches!(ttl.write_channel(&registers::SERVO, 0, 1), Err(Error::UnsupportedUnit(_))));
    assert_eq!(ttl.shadow(&registers::PWM, 0), None);
    assert_eq!(board.wire().len(), sent);
}

#[test]
fn invalid_channel() {
    let board = Board::new();
    let hub = ready(&board);
    let mut ttl = attached(&TTL, 4, &hub);
    let sent = board.wire().len();
    assert!(matches!(ttl.read_channel(&registers::TTL, 4), Err(Error::InvalidChannel {channel: 4, channels: 4})));
    assert!(matches!(ttl.write_channel(&registers::TTL, 9, 1), Err(Error::InvalidChannel {channel: 9, channels: 4})));
    assert_eq!(ttl.shadow(&registers::TTL, 4), None);
    assert_eq!(board.wire().len(), sent);
}

#[test]
fn channel_count() {
    for kind in KINDS {
        assert!(matches!(
            Peripheral::<Board>::new(kind, 0),
            Err(Error::InvalidChannelCount {count: 0, ..})));
        assert!(matches!(
            Peripheral::<Board>::new(kind, kind.max_channels + 1),
            Err(Error::InvalidChannelCount {..})));
        let peripheral = Peripheral::<Board>::new(kind, kind.max_channels).unwrap();
        assert_eq!(peripheral.channels(), kind.max_channels);
        assert_eq!(peripheral.state(), PeripheralState::Uninitialized);
    }
    assert!(matches!(Peripheral::<Board>::new(&TTL, 7), Err(Error::InvalidChannelCount {count: 7, max: 6})));
    assert!(Peripheral::<Board>::new(&ANALOG_INPUT, 8).is_ok());
}

#[test]
fn without_hub() {
    let board = Board::new();
    let _hub = ready(&board);
    let sent = board.wire().len();

    let mut ttl = Peripheral::<Board>::new(&TTL, 4).unwrap();
    assert!(matches!(ttl.read_channel(&registers::TTL, 0), Err(Error::NoHubConfigured)));
    assert!(matches!(ttl.initialize(None), Err(Error::NoHubConfigured)));
    assert_eq!(ttl.state(), PeripheralState::Uninitialized);
    assert!(matches!(ttl.write_channel(&registers::TTL, 0, 1), Err(Error::NoHubConfigured)));
    assert_eq!(board.wire().len(), sent);
}

#[test]
fn hub_not_ready() {
    let board = Board::new();
    let hub = Arc::new(Hub::new(board.clone(), Settings::new("/dev/ttyMOJO0")));
    let mut ttl = Peripheral::new(&TTL, 4).unwrap();
    assert!(matches!(ttl.initialize(Some(&hub)), Err(Error::HubNotReady)));
    assert_eq!(ttl.state(), PeripheralState::Uninitialized);

    // retrying once the hub is ready works
    hub.initialize().unwrap();
    ttl.initialize(Some(&hub)).unwrap();
    assert_eq!(ttl.state(), PeripheralState::Initialized);
}

#[test]
fn shutdown_is_final() {
    let board = Board::new();
    let hub = ready(&board);
    let mut ttl = attached(&TTL, 4, &hub);
    ttl.shutdown();
    assert_eq!(ttl.state(), PeripheralState::ShutDown);
    assert!(matches!(ttl.read_channel(&registers::TTL, 0), Err(Error::ShutDown)));
    assert!(matches!(ttl.initialize(Some(&hub)), Err(Error::ShutDown)));
    // the hub is not affected
    assert!(hub.is_ready());
}

#[test]
fn hub_dropped() {
    let board = Board::new();
    let hub = ready(&board);
    let mut ttl = attached(&TTL, 4, &hub);
    drop(hub);
    assert!(matches!(ttl.read_channel(&registers::TTL, 0), Err(Error::NoHubConfigured)));
}

#[test]
fn hub_shut_down() {
    let board = Board::new();
    let hub = ready(&board);
    let mut pwm = attached(&PWM, 1, &hub);
    pwm.write_channel(&registers::PWM, 0, 100).unwrap();

    hub.shutdown();
    assert!(matches!(pwm.write_channel(&registers::PWM, 0, 200), Err(Error::TransportUnavailable(_))));
    // shadow only follows confirmed transactions
    assert_eq!(pwm.shadow(&registers::PWM, 0), Some(100));
}

#[test]
#[serial]
fn failed_read_keeps_shadow() {
    let board = Board::new();
    let hub = ready(&board);
    board.set_register(41, 900);
    let mut servos = attached(&SERVOS, 4, &hub);
    assert_eq!(servos.read_channel(&registers::SERVO, 1).unwrap(), 900);

    board.silence();
    assert!(matches!(servos.read_channel(&registers::SERVO, 1), Err(Error::Timeout)));
    assert_eq!(servos.shadow(&registers::SERVO, 1), Some(900));
}

#[test]
fn refresh() {
    let board = Board::new();
    let hub = ready(&board);
    board.set_register(0, 3);
    board.set_register(12, 40);
    board.set_register(21, 7);
    let mut laser = attached(&LASER_TRIGGER, 3, &hub);
    let before = board.commands().len();

    laser.refresh().unwrap();
    assert_eq!(board.commands().len(), before + 9);
    assert_eq!(laser.shadow(&registers::LASER_MODE, 0), Some(3));
    assert_eq!(laser.shadow(&registers::LASER_DURATION, 2), Some(40));
    assert_eq!(laser.shadow(&registers::LASER_SEQUENCE, 1), Some(7));
    assert_eq!(laser.shadow(&registers::LASER_SEQUENCE, 0), Some(0));
}
