use std::time::Duration;
use serial_test::serial;

use mojocat::{
    board::Board,
    hub::*,
    };


fn setup(board: &Board) -> Hub<Board> {
    let _ = env_logger::builder().is_test(true).try_init();
    Hub::new(board.clone(), Settings::new("/dev/ttyMOJO0"))
}


#[test]
fn misconfigured() {
    let board = Board::new();
    let hub = Hub::new(board.clone(), Settings::default());
    assert_eq!(hub.detect(), Detection::Misconfigured);
    hub.set_port("Undefined");
    assert_eq!(hub.detect(), Detection::Misconfigured);
    hub.set_port("unknown");
    assert_eq!(hub.detect(), Detection::Misconfigured);
    assert!(board.connections().is_empty());
}

#[test]
#[serial]
fn can_communicate() {
    let board = Board::new();
    let hub = setup(&board);
    let default = Settings::default().answer_timeout;

    assert_eq!(hub.detect(), Detection::CanCommunicate);
    // the probe opens its own link, with a longer timeout
    assert_eq!(board.connections().len(), 1);
    assert_eq!(board.connections()[0].answer_timeout, PROBE_TIMEOUT);
    assert_eq!(hub.link().answer_timeout, default);
    assert_eq!(hub.state(), HubState::Uninitialized);

    hub.initialize().unwrap();
    assert_eq!(board.connections().len(), 2);
    assert_eq!(board.connections()[1].answer_timeout, default);
}

#[test]
#[serial]
fn silent_board() {
    let board = Board::new();
    board.silence();
    let hub = setup(&board);
    assert_eq!(hub.detect(), Detection::CanNotCommunicate);
    assert_eq!(hub.link().answer_timeout, Duration::from_millis(20));
}

#[test]
fn unplugged_board() {
    let board = Board::new();
    board.unplug();
    let hub = setup(&board);
    assert_eq!(hub.detect(), Detection::CanNotCommunicate);
    assert_eq!(hub.link().answer_timeout, Duration::from_millis(20));
}

#[test]
#[serial]
fn other_firmware() {
    // detection only tells whether something answers, the version is checked at initialization
    let board = Board::with_version(3);
    let hub = setup(&board);
    assert_eq!(hub.detect(), Detection::CanCommunicate);
    assert!(matches!(hub.initialize(), Err(Error::VersionMismatch {found: 3, ..})));
}

#[test]
fn ready_hub() {
    let board = Board::new();
    let hub = setup(&board);
    hub.initialize().unwrap();
    assert_eq!(hub.detect(), Detection::CanCommunicate);
    assert_eq!(board.connections().len(), 1);
}
