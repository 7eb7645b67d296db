use pricelight::error::PricelightError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        PricelightError::config("x"),
        PricelightError::Config { .. }
    ));
    assert!(matches!(
        PricelightError::clock_unavailable("x"),
        PricelightError::ClockUnavailable { .. }
    ));
    assert!(matches!(
        PricelightError::malformed("x"),
        PricelightError::MalformedData { .. }
    ));
    assert!(matches!(PricelightError::web("x"), PricelightError::Web { .. }));
}

#[test]
fn error_constructors_group_2() {
    let ser = PricelightError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, PricelightError::Serialization { .. }));
    assert!(matches!(PricelightError::io("x"), PricelightError::Io { .. }));
    assert!(matches!(
        PricelightError::network("x"),
        PricelightError::Network { .. }
    ));
    assert!(matches!(
        PricelightError::actuator("x"),
        PricelightError::Actuator { .. }
    ));
}

#[test]
fn error_constructors_group_3() {
    assert!(matches!(
        PricelightError::validation("f", "m"),
        PricelightError::Validation { .. }
    ));
    assert!(matches!(
        PricelightError::timeout("x"),
        PricelightError::Timeout { .. }
    ));
    assert!(matches!(
        PricelightError::bad_response(500),
        PricelightError::BadResponse { status: 500 }
    ));
    assert!(matches!(
        PricelightError::generic("x"),
        PricelightError::Generic { .. }
    ));
}

#[test]
fn display_messages() {
    let e = PricelightError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));

    let e = PricelightError::clock_unavailable("no route");
    assert_eq!(e.to_string(), "Clock unavailable: no route");
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let e: PricelightError = io.into();
    assert!(matches!(e, PricelightError::Io { .. }));
    assert!(!e.is_transient());
}
