use ovenlink_core::protocol::frame::{encode_frame, Address};
use ovenlink_core::protocol::mock::MockConnector;
use ovenlink_core::protocol::transport::Parity;
use ovenlink_core::protocol::{
    ErrorKind, LineConfig, OperationMode, ProtocolError, Session, Signal, Transaction,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::thread;

type MockSession = Session<MockConnector>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open_session(connector: &MockConnector) -> MockSession {
    init_tracing();
    let mut session = Session::new(connector.clone());
    session.open(&LineConfig::default()).expect("mock open");
    session
}

#[test]
fn test_open_uses_line_config() {
    let connector = MockConnector::new();
    let session = open_session(&connector);
    assert!(session.is_open());

    let config = connector.state().last_config.clone().unwrap();
    assert_eq!(config, LineConfig::default());
    assert_eq!(config.parity, Parity::Even);
}

#[test]
fn test_open_twice_reports_already_opened() {
    let connector = MockConnector::new();
    let mut session = open_session(&connector);

    let err = session.open(&LineConfig::default()).unwrap_err();
    assert_eq!(err, ProtocolError::AlreadyOpen);
    assert_eq!(err.to_string(), "already opened");
    assert!(session.is_open());
    assert_eq!(connector.state().opens, 1);
}

#[test]
fn test_open_failure_leaves_session_closed() {
    init_tracing();
    let connector = MockConnector::new();
    connector.fail_open("device busy");
    let mut session = Session::new(connector.clone());

    let err = session.open(&LineConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PortUnavailable);
    assert!(err.to_string().contains("device busy"));
    assert!(!session.is_open());
}

#[test]
fn test_close_when_closed_reports_not_open() {
    let mut session = Session::new(MockConnector::new());
    assert_eq!(session.close(), Err(ProtocolError::NotOpen));
}

#[test]
fn test_close_then_reopen() {
    let connector = MockConnector::new();
    let mut session = open_session(&connector);

    assert_eq!(session.close(), Ok(()));
    assert!(!session.is_open());
    assert_eq!(connector.state().closes, 1);

    session.open(&LineConfig::default()).unwrap();
    assert!(session.is_open());
    assert_eq!(connector.state().opens, 2);
}

#[test]
fn test_close_failure_still_releases_line() {
    let connector = MockConnector::new();
    let mut session = open_session(&connector);
    connector.fail_close("stuck");

    let err = session.close().unwrap_err();
    assert_eq!(err, ProtocolError::CloseFailed("stuck".to_string()));
    assert!(!session.is_open());
}

#[test]
fn test_drop_closes_line() {
    let connector = MockConnector::new();
    {
        let _session = open_session(&connector);
    }
    assert_eq!(connector.state().closes, 1);
}

#[test]
fn test_read_on_closed_session_does_no_io() {
    let connector = MockConnector::new();
    connector.reply_frame("@010100");
    let mut session = Session::new(connector.clone());

    let tx = session.read_register(Signal::AnalogData, "", "");
    assert_eq!(tx.error().map(|e| e.kind()), Some(ErrorKind::PortUnavailable));
    assert_eq!(tx.status(), "port not open");
    assert_eq!(tx.request(), "");
    assert!(connector.written().is_empty());
    assert_eq!(connector.state().discards, 0);
}

#[test]
fn test_read_register_decodes_body() {
    let connector = MockConnector::new();
    connector.reply("@01010040*\r");
    let mut session = open_session(&connector);

    let tx = session.analog_data();
    assert!(tx.is_ok(), "{}", tx.status());
    assert_eq!(tx.value().map(String::as_str), Some("@010100"));
    assert_eq!(tx.status(), "read successful");
    assert_eq!(tx.request(), "@010140*\r");
    assert_eq!(tx.response(), "@01010040*\r");
    assert_eq!(connector.written(), vec!["@010140*\r".to_string()]);
}

#[test]
fn test_buffers_discarded_before_each_exchange() {
    let connector = MockConnector::new();
    connector.reply_frame("@015100").reply_frame("@015100");
    let mut session = open_session(&connector);

    session.digital_data();
    session.digital_data();
    assert_eq!(connector.state().discards, 2);
}

#[test]
fn test_connector_sees_session_traffic() {
    let mut session = open_session(&MockConnector::new());
    session.connector().reply_frame("@018000");

    let tx = session.remaining_steps();
    assert!(tx.is_ok());
    assert_eq!(session.connector().written(), vec![tx.request().to_string()]);
    assert_eq!(session.connector().state().opens, 1);
}

#[test]
fn test_checksum_error_keeps_raw_response() {
    let connector = MockConnector::new();
    connector.reply("@01010041*\r");
    let mut session = open_session(&connector);

    let tx = session.analog_data();
    assert_eq!(tx.error().map(|e| e.kind()), Some(ErrorKind::ChecksumMismatch));
    assert!(tx.status().starts_with("checksum error"));
    assert_eq!(tx.response(), "@01010041*\r");
    assert!(session.is_open());
}

#[test]
fn test_empty_line_is_empty_response() {
    let connector = MockConnector::new();
    connector.reply("\r");
    let mut session = open_session(&connector);

    let tx = session.remaining_steps();
    assert_eq!(tx.into_result(), Err(ProtocolError::EmptyResponse));
}

#[test]
fn test_timeout_is_transport_fault() {
    let connector = MockConnector::new();
    let mut session = open_session(&connector);

    let tx = session.operation_setting();
    assert_eq!(tx.error(), Some(&ProtocolError::Timeout));
    assert_eq!(tx.error().map(|e| e.kind()), Some(ErrorKind::TransportFault));
    assert_eq!(tx.request(), encode_frame("@0122"));
    assert_eq!(tx.response(), "");
    assert!(session.is_open());
}

#[test]
fn test_read_fault_is_reported_verbatim() {
    let connector = MockConnector::new();
    connector.reply_error(ProtocolError::TransportFault("framing error".to_string()));
    let mut session = open_session(&connector);

    let tx = session.step_setting();
    assert_eq!(tx.status(), "transport error: framing error");
    assert_eq!(connector.written().len(), 1);
    assert_eq!(session.counters().rx_frames, 0);
}

#[test]
fn test_write_failure_is_transport_fault() {
    let connector = MockConnector::new();
    let mut session = open_session(&connector);
    connector.fail_write("cable unplugged");

    let tx = session.digital_data();
    assert_eq!(
        tx.error(),
        Some(&ProtocolError::TransportFault("cable unplugged".to_string()))
    );
    assert_eq!(session.counters().tx_frames, 0);
}

#[test]
fn test_every_typed_read_uses_its_signal() {
    let connector = MockConnector::new();
    let mut session = open_session(&connector);

    let reads: Vec<(Signal, fn(&mut MockSession) -> Transaction<String>)> = vec![
        (Signal::AnalogData, MockSession::analog_data),
        (Signal::DigitalData, MockSession::digital_data),
        (Signal::RemainingSteps, MockSession::remaining_steps),
        (Signal::OperationSetting, MockSession::operation_setting),
        (Signal::PidZoneSetting, MockSession::pid_zone_setting),
        (Signal::ConstValueSetting, MockSession::const_value_setting),
        (Signal::StepSetting, MockSession::step_setting),
        (Signal::TimeSignalSetting, MockSession::time_signal_setting),
        (Signal::RepeatSetting, MockSession::repeat_setting),
        (Signal::PidParameterSetting, MockSession::pid_parameter_setting),
        (Signal::OnOffSystemSetting, MockSession::on_off_system_setting),
    ];

    for (signal, read) in reads {
        let body = format!("@01{}0000", signal.code());
        connector.reply_frame(&body);

        let tx = read(&mut session);
        assert_eq!(tx.value(), Some(&body), "{:?}", signal);
        assert_eq!(tx.request(), encode_frame(&format!("@01{}", signal.code())));
    }
}

#[test]
fn test_repeated_reads_are_stable() {
    let connector = MockConnector::new();
    connector
        .reply_frame("@0151001100")
        .reply_frame("@0151001100");
    let mut session = open_session(&connector);

    let first = session.digital_data().into_result().unwrap();
    let second = session.digital_data().into_result().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_address_substitution() {
    init_tracing();
    let connector = MockConnector::new();
    connector.reply_frame("@070100");
    let mut session = Session::with_address(connector.clone(), Address::new("07").unwrap());
    session.open(&LineConfig::default()).unwrap();

    let tx = session.analog_data();
    assert!(tx.is_ok());
    assert!(tx.request().starts_with("@0701"));
}

#[test]
fn test_set_operation_mode_accepts_matching_ack() {
    let connector = MockConnector::new();
    connector.reply_frame("@01530100");
    let mut session = open_session(&connector);

    let tx = session.set_operation_mode(OperationMode::Run);
    assert!(tx.is_ok(), "{}", tx.status());
    assert_eq!(tx.status(), "operation setting succeeded");
    assert_eq!(connector.written(), vec![encode_frame("@0153011")]);
}

#[test]
fn test_set_operation_mode_rejects_wrong_mode() {
    let connector = MockConnector::new();
    connector.reply_frame("@01530200");
    let mut session = open_session(&connector);

    let tx = session.set_operation_mode(OperationMode::Run);
    assert_eq!(
        tx.error().map(|e| e.kind()),
        Some(ErrorKind::AcknowledgementMismatch)
    );
    assert!(tx.status().starts_with("operation setting failed"));
}

#[test]
fn test_set_operation_mode_rejects_wrong_signal() {
    let connector = MockConnector::new();
    connector.reply_frame("@01220100");
    let mut session = open_session(&connector);

    let tx = session.set_operation_mode(OperationMode::Run);
    assert_eq!(
        tx.error().map(|e| e.kind()),
        Some(ErrorKind::AcknowledgementMismatch)
    );
}

#[test]
fn test_set_operation_mode_checks_fcs_first() {
    let connector = MockConnector::new();
    connector.reply("@0153010000*\r");
    let mut session = open_session(&connector);

    let tx = session.set_operation_mode(OperationMode::Run);
    assert_eq!(tx.error().map(|e| e.kind()), Some(ErrorKind::ChecksumMismatch));
}

#[test]
fn test_set_operation_mode_short_ack() {
    let connector = MockConnector::new();
    connector.reply_frame("@0153");
    let mut session = open_session(&connector);

    let tx = session.set_operation_mode(OperationMode::Stop);
    assert_eq!(
        tx.error().map(|e| e.kind()),
        Some(ErrorKind::AcknowledgementMismatch)
    );
}

#[test]
fn test_set_const_value_payload_and_weak_ack() {
    let connector = MockConnector::new();
    // Any answer counts, even one with a broken FCS
    connector.reply("garbage\r");
    let mut session = open_session(&connector);

    let tx = session.set_const_value(250, 5);
    assert!(tx.is_ok(), "{}", tx.status());
    assert_eq!(tx.status(), "write successful");
    assert_eq!(
        connector.written(),
        vec![encode_frame("@0115025000000005000000010000")]
    );
}

#[test]
fn test_set_const_value_rejects_wide_field_without_io() {
    let connector = MockConnector::new();
    let mut session = open_session(&connector);

    let tx = session.set_const_value(12000, 0);
    assert_eq!(tx.error().map(|e| e.kind()), Some(ErrorKind::InvalidField));
    assert!(connector.written().is_empty());
}

#[test]
fn test_set_step() {
    let connector = MockConnector::new();
    connector.reply_frame("@0110");
    let mut session = open_session(&connector);

    let tx = session.set_step(3, 7);
    assert!(tx.is_ok());
    assert_eq!(tx.request(), encode_frame("@01100307"));
}

#[test]
fn test_set_run_mode_init() {
    let connector = MockConnector::new();
    connector.reply_frame("@0112");
    let mut session = open_session(&connector);

    let tx = session.set_run_mode_init();
    assert!(tx.is_ok());
    assert_eq!(tx.request(), encode_frame("@01120A000000101210096015E"));
}

#[test]
fn test_weak_write_still_fails_on_timeout() {
    let connector = MockConnector::new();
    let mut session = open_session(&connector);

    let tx = session.set_run_mode_init();
    assert_eq!(tx.into_result(), Err(ProtocolError::Timeout));
}

#[test]
fn test_shared_session_serializes_callers() {
    let connector = MockConnector::new();
    for _ in 0..8 {
        connector.reply_frame("@015100");
    }
    let session = Arc::new(Mutex::new(open_session(&connector)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.lock().unwrap().digital_data().is_ok())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(session.lock().unwrap().counters().rx_frames, 8);
}

#[test]
fn test_line_config_from_partial_json() {
    let config: LineConfig = serde_json::from_str(r#"{ "baud_rate": 19200 }"#).unwrap();
    assert_eq!(config.baud_rate, 19200);
    assert_eq!(config.parity, Parity::Even);
    assert_eq!(config.read_timeout_ms, 1000);
}

#[test]
fn test_address_from_json_is_validated() {
    let ok: Address = serde_json::from_str(r#""02""#).unwrap();
    assert_eq!(ok.as_str(), "02");
    assert!(serde_json::from_str::<Address>(r#""123""#).is_err());
}
