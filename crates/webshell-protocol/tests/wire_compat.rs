// Verify wire format matches what the browser terminal sends and expects.
// These tests ensure protocol compatibility is never broken.

use webshell_protocol::{Operation, TerminalMessage};

#[test]
fn stdin_frame_decodes() {
    let json = r#"{"operation":"stdin","data":"ls -la\r"}"#;
    let msg: TerminalMessage = serde_json::from_str(json).unwrap();

    assert_eq!(msg.kind(), Some(Operation::Stdin));
    assert_eq!(msg.data, "ls -la\r");
}

#[test]
fn resize_frame_decodes() {
    let json = r#"{"operation":"resize","cols":120,"rows":40}"#;
    let msg: TerminalMessage = serde_json::from_str(json).unwrap();

    assert_eq!(msg.kind(), Some(Operation::Resize));
    assert_eq!(msg.cols, 120);
    assert_eq!(msg.rows, 40);
    assert!(msg.data.is_empty());
}

#[test]
fn ping_frame_decodes() {
    let msg: TerminalMessage = serde_json::from_str(r#"{"operation":"ping"}"#).unwrap();
    assert_eq!(msg.kind(), Some(Operation::Ping));
}

#[test]
fn extra_fields_are_ignored() {
    let json = r#"{"operation":"stdin","data":"x","sessionId":"abc"}"#;
    let msg: TerminalMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.data, "x");
}

#[test]
fn null_fields_decode_as_zero_values() {
    let msg: TerminalMessage =
        serde_json::from_str(r#"{"operation":"stdin","data":null}"#).unwrap();
    assert_eq!(msg.kind(), Some(Operation::Stdin));
    assert!(msg.data.is_empty());

    let json = r#"{"operation":"resize","data":null,"cols":120,"rows":null}"#;
    let msg: TerminalMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.kind(), Some(Operation::Resize));
    assert_eq!(msg.cols, 120);
    assert_eq!(msg.rows, 0);

    let msg: TerminalMessage = serde_json::from_str(r#"{"operation":null}"#).unwrap();
    assert_eq!(msg.kind(), None);
}

#[test]
fn oversized_dimensions_are_rejected() {
    let json = r#"{"operation":"resize","cols":70000,"rows":40}"#;
    assert!(serde_json::from_str::<TerminalMessage>(json).is_err());
}

#[test]
fn stdout_frame_shape() {
    let json = serde_json::to_string(&TerminalMessage::stdout("hello\r\n")).unwrap();

    assert_eq!(json, r#"{"operation":"stdout","data":"hello\r\n"}"#);
    // size fields must be absent on output frames
    assert!(!json.contains("cols"));
    assert!(!json.contains("rows"));
}

#[test]
fn stdout_frame_keeps_empty_data() {
    let json = serde_json::to_string(&TerminalMessage::stdout("")).unwrap();
    assert!(json.contains(r#""data":"""#));
}

#[test]
fn resize_frame_serializes_dimensions() {
    let json = serde_json::to_string(&TerminalMessage::resize(80, 24)).unwrap();
    assert!(json.contains(r#""operation":"resize""#));
    assert!(json.contains(r#""cols":80"#));
    assert!(json.contains(r#""rows":24"#));
}
