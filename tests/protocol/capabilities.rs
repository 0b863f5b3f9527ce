//! CAPABILITIES, MODE READER, DATE, HELP

use super::common::{start_server, TestClient};

#[tokio::test]
async fn test_capabilities_transit_set() {
    let fixture = start_server().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let (status, lines) = client.multiline_command("CAPABILITIES").await;
    assert_eq!(status, "101 Capability list:");
    assert!(lines.contains(&"VERSION 2".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("IMPLEMENTATION yans ")));
    assert!(lines.contains(&"MODE-READER".to_string()));
    assert!(lines.contains(&"OVER MSGID".to_string()));
    assert!(lines.contains(&"IHAVE".to_string()));
}

#[tokio::test]
async fn test_mode_reader_rewrites_capabilities() {
    let fixture = start_server().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let reply = client.command("MODE READER").await;
    assert_eq!(reply, "201 Reader mode, posting prohibited");

    let (_, lines) = client.multiline_command("CAPABILITIES").await;
    assert!(lines.contains(&"READER".to_string()));
    assert!(lines.contains(&"LIST ACTIVE NEWSGROUPS OVERVIEW.FMT".to_string()));
    assert!(!lines.contains(&"MODE-READER".to_string()));
}

#[tokio::test]
async fn test_date_format() {
    let fixture = start_server().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let reply = client.command("DATE").await;
    let (code, stamp) = reply.split_once(' ').expect("code and stamp");
    assert_eq!(code, "111");
    assert_eq!(stamp.len(), 14);
    assert!(stamp.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_help_lists_commands() {
    let fixture = start_server().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let (status, lines) = client.multiline_command("HELP").await;
    assert_eq!(status, "100 Legal commands");
    let text = lines.join("\n");
    for verb in ["ARTICLE", "GROUP", "POST", "IHAVE", "NEWTHREADS", "THREAD"] {
        assert!(text.contains(verb), "HELP misses {verb}");
    }
}
