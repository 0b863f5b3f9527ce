//! Connection lifecycle: greeting, QUIT, unknown commands, error recovery

use super::common::{start_server, TestClient};

#[tokio::test]
async fn test_greeting_and_quit() {
    let fixture = start_server().await;
    let mut client = TestClient::connect(fixture.addr).await;

    assert_eq!(
        client.greeting,
        "201 YANS NNTP Service Ready, posting prohibited"
    );

    let reply = client.command("QUIT").await;
    assert_eq!(reply, "205 NNTP Service exits normally, bye!");
}

#[tokio::test]
async fn test_unknown_command_keeps_session_alive() {
    let fixture = start_server().await;
    let mut client = TestClient::connect(fixture.addr).await;

    assert_eq!(client.command("FROBNICATE").await, "500 Unknown command");

    // Session still works afterwards
    let date = client.command("DATE").await;
    assert!(date.starts_with("111 "));
}

#[tokio::test]
async fn test_syntax_error_keeps_session_alive() {
    let fixture = start_server().await;
    let mut client = TestClient::connect(fixture.addr).await;

    assert_eq!(client.command("GROUP").await, "501 Syntax Error");
    assert_eq!(client.command("MODE WRITER").await, "501 Syntax Error");

    let reply = client.command("QUIT").await;
    assert!(reply.starts_with("205 "));
}

#[tokio::test]
async fn test_every_reply_starts_with_three_digits() {
    let fixture = start_server().await;
    let mut client = TestClient::connect(fixture.addr).await;

    for command in ["DATE", "NOPE", "GROUP missing.group", "LAST", "NEXT"] {
        let reply = client.command(command).await;
        let bytes = reply.as_bytes();
        assert!(bytes.len() > 4, "short reply to {command}: {reply}");
        assert!(
            bytes[..3].iter().all(|b| b.is_ascii_digit()) && bytes[3] == b' ',
            "malformed status line for {command}: {reply}"
        );
        assert!(
            (b'1'..=b'5').contains(&bytes[0]),
            "status class out of range for {command}: {reply}"
        );
    }
}

#[tokio::test]
async fn test_concurrent_sessions_are_independent() {
    let fixture = start_server().await;
    fixture
        .backend
        .create_group("misc.test", None)
        .await
        .unwrap();

    let mut first = TestClient::connect(fixture.addr).await;
    let mut second = TestClient::connect(fixture.addr).await;

    assert!(first.command("GROUP misc.test").await.starts_with("211 "));
    // The second session has no group selected
    assert!(second.command("LISTGROUP").await.starts_with("412 "));

    assert_eq!(fixture.server.session_count(), 2);
}

#[tokio::test]
async fn test_shutdown_cancels_sessions() {
    let fixture = start_server().await;
    let _client = TestClient::connect(fixture.addr).await;

    fixture.server.stop();
    // Cancellation is observed at the next suspension point
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(fixture.server.session_count(), 0);
}
