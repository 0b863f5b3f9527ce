//! OVER / XOVER rows

use super::common::{start_server_with_group, TestClient};

fn fields(row: &str) -> Vec<&str> {
    row.split('\t').collect()
}

#[tokio::test]
async fn test_over_for_current_article() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    client
        .post_simple("misc.test", "overview me", "line one\nline two\n")
        .await;
    client.command("GROUP misc.test").await;

    let (status, rows) = client.multiline_command("OVER").await;
    assert_eq!(status, "224 Overview information follows");
    assert_eq!(rows.len(), 1);

    let row = fields(&rows[0]);
    assert_eq!(row.len(), 8);
    assert_eq!(row[0], "1");
    assert_eq!(row[1], "overview me");
    assert_eq!(row[2], "tester@example.org");
    assert!(row[4].starts_with('<') && row[4].ends_with('>'));
    // :bytes is the MIME-encoded article size, :lines counts body newlines
    assert!(row[6].parse::<usize>().unwrap() > 0);
    assert_eq!(row[7], "2");
}

#[tokio::test]
async fn test_over_range_and_single_number() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    for i in 0..3 {
        client
            .post_simple("misc.test", &format!("a{i}"), "body")
            .await;
    }
    client.command("GROUP misc.test").await;

    let (_, all) = client.multiline_command("OVER 1-3").await;
    assert_eq!(all.len(), 3);

    let (_, second) = client.multiline_command("OVER 2").await;
    assert_eq!(second.len(), 1);
    assert!(second[0].starts_with("2\t"));

    let (_, open) = client.multiline_command("XOVER 2-").await;
    assert_eq!(open.len(), 2);
}

#[tokio::test]
async fn test_over_by_msgid_reports_number_zero() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    client.post_simple("misc.test", "subject", "body").await;
    client.command("GROUP misc.test").await;
    let message_id = client.message_id_of(1).await;

    let (_, rows) = client.multiline_command(&format!("OVER {message_id}")).await;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("0\t"));
}

#[tokio::test]
async fn test_over_error_mapping() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    // No current article, no argument
    assert!(client.command("OVER").await.starts_with("420 "));
    // Range without a group
    assert!(client.command("OVER 1-2").await.starts_with("412 "));
    // Unknown Message-ID
    assert!(client.command("OVER <ghost@x>").await.starts_with("430 "));

    client.post_simple("misc.test", "subject", "body").await;
    client.command("GROUP misc.test").await;
    // Inverted range is empty
    assert!(client.command("OVER 5-2").await.starts_with("423 "));
}
