//! POST, retrieval, and attachment handling

use super::common::{start_server_with_group, TestClient};

#[tokio::test]
async fn test_post_then_retrieve() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let status = client
        .post(&[
            "Subject: hi",
            "Newsgroups: misc.test",
            "From: tester@example.org",
            "",
            "hello",
        ])
        .await;
    assert_eq!(status, "240 Article received OK");

    assert_eq!(client.command("GROUP misc.test").await, "211 1 1 1 misc.test");

    let (status, lines) = client.multiline_command("ARTICLE 1").await;
    let mut words = status.split_whitespace();
    assert_eq!(words.next(), Some("220"));
    assert_eq!(words.next(), Some("1"));
    let message_id = words.next().expect("message-id");
    assert!(message_id.starts_with('<'));
    assert!(message_id.ends_with("@test.example.org>"));
    assert_eq!(words.next(), Some("article"));

    let text = lines.join("\n");
    // Server-generated headers
    assert!(text.contains(&format!("Message-Id: {message_id}")));
    assert!(text.contains("Path: test.example.org!not-for-mail"));
    assert!(text.contains("Date: "));
    // And the body after the blank line
    assert!(lines.contains(&String::new()));
    assert!(lines.contains(&"hello".to_string()));
}

#[tokio::test]
async fn test_article_by_msgid_then_stat_agree() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    client.post_simple("misc.test", "subject", "body").await;
    client.command("GROUP misc.test").await;
    let message_id = client.message_id_of(1).await;

    let (article_status, _) = client
        .multiline_command(&format!("ARTICLE {message_id}"))
        .await;
    let stat_status = client.command("STAT").await;

    let article_pos: Vec<&str> = article_status.split_whitespace().skip(1).take(2).collect();
    let stat_pos: Vec<&str> = stat_status.split_whitespace().skip(1).take(2).collect();
    assert_eq!(article_pos, stat_pos);
}

#[tokio::test]
async fn test_body_lines_are_dot_stuffed_on_the_wire() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    // ".hidden" must be sent stuffed by the client...
    let status = client
        .post(&[
            "Subject: dots",
            "Newsgroups: misc.test",
            "From: tester@example.org",
            "",
            "..hidden",
            "visible",
        ])
        .await;
    assert_eq!(status, "240 Article received OK");
    client.command("GROUP misc.test").await;

    // ...and comes back stuffed in BODY output
    let (status, raw_lines) = client.multiline_command("BODY 1").await;
    assert!(status.starts_with("222 "));
    assert!(raw_lines.contains(&"..hidden".to_string()));
    assert!(raw_lines.contains(&"visible".to_string()));
}

#[tokio::test]
async fn test_post_reply_to_unknown_article_fails() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let status = client
        .post(&[
            "Subject: orphan",
            "Newsgroups: misc.test",
            "In-Reply-To: <ghost@nowhere>",
            "",
            "body",
        ])
        .await;
    assert_eq!(status, "441 no such message you are replying to");
}

#[tokio::test]
async fn test_post_to_unknown_group_fails() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let status = client
        .post(&["Subject: lost", "Newsgroups: no.such.group", "", "body"])
        .await;
    assert_eq!(status, "441 no such newsgroup: no.such.group");
}

#[tokio::test]
async fn test_post_with_image_attachment() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let status = client
        .post(&[
            "Subject: with image",
            "Newsgroups: misc.test",
            "MIME-Version: 1.0",
            "Content-Type: multipart/mixed; boundary=\"frontier\"",
            "",
            "--frontier",
            "Content-Type: text/plain",
            "",
            "see attached",
            "--frontier",
            "Content-Type: image/png",
            "Content-Disposition: attachment; filename=\"pixel.png\"",
            "Content-Transfer-Encoding: base64",
            "",
            "iVBORw0KGgo=",
            "--frontier--",
        ])
        .await;
    assert_eq!(status, "240 Article received OK");

    // The attachment landed in the upload directory as <uuid>.png
    let stored: Vec<_> = std::fs::read_dir(fixture.upload_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ends_with(".png"));

    // ARTICLE reproduces a multipart tree carrying the attachment
    client.command("GROUP misc.test").await;
    let (_, lines) = client.multiline_command("ARTICLE 1").await;
    let text = lines.join("\n");
    assert!(text.contains("Content-Type: multipart/mixed; boundary="));
    assert!(text.contains("Content-Type: image/png"));
    assert!(text.contains("see attached"));
}

#[tokio::test]
async fn test_post_with_disallowed_attachment_type() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    let status = client
        .post(&[
            "Subject: nasty",
            "Newsgroups: misc.test",
            "MIME-Version: 1.0",
            "Content-Type: multipart/mixed; boundary=\"frontier\"",
            "",
            "--frontier",
            "Content-Type: text/plain",
            "",
            "payload below",
            "--frontier",
            "Content-Type: application/x-executable",
            "Content-Disposition: attachment; filename=\"evil.bin\"",
            "Content-Transfer-Encoding: base64",
            "",
            "AAAA",
            "--frontier--",
        ])
        .await;
    assert_eq!(status, "441 disallowed attachment type");
}

#[tokio::test]
async fn test_listgroup_lists_numbers() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    for i in 0..3 {
        client
            .post_simple("misc.test", &format!("a{i}"), "body")
            .await;
    }

    let (status, lines) = client.multiline_command("LISTGROUP misc.test").await;
    assert_eq!(status, "211 3 1 3 misc.test list follows");
    assert_eq!(lines, vec!["1", "2", "3"]);

    let (_, ranged) = client.multiline_command("LISTGROUP misc.test 2-3").await;
    assert_eq!(ranged, vec!["2", "3"]);

    let (_, open) = client.multiline_command("LISTGROUP misc.test 2-").await;
    assert_eq!(open, vec!["2", "3"]);
}
