//! Reply threading, NEWTHREADS, THREAD

use yans::StorageBackend;

use super::common::{start_server_with_group, TestClient};

/// Post a reply via In-Reply-To and return the status line.
async fn post_reply(client: &mut TestClient, parent: &str, subject: &str) -> String {
    client
        .post(&[
            &format!("Subject: {subject}"),
            "Newsgroups: misc.test",
            "From: tester@example.org",
            &format!("In-Reply-To: {parent}"),
            "",
            "reply body",
        ])
        .await
}

#[tokio::test]
async fn test_reply_chains_flatten_to_one_thread() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    // A starts the thread
    client.post_simple("misc.test", "root", "root body").await;
    client.command("GROUP misc.test").await;
    let a = client.message_id_of(1).await;

    // B replies to A, C replies to B; both anchor at A
    assert_eq!(post_reply(&mut client, &a, "re: root").await, "240 Article received OK");
    let b = client.message_id_of(2).await;
    assert_eq!(post_reply(&mut client, &b, "re: re: root").await, "240 Article received OK");

    let (status, members) = client.multiline_command("THREAD 1").await;
    assert_eq!(status, "226 Thread articles follows");
    assert_eq!(members, vec!["1", "2", "3"]);

    // THREAD through a reply resolves to the same thread
    let (_, via_reply) = client.multiline_command("THREAD 3").await;
    assert_eq!(via_reply, members);
}

#[tokio::test]
async fn test_newthreads_lists_roots_newest_first() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    client.post_simple("misc.test", "first thread", "body").await;
    client.command("GROUP misc.test").await;
    let first_root = client.message_id_of(1).await;
    post_reply(&mut client, &first_root, "reply").await;
    client.post_simple("misc.test", "second thread", "body").await;

    let (status, roots) = client.multiline_command("NEWTHREADS 10 1").await;
    assert_eq!(status, "225 New thread numbers follows");
    // Replies are not roots; newest root first
    assert_eq!(roots, vec!["3", "1"]);

    // Pagination: one root per page
    let (_, page1) = client.multiline_command("NEWTHREADS 1 1").await;
    let (_, page2) = client.multiline_command("NEWTHREADS 1 2").await;
    assert_eq!(page1, vec!["3"]);
    assert_eq!(page2, vec!["1"]);
}

#[tokio::test]
async fn test_thread_extension_errors() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    // Both extensions need a selected group
    assert!(client.command("NEWTHREADS 10 1").await.starts_with("412 "));
    assert!(client.command("THREAD 1").await.starts_with("412 "));

    client.command("GROUP misc.test").await;
    assert!(client.command("THREAD 99").await.starts_with("423 "));
    assert_eq!(client.command("THREAD").await, "501 Syntax Error");
    assert_eq!(client.command("NEWTHREADS 10").await, "501 Syntax Error");
    assert_eq!(client.command("NEWTHREADS x y").await, "501 Syntax Error");
}

#[tokio::test]
async fn test_thread_anchor_is_stored_canonically() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    client.post_simple("misc.test", "root", "body").await;
    client.command("GROUP misc.test").await;
    let a = client.message_id_of(1).await;
    post_reply(&mut client, &a, "b").await;
    let b = client.message_id_of(2).await;
    post_reply(&mut client, &b, "c").await;

    // C replied to B but its stored anchor is A (two-level threads)
    let c = fixture
        .backend
        .get_article_by_number(
            &fixture.backend.get_group("misc.test").await.unwrap(),
            3,
        )
        .await
        .unwrap();
    assert_eq!(c.thread.as_deref(), Some(a.as_str()));
}
