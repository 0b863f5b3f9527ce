//! GROUP selection and LAST/NEXT navigation

use super::common::{start_server_with_group, TestClient};

#[tokio::test]
async fn test_group_selects_low_water_article() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    for i in 0..2 {
        client
            .post_simple("misc.test", &format!("a{i}"), "body")
            .await;
    }

    assert_eq!(client.command("GROUP misc.test").await, "211 2 1 2 misc.test");
    // Current article is the one at the low water mark
    let stat = client.command("STAT").await;
    assert!(stat.starts_with("223 1 "));
}

#[tokio::test]
async fn test_group_not_found() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;
    assert_eq!(
        client.command("GROUP no.such.group").await,
        "411 No such newsgroup"
    );
}

#[tokio::test]
async fn test_empty_group_selection() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    assert_eq!(client.command("GROUP misc.test").await, "211 0 0 0 misc.test");
    // No current article in an empty group
    assert!(client.command("STAT").await.starts_with("420 "));
}

#[tokio::test]
async fn test_next_and_last_walk_the_group() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    for i in 0..3 {
        client
            .post_simple("misc.test", &format!("a{i}"), "body")
            .await;
    }
    client.command("GROUP misc.test").await;

    // At the low water mark there is no previous article
    assert_eq!(
        client.command("LAST").await,
        "422 No previous article to retrieve"
    );

    let next = client.command("NEXT").await;
    assert!(next.starts_with("223 2 "), "got {next}");
    let next = client.command("NEXT").await;
    assert!(next.starts_with("223 3 "), "got {next}");

    // At the high water mark there is no next article
    assert_eq!(client.command("NEXT").await, "421 No next article to retrieve");

    let last = client.command("LAST").await;
    assert!(last.starts_with("223 2 "), "got {last}");
}

#[tokio::test]
async fn test_navigation_requires_group_and_article() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    assert!(client.command("LAST").await.starts_with("412 "));
    assert!(client.command("NEXT").await.starts_with("412 "));

    client.command("GROUP misc.test").await; // empty group, no article
    assert!(client.command("LAST").await.starts_with("420 "));
    assert!(client.command("NEXT").await.starts_with("420 "));
}

#[tokio::test]
async fn test_article_error_mapping() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    // Numeric argument without a selected group
    assert!(client.command("ARTICLE 1").await.starts_with("412 "));
    // Unknown Message-ID
    assert_eq!(
        client.command("ARTICLE <ghost@nowhere>").await,
        "430 No Such Article Found"
    );

    client.command("GROUP misc.test").await;
    assert_eq!(
        client.command("ARTICLE 99").await,
        "423 No article with that number"
    );
}

#[tokio::test]
async fn test_retrieval_by_msgid_moves_current_article() {
    let fixture = start_server_with_group().await;
    let mut client = TestClient::connect(fixture.addr).await;

    for i in 0..2 {
        client
            .post_simple("misc.test", &format!("a{i}"), "body")
            .await;
    }
    client.command("GROUP misc.test").await;
    let second = client.message_id_of(2).await;
    // Move back to the first article
    client.command("STAT 1").await;

    // Selecting by Message-ID repositions the session
    client.multiline_command(&format!("HEAD {second}")).await;
    let stat = client.command("STAT").await;
    assert!(stat.starts_with("223 2 "), "got {stat}");
}
