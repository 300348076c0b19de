use harvest_common::{Record, RedditComment, RedditPost};
use harvest_config::{HarvestConfig, HarvestConfigLoader};
use harvest_pipeline::reddit::run_reddit;
use harvest_pipeline::{RunContext, RunStatus};
use serde_json::{Value, json};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 2025-02-01, 2024-06-01, 2024-05-01, 2022-12-01 (all 00:00 UTC)
const AFTER_WINDOW: f64 = 1_738_368_000.0;
const JUNE: f64 = 1_717_200_000.0;
const MAY: f64 = 1_714_521_600.0;
const BEFORE_WINDOW: f64 = 1_669_852_800.0;

fn post(id: &str, title: &str, created: f64) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "subreddit": "worldnews",
            "author": "reporter",
            "created_utc": created,
            "title": title,
            "selftext": "",
            "score": 42,
            "num_comments": 7,
            "upvote_ratio": 0.93,
            "url": format!("https://example.org/{id}"),
            "permalink": format!("/r/worldnews/comments/{id}/x/"),
            "is_self": false
        }
    })
}

fn config(server: &MockServer, dir: &Path, extra: &str) -> HarvestConfig {
    HarvestConfigLoader::new()
        .with_yaml_str(&format!(
            r#"
output:
  dir: "{dir}"
  dataset: test
collection:
  delay_ms: 0
reddit:
  base_url: "{base}"
  subreddits: [worldnews]
  keywords: [Israel, Gaza]
{extra}
"#,
            dir = dir.display(),
            base = server.uri(),
        ))
        .load()
        .unwrap()
}

async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/r/worldnews/new.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": {
                "after": "t3_more",
                "children": [
                    post("future", "Israel tomorrow", AFTER_WINDOW),
                    post("p1", "Israel strikes back", JUNE),
                    post("p2", "Weather report", MAY),
                    post("old", "Israel in 2022", BEFORE_WINDOW)
                ]
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn listing_keeps_matching_posts_inside_window() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&server, dir.path(), "");
    let ctx = RunContext::from_config(&cfg).unwrap();

    let run = run_reddit(cfg.reddit.as_ref().unwrap(), &ctx).await.unwrap();
    assert_eq!(run.status, RunStatus::Ok);
    assert_eq!(run.records, 1);

    let posts = read_json(&dir.path().join("reddit_test.json"));
    let posts = posts.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["post_id"], "p1");
    assert_eq!(posts[0]["keyword"], "Israel");
    assert_eq!(posts[0]["permalink"], "https://reddit.com/r/worldnews/comments/p1/x/");

    let mut csv = csv::Reader::from_path(dir.path().join("reddit_test.csv")).unwrap();
    let header: Vec<String> = csv.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, RedditPost::FIELDS);
    let rows: Vec<csv::StringRecord> = csv.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "p1");

    let summary = read_json(&dir.path().join("reddit_test_summary.json"));
    assert_eq!(summary["total_records"], 1);
    assert_eq!(summary["unique_sources"], 1);
    assert!(!dir.path().join("reddit_test_comments.json").exists());
}

#[tokio::test]
async fn comments_are_written_next_to_posts() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("GET"))
        .and(path("/comments/p1.json"))
        .and(query_param("raw_json", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"kind": "Listing", "data": {"children": [post("p1", "Israel strikes back", JUNE)]}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"id": "c1", "author": "a", "created_utc": JUNE + 60.0, "body": "first", "parent_id": "t3_p1", "replies": ""}},
                {"kind": "t1", "data": {"id": "c2", "author": "b", "created_utc": JUNE + 120.0, "body": "second", "parent_id": "t3_p1", "replies": ""}},
                {"kind": "t1", "data": {"id": "c3", "author": "c", "created_utc": JUNE + 180.0, "body": "third", "parent_id": "t3_p1", "replies": ""}}
            ]}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&server, dir.path(), "  comments_per_post: 2");
    let ctx = RunContext::from_config(&cfg).unwrap();

    let run = run_reddit(cfg.reddit.as_ref().unwrap(), &ctx).await.unwrap();
    assert_eq!(run.files.len(), 6);

    let comments = read_json(&dir.path().join("reddit_test_comments.json"));
    let comments = comments.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["post_id"], "p1");
    assert_eq!(comments[1]["comment_id"], "c2");

    let mut csv = csv::Reader::from_path(dir.path().join("reddit_test_comments.csv")).unwrap();
    let header: Vec<String> = csv.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, RedditComment::FIELDS);
}

#[tokio::test]
async fn search_mode_confirms_each_hit_with_its_keyword() {
    let server = MockServer::start().await;
    for (q, children) in [
        ("Israel", vec![post("s1", "Israel votes", JUNE), post("s2", "Unrelated but fuzzy", MAY)]),
        ("Gaza", vec![post("s3", "Aid reaches Gaza", JUNE)]),
    ] {
        Mock::given(method("GET"))
            .and(path("/r/worldnews/search.json"))
            .and(query_param("q", q))
            .and(query_param("restrict_sr", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": {"after": null, "children": children}
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&server, dir.path(), "  mode: search");
    let ctx = RunContext::from_config(&cfg).unwrap();
    let out = harvest_pipeline::reddit::collect_reddit(
        &harvest_social::reddit::RedditApi::new(ctx.http_client(&server.uri(), None).unwrap()),
        cfg.reddit.as_ref().unwrap(),
        &ctx,
    )
    .await
    .unwrap();

    let got: Vec<(&str, &str)> = out
        .posts
        .iter()
        .map(|p| (p.post_id.as_str(), p.keyword.as_str()))
        .collect();
    assert_eq!(got, vec![("s1", "Israel"), ("s3", "Gaza")]);
}

#[tokio::test]
async fn total_cap_stops_before_next_subreddit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/worldnews/new.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": {"after": null, "children": [
                post("a", "Israel one", JUNE),
                post("b", "Israel two", JUNE - 10.0),
                post("c", "Israel three", JUNE - 20.0)
            ]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/news/new.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&server, dir.path(), "  max_total_posts: 2");
    cfg.reddit.as_mut().unwrap().subreddits.push("news".into());
    let ctx = RunContext::from_config(&cfg).unwrap();

    let run = run_reddit(cfg.reddit.as_ref().unwrap(), &ctx).await.unwrap();
    assert_eq!(run.records, 2);
    assert_eq!(Record::id(&read_posts(dir.path())[1]), "b");
}

fn read_posts(dir: &Path) -> Vec<RedditPost> {
    serde_json::from_str(&std::fs::read_to_string(dir.join("reddit_test.json")).unwrap()).unwrap()
}
