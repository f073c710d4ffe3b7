//! End-to-end integration tests for blogbook.
//!
//! Every test builds its own feed in a temp directory with small PNG
//! fixtures generated by the `image` crate, so no network access or checked-in
//! assets are needed.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use blogbook::{
    select_posts, BlogFeed, BookError, BookWriter, ChannelStatusSink, Comment, DateRange,
    ElementError, ImageRef, ImageResolver, LayoutOptions, LayoutStrategy, LocalImageResolver,
    Post, PostEntry, PostOrder, ResolvedImage, StatusEvent, WrapSide, WriterConfig,
};
use chrono::{DateTime, NaiveDate};
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn png(dir: &Path, name: &str, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 60]))
        .save(dir.join(name))
        .unwrap();
}

fn post(id: &str, published: &str, text: &str, images: &[&str]) -> Post {
    Post::new(
        id,
        format!("Post {id}"),
        DateTime::parse_from_rfc3339(published).unwrap(),
        text,
        images.iter().map(|s| ImageRef::new(*s)).collect(),
        0,
    )
}

fn year_2012() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2012, 12, 31).unwrap(),
    )
}

fn writer(layout: LayoutOptions) -> BookWriter {
    BookWriter::new(WriterConfig::builder().layout(layout).build().unwrap())
}

/// Records which posts the writer asked to resolve.
struct RecordingResolver {
    inner: LocalImageResolver,
    calls: Mutex<Vec<String>>,
}

impl ImageResolver for RecordingResolver {
    fn resolve(&self, post: &Post, image: &ImageRef) -> ResolvedImage {
        self.calls.lock().unwrap().push(post.id().to_string());
        self.inner.resolve(post, image)
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn test_mixed_image_counts_choose_layouts() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["one.png", "a.png", "b.png", "c.png"] {
        png(dir.path(), name, 160, 120);
    }
    let entries = vec![
        PostEntry::new(post("1", "2012-05-03T09:00:00Z", "No pictures today.", &[]), vec![]),
        PostEntry::new(post("2", "2012-05-02T09:00:00Z", "One picture.", &["one.png"]), vec![]),
        PostEntry::new(
            post("3", "2012-05-01T09:00:00Z", "Three pictures.", &["a.png", "b.png", "c.png"]),
            vec![],
        ),
    ];
    let layout = LayoutOptions::builder().images_per_row(2).build();

    let (bytes, summary) = writer(layout)
        .write_to_vec("Family", year_2012(), &entries, &LocalImageResolver::new(dir.path()))
        .unwrap();

    assert!(bytes.starts_with(b"%PDF-"));
    let layouts: Vec<LayoutStrategy> = summary.chapters.iter().map(|c| c.layout).collect();
    assert_eq!(
        layouts,
        [
            LayoutStrategy::NoImage,
            LayoutStrategy::SingleWrap(WrapSide::Left),
            LayoutStrategy::Grid(2),
        ]
    );
    let grid = summary.chapters[2].grid.unwrap();
    assert_eq!(grid.rows, 2);
    assert_eq!(grid.blank_cells, 1);
    assert_eq!(summary.chapters.len(), 3);
    assert_eq!(summary.images_rendered(), 4);
}

#[test]
fn test_tall_single_image_pads_body() {
    let dir = tempfile::tempdir().unwrap();
    png(dir.path(), "tall.png", 100, 200);
    let entries = [PostEntry::new(
        post("1", "2012-06-01T09:00:00Z", "A short caption.", &["tall.png"]),
        vec![],
    )];

    let (_, summary) = BookWriter::default()
        .write_to_vec("Family", year_2012(), &entries, &LocalImageResolver::new(dir.path()))
        .unwrap();

    let chapter = &summary.chapters[0];
    assert_eq!(chapter.images_rendered, 1);
    assert!(chapter.padding_lines >= 4, "padding was {}", chapter.padding_lines);
}

#[test]
fn test_missing_image_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let entries = [PostEntry::new(
        post("1", "2012-06-01T09:00:00Z", "The photo never made it.", &["lost.png"]),
        vec![],
    )];

    let (bytes, summary) = BookWriter::default()
        .write_to_vec("Family", year_2012(), &entries, &LocalImageResolver::new(dir.path()))
        .unwrap();

    assert!(bytes.starts_with(b"%PDF-"));
    let chapter = &summary.chapters[0];
    assert_eq!(chapter.images_requested, 1);
    assert_eq!(chapter.images_rendered, 0);
    assert!(matches!(
        chapter.skipped.as_slice(),
        [ElementError::ResourceMissing { reference, .. }] if reference == "lost.png"
    ));
}

#[test]
fn test_chapter_numbers_follow_input_order() {
    let entries: Vec<PostEntry> = ["c", "a", "b", "d"]
        .iter()
        .map(|id| PostEntry::new(post(id, "2012-02-01T09:00:00Z", "x", &[]), vec![]))
        .collect();
    let dir = tempfile::tempdir().unwrap();

    let (_, summary) = BookWriter::default()
        .write_to_vec("Family", year_2012(), &entries, &LocalImageResolver::new(dir.path()))
        .unwrap();

    let numbers: Vec<u32> = summary.chapters.iter().map(|c| c.number).collect();
    let ids: Vec<&str> = summary.chapters.iter().map(|c| c.post_id.as_str()).collect();
    assert_eq!(numbers, [1, 2, 3, 4]);
    assert_eq!(ids, ["c", "a", "b", "d"]);
    for pair in summary.chapters.windows(2) {
        assert!(pair[1].first_page > pair[0].last_page, "chapters must start on a new page");
    }
}

#[test]
fn test_resolver_not_called_without_images() {
    let dir = tempfile::tempdir().unwrap();
    png(dir.path(), "x.png", 20, 20);
    let entries = [
        PostEntry::new(post("plain", "2012-03-01T09:00:00Z", "x", &[]), vec![]),
        PostEntry::new(post("photo", "2012-03-02T09:00:00Z", "x", &["x.png"]), vec![]),
    ];
    let resolver = RecordingResolver {
        inner: LocalImageResolver::new(dir.path()),
        calls: Mutex::new(Vec::new()),
    };

    BookWriter::default()
        .write_to_vec("Family", year_2012(), &entries, &resolver)
        .unwrap();

    assert_eq!(*resolver.calls.lock().unwrap(), ["photo"]);
}

#[test]
fn test_status_events_reach_channel() {
    let (tx, rx) = mpsc::channel();
    let config = WriterConfig::builder()
        .status_sink(Arc::new(ChannelStatusSink::new(tx)))
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let entries = [PostEntry::new(post("1", "2012-03-01T09:00:00Z", "x", &[]), vec![])];

    BookWriter::new(config)
        .write_to_vec("Family", year_2012(), &entries, &LocalImageResolver::new(dir.path()))
        .unwrap();

    let messages: Vec<String> = rx.try_iter().map(|e| e.to_string()).collect();
    assert_eq!(messages.first().map(String::as_str), Some("Writing title page"));
    assert_eq!(messages.last().map(String::as_str), Some("Successfully wrote pdf"));
    assert!(messages.contains(&StatusEvent::Completing.to_string()));
}

#[test]
fn test_comments_rendered_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let entries = [PostEntry::new(
        post("1", "2012-03-01T09:00:00Z", "x", &[]),
        vec![Comment::new("Gran", "So sweet!")],
    )];
    let resolver = LocalImageResolver::new(dir.path());

    let (_, with) = BookWriter::default()
        .write_to_vec("Family", year_2012(), &entries, &resolver)
        .unwrap();
    let quiet = BookWriter::new(WriterConfig::builder().include_comments(false).build().unwrap());
    let (_, without) = quiet.write_to_vec("Family", year_2012(), &entries, &resolver).unwrap();

    assert_eq!(with.chapters[0].comments_rendered, 1);
    assert_eq!(without.chapters[0].comments_rendered, 0);
}

#[test]
fn test_write_to_file_is_atomic() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("books/family.pdf");
    let entries = [PostEntry::new(post("1", "2012-03-01T09:00:00Z", "x", &[]), vec![])];

    let summary = BookWriter::default()
        .write_to_file("Family", year_2012(), &entries, &LocalImageResolver::new(dir.path()), &out)
        .unwrap();

    assert!(out.exists());
    assert!(!out.with_extension("pdf.tmp").exists());
    assert_eq!(summary.physical_pages % 2, 0);
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn test_unwritable_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let out = blocker.join("family.pdf");

    let err = BookWriter::default()
        .write_to_file("Family", year_2012(), &[], &LocalImageResolver::new(dir.path()), &out)
        .unwrap_err();

    assert!(matches!(err, BookError::OutputOpenFailed { .. }), "got {err:?}");
    assert!(!out.exists());
}

#[test]
fn test_feed_json_to_book() {
    let dir = tempfile::tempdir().unwrap();
    png(dir.path(), "dog.png", 64, 48);
    let json = r#"{
        "title": "Travels",
        "posts": [
            { "id": "1", "title": "Home", "published": "2011-12-30T10:00:00Z",
              "content": "Back again." },
            { "id": "2", "title": "Park", "published": "2012-04-02T10:00:00+02:00",
              "content": "Walked the dog <http://example.com/dog.png>.",
              "images": [ { "source": "dog.png" } ], "comment_count": 1,
              "comments": [ { "author": "Sam", "text": "Good boy" } ] },
            { "id": "3", "title": "Lake", "published": "2012-08-15T10:00:00Z",
              "content": "Swimming." }
        ]
    }"#;
    let feed = BlogFeed::from_json(json).unwrap();
    let posts = select_posts(&feed.posts, year_2012(), PostOrder::Descending);
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].post.text(), "Walked the dog .");

    let (_, summary) = BookWriter::default()
        .write_to_vec(&feed.title, year_2012(), &posts, &LocalImageResolver::new(dir.path()))
        .unwrap();

    let titles: Vec<&str> = summary.chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Lake", "Park"]);
    assert_eq!(summary.chapters[1].comments_rendered, 1);
    assert_eq!(summary.images_rendered(), 1);
}

#[test]
fn test_invalid_property_keeps_previous_value() {
    let mut builder = LayoutOptions::builder().images_per_row(3);
    assert!(builder.apply_property("Images Per Row", "many").is_err());
    assert_eq!(builder.build().images_per_row, 3);
}

#[test]
fn test_writer_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BookWriter>();
}
