//! End-to-end builds of the checked-in fixture project.

use podcast_press::assets::stage_dir;
use podcast_press::build::{BuildError, BuildOptions, FEED_FILE, build_at, check};
use podcast_press::feed::{FeedError, derive_guid};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new(numbers: &[u32]) -> Self {
        let dir = TempDir::new().unwrap();
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/podcast");
        stage_dir(&fixture, dir.path()).unwrap();

        let project = Self { dir };
        fs::create_dir_all(project.root().join("media/audio")).unwrap();
        project.png("cover.png", 16, 9);
        project.png("itunes.png", 32, 32);
        project.png("cover_tor.png", 8, 8);

        for &n in numbers {
            let episode_dir = project.root().join(format!("data/episodes/ep-{n}"));
            fs::create_dir_all(&episode_dir).unwrap();
            let meta = json!({
                "NUMBER": n,
                "TITLE": format!("Episode {n}"),
                "DESCRIPTION": format!("Summary {n}"),
                "CONTENT": "Body",
                "FILE": format!("{n}.mp3"),
            });
            fs::write(episode_dir.join("episode.json"), meta.to_string()).unwrap();
            fs::write(episode_dir.join("notes.md"), "*notes*").unwrap();
            fs::write(
                project.root().join(format!("media/audio/{n}.mp3")),
                vec![1u8; 100 + n as usize],
            )
            .unwrap();
        }
        project
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn output(&self) -> PathBuf {
        self.root().join("public_html")
    }

    fn options(&self, restricted: bool) -> BuildOptions {
        BuildOptions {
            root: self.root().to_path_buf(),
            output: self.output(),
            restricted,
        }
    }

    fn png(&self, name: &str, width: u32, height: u32) {
        let path = self.root().join("media/images").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::new(width, height).save(path).unwrap();
    }

    fn edit_site(&self, edit: impl FnOnce(&mut Value)) {
        let path = self.root().join("data/site.json");
        let mut site: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        edit(&mut site);
        fs::write(&path, site.to_string()).unwrap();
    }

    fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.output().join(relative)).unwrap()
    }

    fn now() -> chrono::DateTime<chrono::FixedOffset> {
        chrono::DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z").unwrap()
    }
}

/// Episode numbers linked from `<item>`s, in document order.
fn feed_numbers(xml: &str) -> Vec<u32> {
    xml.split("<item>")
        .skip(1)
        .filter_map(|item| {
            let start = item.find("<link>https://example.com/")? + "<link>https://example.com/".len();
            let end = item[start..].find("</link>")? + start;
            item[start..end].parse().ok()
        })
        .collect()
}

#[test]
fn limit_counts_blacklisted_episodes() {
    let project = Project::new(&[1, 2, 3, 4, 5]);
    project.edit_site(|site| {
        site["FEED_LIMIT"] = 3.into();
        site["blacklist"] = json!([4]);
    });

    let summary = build_at(&project.options(false), Project::now(), None).unwrap();
    assert_eq!(summary.feed_items, 2);
    assert_eq!(feed_numbers(&project.read(FEED_FILE)), vec![5, 3]);
}

#[test]
fn every_episode_gets_a_page() {
    let project = Project::new(&[1, 2, 3, 4, 5]);
    project.edit_site(|site| {
        site["FEED_LIMIT"] = 1.into();
        site["blacklist"] = json!([5, 2]);
    });

    let summary = build_at(&project.options(false), Project::now(), None).unwrap();
    assert_eq!(summary.pages, 5);
    for n in 1..=5 {
        let page = project.read(&format!("{n}/index.html"));
        assert!(page.contains(&format!("<h1>{n}: Episode {n}</h1>")));
        assert!(page.contains("<em>notes</em>"));
    }
}

#[test]
fn no_limit_no_blacklist_includes_everything_newest_first() {
    let project = Project::new(&[2, 10, 1]);
    build_at(&project.options(false), Project::now(), None).unwrap();

    let xml = project.read(FEED_FILE);
    assert_eq!(feed_numbers(&xml), vec![10, 2, 1]);
    assert!(xml.contains(&derive_guid("Episode 10", 10)));
    assert!(xml.contains(r#"length="110""#));

    let index = project.read("index.html");
    let positions: Vec<usize> = [10, 2, 1]
        .iter()
        .map(|n| index.find(&format!(r#"href="/{n}/""#)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn explicit_date_is_used_for_pub_date_and_page() {
    let project = Project::new(&[1]);
    let meta_path = project.root().join("data/episodes/ep-1/episode.json");
    let mut meta: Value = serde_json::from_str(&fs::read_to_string(&meta_path).unwrap()).unwrap();
    meta["DATE"] = "2021-03-05T10:00:00Z".into();
    fs::write(&meta_path, meta.to_string()).unwrap();

    build_at(&project.options(false), Project::now(), None).unwrap();
    assert!(project.read(FEED_FILE).contains("5 Mar 2021 10:00:00"));
    assert!(project.read("1/index.html").contains("<time>2021-03-05</time>"));
}

#[test]
fn restricted_variant() {
    let project = Project::new(&[1, 2]);
    build_at(&project.options(true), Project::now(), None).unwrap();

    let page = project.read("2/index.html");
    assert!(!page.contains("Google Analytics"));
    assert!(page.contains("http://testcastabc.onion"));
    assert!(!project.read("index.html").contains("Google Analytics"));

    let xml = project.read(FEED_FILE);
    assert!(xml.contains("<link>http://testcastabc.onion/2</link>"));
    assert!(xml.contains("http://testcastabc.onion/images/cover_tor.png"));

    assert_eq!(
        fs::read(project.output().join("favicon.ico")).unwrap(),
        b"small-icon"
    );
}

#[test]
fn regular_variant_keeps_analytics() {
    let project = Project::new(&[1]);
    build_at(&project.options(false), Project::now(), None).unwrap();
    assert!(project.read("1/index.html").contains("<!-- Google Analytics -->"));
    assert!(project.output().join("favicon_sm.ico").is_file());
}

#[test]
fn missing_audio_aborts_build() {
    let project = Project::new(&[1, 2]);
    fs::remove_file(project.root().join("media/audio/2.mp3")).unwrap();

    let err = build_at(&project.options(false), Project::now(), None).unwrap_err();
    assert!(matches!(err, BuildError::Feed(FeedError::Asset { number: 2, .. })));
    assert!(err.to_string().contains("2.mp3"));
    assert!(!project.output().join("2/index.html").exists());
    assert!(!project.output().join(FEED_FILE).exists());
}

#[test]
fn malformed_episode_aborts_build() {
    let project = Project::new(&[1]);
    fs::write(
        project.root().join("data/episodes/ep-1/episode.json"),
        "{ not json",
    )
    .unwrap();
    assert!(matches!(
        build_at(&project.options(false), Project::now(), None),
        Err(BuildError::Load(_))
    ));
}

#[test]
fn rebuild_into_existing_output() {
    let project = Project::new(&[1]);
    build_at(&project.options(false), Project::now(), None).unwrap();
    fs::write(project.output().join("stale.txt"), "left alone").unwrap();

    build_at(&project.options(false), Project::now(), None).unwrap();
    assert!(project.output().join("1/index.html").is_file());
    assert!(project.output().join("stale.txt").is_file());
}

#[test]
fn check_does_not_write() {
    let project = Project::new(&[3, 1]);
    let report = check(&project.options(false)).unwrap();
    assert_eq!(report.episodes, 2);
    assert_eq!(report.feed.len(), 2);
    assert!(!project.output().exists());
}
