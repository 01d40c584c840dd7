use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use live_epg::config::Config;
use live_epg::errors::{AppResult, SourceError};
use live_epg::models::{ChannelSource, IdentifierSpace};
use live_epg::repositories::{InMemorySourceStore, SourceConfigProvider, TomlSourceStore};
use live_epg::services::{CacheSettings, ChannelCache};
use live_epg::utils::{ByteStream, HttpFetcher};

const PLAYLIST_URL: &str = "http://live.example/cn.m3u";
const GUIDE_URL: &str = "http://epg.example/e.xml";

const PLAYLIST: &str = r#"#EXTM3U x-tvg-url="http://epg.example/e.xml"
#EXTINF:-1 tvg-id="CCTV1" tvg-logo="http://logo.example/cctv1.png" group-title="央视",CCTV-1 综合
http://live.example/cctv1.m3u8
#EXTINF:-1 tvg-id="北京卫视" group-title="卫视",北京卫视
http://live.example/btv.m3u8
#EXTINF:-1 tvg-id="orphan",Orphan
#EXTINF:-1 tvg-id="HNWS" group-title="卫视",湖南卫视
http://live.example/hunan.m3u8
"#;

const GUIDE_PARTS: [&str; 3] = [
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<tv>\n<channel id=\"cctv-1\">\n<display-name>CCTV1</display-name>\n</channel>\n<channel id=\"北京\">\n</channel>\n<programme channel=\"cctv-1\" start=\"20250101120000 +0800\" stop=\"20250101123000 +0800\">\n<title lang=\"zh\">新闻",
    "联播</title>\n</programme>\n<programme channel=\"北京\" start=\"20250101120000 +0800\" stop=\"20250101130000 +0800\">\n<title>养生堂</title>\n</programme>\n<programme channel=\"cctv-2\" start=\"20250101120000 +0800\" stop=\"20250101130000 +0800\">\n<title>",
    "Unmapped</title>\n</programme>\n</tv>\n",
];

/// Serves canned bodies by URL and records every request
#[derive(Default)]
struct FakeFetcher {
    bodies: HashMap<String, Vec<&'static str>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeFetcher {
    fn with(mut self, url: &str, parts: &[&'static str]) -> Self {
        self.bodies.insert(url.to_string(), parts.to_vec());
        self
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    fn body(&self, url: &str, user_agent: &str) -> AppResult<Vec<&'static str>> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), user_agent.to_string()));
        self.bodies.get(url).cloned().ok_or_else(|| {
            SourceError::Http {
                status: 404,
                message: format!("Not Found - URL: {url}"),
            }
            .into()
        })
    }
}

#[async_trait]
impl HttpFetcher for FakeFetcher {
    async fn fetch_text(&self, url: &str, user_agent: &str) -> AppResult<String> {
        Ok(self.body(url, user_agent)?.concat())
    }

    async fn open_stream(&self, url: &str, user_agent: &str) -> AppResult<ByteStream> {
        let parts = self.body(url, user_agent)?;
        Ok(stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes())))).boxed())
    }
}

fn cn_source() -> ChannelSource {
    ChannelSource::new("cn", "China", PLAYLIST_URL)
}

fn full_fetcher() -> Arc<FakeFetcher> {
    Arc::new(
        FakeFetcher::default()
            .with(PLAYLIST_URL, &[PLAYLIST])
            .with(GUIDE_URL, &GUIDE_PARTS),
    )
}

#[tokio::test]
async fn test_get_runs_full_pipeline() {
    let http = full_fetcher();
    let store = Arc::new(InMemorySourceStore::new(vec![cn_source()]));
    let cache = ChannelCache::new(store.clone(), http.clone(), CacheSettings::default());

    let bundle = cache.get("cn").await.unwrap().expect("bundle");

    assert_eq!(bundle.channel_count, 3);
    let ids: Vec<&str> = bundle.channels.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["cn-0", "cn-1", "cn-2"]);
    assert_eq!(bundle.channels[0].name, "CCTV-1 综合");
    assert_eq!(bundle.channels[0].logo_url, "http://logo.example/cctv1.png");
    assert_eq!(bundle.identifier_space, IdentifierSpace::TvgId);
    assert_eq!(bundle.epg_source_url, GUIDE_URL);

    // Title split across chunks is reassembled
    let cctv1 = bundle.programs_for(&bundle.channels[0]);
    assert_eq!(cctv1.len(), 1);
    assert_eq!(cctv1[0].title, "新闻联播");
    assert_eq!(cctv1[0].start_time, "20250101120000 +0800");

    // Satellite suffix fuzzy match
    assert_eq!(bundle.programs_for(&bundle.channels[1])[0].title, "养生堂");
    assert!(bundle.programs_for(&bundle.channels[2]).is_empty());
    assert_eq!(bundle.program_count(), 2);

    let persisted = store.find_source("cn").await.unwrap().unwrap();
    assert_eq!(persisted.cached_channel_count, Some(3));

    let requests = http.requests();
    assert_eq!(
        requests,
        vec![
            (PLAYLIST_URL.to_string(), "AptvPlayer/1.4.10".to_string()),
            (GUIDE_URL.to_string(), "AptvPlayer/1.4.10".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unknown_key_short_circuits() {
    let http = full_fetcher();
    let store = Arc::new(InMemorySourceStore::new(vec![cn_source()]));
    let cache = ChannelCache::new(store, http.clone(), CacheSettings::default());

    assert!(cache.get("nope").await.unwrap().is_none());
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_missing_guide_degrades_to_channels_only() {
    let http = Arc::new(FakeFetcher::default().with(PLAYLIST_URL, &[PLAYLIST]));
    let store = Arc::new(InMemorySourceStore::new(vec![cn_source()]));
    let cache = ChannelCache::new(store, http, CacheSettings::default());

    let bundle = cache.get("cn").await.unwrap().expect("bundle");
    assert_eq!(bundle.channel_count, 3);
    assert!(bundle.epg_by_channel.is_empty());
}

#[tokio::test]
async fn test_forced_refresh_of_broken_source_drops_entry() {
    let store = Arc::new(InMemorySourceStore::new(vec![cn_source()]));
    let cache = ChannelCache::new(store, full_fetcher(), CacheSettings::default());
    assert_eq!(cache.refresh(&cn_source()).await, 3);

    let mut moved = cn_source();
    moved.url = "http://live.example/gone.m3u".to_string();
    assert_eq!(cache.refresh(&moved).await, 0);
    assert!(cache.peek("cn").await.is_none());
}

#[tokio::test]
async fn test_toml_store_records_channel_count() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!(
            "[http]\nuser_agent = \"Tester/1.0\"\n\n[[sources]]\nkey = \"cn\"\nname = \"China\"\nurl = \"{PLAYLIST_URL}\"\n"
        ),
    )
    .unwrap();
    let config = Config::load_from_file(path.to_str().unwrap()).unwrap();

    let http = full_fetcher();
    let cache = ChannelCache::new(
        Arc::new(TomlSourceStore::new(&path)),
        http.clone(),
        CacheSettings::from(&config.http),
    );
    cache.get("cn").await.unwrap().expect("bundle");

    let reloaded = Config::load_from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(reloaded.source("cn").unwrap().cached_channel_count, Some(3));
    assert!(http.requests().iter().all(|(_, ua)| ua == "Tester/1.0"));
}
